use common::{CanFrame, CanTransport, ChannelId};

#[allow(unused_imports)]
use log::{debug, info, trace, warn};
use rand::Rng;
use ringbuffer::{ConstGenericRingBuffer, RingBuffer};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Transmit mailboxes per controller, as on bxcan
const MAILBOXES: usize = 3;

#[derive(Default)]
struct SimController {
    mailboxes: ConstGenericRingBuffer<CanFrame, MAILBOXES>,
    transmitted: BTreeMap<u32, u64>,
    refused: u64,
}

/// Three simulated CAN controllers. Frames handed to a controller sit in its
/// mailboxes until the next bus tick puts one of them on the wire.
pub struct SimBus {
    controllers: [Mutex<SimController>; ChannelId::COUNT],
    busy_probability: f64,
}

fn lock(c: &Mutex<SimController>) -> MutexGuard<'_, SimController> {
    c.lock().unwrap_or_else(|e| e.into_inner())
}

impl SimBus {
    pub fn new(busy_probability: f64) -> Self {
        Self {
            controllers: Default::default(),
            busy_probability,
        }
    }

    /// One bit-time slot per millisecond: every controller with a pending
    /// mailbox transmits its oldest frame.
    pub fn tick(&self) {
        for channel in ChannelId::ALL {
            let mut c = lock(&self.controllers[channel.index()]);
            if let Some(frame) = c.mailboxes.dequeue() {
                trace!("{} wire {}", channel, frame.summary(channel));
                *c.transmitted.entry(frame.id()).or_insert(0) += 1;
            }
        }
    }

    /// Frames the controller of `channel` has put on the wire so far
    pub fn on_wire(&self, channel: ChannelId) -> u64 {
        lock(&self.controllers[channel.index()])
            .transmitted
            .values()
            .sum()
    }

    pub fn log_summary(&self) {
        for channel in ChannelId::ALL {
            let c = lock(&self.controllers[channel.index()]);
            if c.transmitted.is_empty() && c.refused == 0 {
                continue;
            }
            let total: u64 = c.transmitted.values().sum();
            info!(
                "{}: {} frames on the wire, {} refused by full mailboxes",
                channel, total, c.refused
            );
            for (id, n) in &c.transmitted {
                info!("{}   {:03X}: {}", channel, id, n);
            }
        }
    }
}

/// Per-thread handle used by the gateway to reach the simulated controllers
pub struct SimTransport<'a> {
    bus: &'a SimBus,
    rng: rand::rngs::ThreadRng,
}

impl<'a> SimTransport<'a> {
    pub fn new(bus: &'a SimBus) -> Self {
        Self {
            bus,
            rng: rand::thread_rng(),
        }
    }
}

impl CanTransport for SimTransport<'_> {
    fn try_send(&mut self, channel: ChannelId, frame: &CanFrame) -> bool {
        let mut c = lock(&self.bus.controllers[channel.index()]);
        if c.mailboxes.is_full() || self.rng.gen_bool(self.bus.busy_probability) {
            c.refused += 1;
            return false;
        }
        c.mailboxes.push(*frame);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mailboxes_fill_up_until_tick() {
        let bus = SimBus::new(0.0);
        let mut hw = SimTransport::new(&bus);
        let frame = CanFrame::new_standard(0x1C2, &[0x50]).unwrap();
        for _ in 0..MAILBOXES {
            assert!(hw.try_send(ChannelId::Can2, &frame));
        }
        assert!(!hw.try_send(ChannelId::Can2, &frame));
        assert!(hw.try_send(ChannelId::Can1, &frame));
        bus.tick();
        assert!(hw.try_send(ChannelId::Can2, &frame));
    }

    #[test]
    fn always_busy() {
        let bus = SimBus::new(1.0);
        let mut hw = SimTransport::new(&bus);
        let frame = CanFrame::new_standard(0x1C2, &[0x50]).unwrap();
        assert!(!hw.try_send(ChannelId::Can0, &frame));
    }
}
