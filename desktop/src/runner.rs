use crate::can_simulator::CanSimulator;
use crate::sim_transport::{SimBus, SimTransport};

use bridge::SharedBridge;
use common::*;

use anyhow::{ensure, Context, Result};
#[allow(unused_imports)]
use log::{debug, info, warn};
use ringbuffer::RingBuffer;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

const TICK: Duration = Duration::from_millis(1);
const RX_DEPTH: usize = 64;
const FLUSH_TICKS: u32 = 1000;
const ACK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub duration_ms: u64,
    /// Step simulated time as soon as the previous millisecond is handled
    /// instead of pacing it with the wall clock
    pub fast: bool,
    pub charging: bool,
}

enum RxEvent {
    Frame(CanFrame),
    /// Every frame of the current simulated millisecond has been sent
    EndOfTick,
}

fn queues_idle(shared: &SharedBridge, pairing: ChannelPairing) -> bool {
    shared.with(|b| pairing.enabled().iter().all(|c| b.queue(*c).is_empty()))
}

/// One millisecond of bus time: refill the mailboxes, then put one frame
/// per controller on the wire
fn bus_step(shared: &SharedBridge, bus: &SimBus, hw: &mut SimTransport) {
    shared.service_tx_queues(hw);
    bus.tick();
}

fn flush(shared: &SharedBridge, bus: &SimBus, hw: &mut SimTransport, pairing: ChannelPairing) {
    let mut ticks = 0;
    while !queues_idle(shared, pairing) && ticks < FLUSH_TICKS {
        bus_step(shared, bus, hw);
        ticks += 1;
    }
    if ticks == FLUSH_TICKS {
        warn!("-!- tx queues still busy after {} ticks", FLUSH_TICKS);
    }
    // Empty the mailboxes
    for _ in 0..4 {
        bus.tick();
    }
}

/// Feeds simulated VCM and powertrain traffic through the gateway.
///
/// Each paired channel gets its own receive thread. In real-time mode a
/// scheduler thread moves the bus every millisecond of wall-clock time. In
/// fast mode the traffic loop waits until both receive threads have handled
/// a millisecond and then moves the bus itself, so the bus keeps pace with
/// simulated time however fast the host is.
pub fn run(
    shared: &SharedBridge,
    bus: &SimBus,
    pairing: ChannelPairing,
    opts: &RunOptions,
) -> Result<()> {
    let stopping = AtomicBool::new(false);

    thread::scope(|s| -> Result<()> {
        let (external_tx, external_rx) = mpsc::sync_channel::<RxEvent>(RX_DEPTH);
        let (internal_tx, internal_rx) = mpsc::sync_channel::<RxEvent>(RX_DEPTH);
        let (ack_tx, ack_rx) = mpsc::channel::<ChannelId>();
        let mut receivers = Vec::new();
        for (channel, rx) in [
            (pairing.external(), external_rx),
            (pairing.internal(), internal_rx),
        ] {
            let ack_tx = ack_tx.clone();
            receivers.push(s.spawn(move || {
                let mut hw = SimTransport::new(bus);
                for event in rx {
                    match event {
                        RxEvent::Frame(frame) => {
                            shared.on_frame_received(channel, frame, &mut hw);
                        }
                        RxEvent::EndOfTick => {
                            if ack_tx.send(channel).is_err() {
                                break;
                            }
                        }
                    }
                }
                debug!("{} receive path stopped", channel);
            }));
        }
        drop(ack_tx);

        let scheduler = if opts.fast {
            None
        } else {
            Some(s.spawn(|| {
                let mut hw = SimTransport::new(bus);
                while !stopping.load(Ordering::Acquire) {
                    bus_step(shared, bus, &mut hw);
                    thread::sleep(TICK);
                }
                flush(shared, bus, &mut hw, pairing);
            }))
        };

        let traffic = (|| -> Result<()> {
            let mut sim = CanSimulator::new(opts.charging);
            let mut hw = SimTransport::new(bus);
            for millis in 0..opts.duration_ms {
                sim.update(millis);
                while let Some(frame) = sim.vcm_txbuf.dequeue() {
                    external_tx
                        .send(RxEvent::Frame(frame))
                        .context("external receive path stopped")?;
                }
                while let Some(frame) = sim.powertrain_txbuf.dequeue() {
                    internal_tx
                        .send(RxEvent::Frame(frame))
                        .context("internal receive path stopped")?;
                }
                if opts.fast {
                    external_tx
                        .send(RxEvent::EndOfTick)
                        .context("external receive path stopped")?;
                    internal_tx
                        .send(RxEvent::EndOfTick)
                        .context("internal receive path stopped")?;
                    for _ in 0..2 {
                        ack_rx
                            .recv_timeout(ACK_TIMEOUT)
                            .with_context(|| format!("receive path stalled at {} ms", millis))?;
                    }
                    bus_step(shared, bus, &mut hw);
                } else {
                    thread::sleep(TICK);
                }
            }
            if opts.fast {
                flush(shared, bus, &mut hw, pairing);
            }
            Ok(())
        })();

        drop(external_tx);
        drop(internal_tx);
        let panicked = receivers
            .into_iter()
            .map(|r| r.join())
            .filter(Result::is_err)
            .count();
        stopping.store(true, Ordering::Release);
        let scheduler_ok = scheduler.map_or(true, |h| h.join().is_ok());
        ensure!(panicked == 0 && scheduler_ok, "a gateway thread panicked");
        traffic
    })
}
