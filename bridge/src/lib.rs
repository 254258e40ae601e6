#![no_std]

pub mod behavior;
pub use behavior::{behaviors_for, Anchor, Behavior};
pub mod gateway;
pub use gateway::{ForwardingPolicy, Route};
pub mod generator;
pub use generator::{SyntheticBatch, SyntheticGenerator};
pub mod shared;
pub use shared::SharedBridge;
pub mod state;
pub use state::*;
pub mod torque;

pub extern crate common;

use common::checksum::apply_crc8;
use common::*;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BridgeStats {
    pub received: u32,
    pub forwarded: u32,
    pub blacklisted: u32,
    pub held: u32,
    pub rewritten: u32,
    pub synthesized: u32,
    pub dropped: u32,
    pub malformed: u32,
    /// Frames from a channel outside the pairing
    pub rejected: u32,
}

fn bump(counter: &mut u32) {
    *counter = counter.wrapping_add(1);
}

/// The gateway between the car side and the inverter side.
///
/// Every received frame goes through translation (state extraction, torque
/// rewriting, synthetic frame generation) and is then offered to the
/// forwarding policy. Outgoing frames wait in one [`TxQueue`] per channel.
pub struct Bridge {
    config: GatewayConfig,
    policy: ForwardingPolicy,
    state: VehicleState,
    generator: SyntheticGenerator,
    queues: [TxQueue; ChannelId::COUNT],
    stats: BridgeStats,
    log_frames: bool,
}

impl Bridge {
    pub fn new(config: GatewayConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            policy: ForwardingPolicy::new(&config),
            config,
            state: VehicleState::default(),
            generator: SyntheticGenerator::new(),
            queues: [TxQueue::new(), TxQueue::new(), TxQueue::new()],
            stats: BridgeStats::default(),
            log_frames: false,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    pub fn stats(&self) -> &BridgeStats {
        &self.stats
    }

    pub fn queue(&self, channel: ChannelId) -> &TxQueue {
        &self.queues[channel.index()]
    }

    /// Logs every received frame as `<channel>|<id>|<data>`
    pub fn set_frame_logging(&mut self, enabled: bool) {
        self.log_frames = enabled;
    }

    fn translation_active(&self) -> bool {
        self.config.translation_enabled && self.config.vehicle.is_leaf()
    }

    /// Entry point for transceiver drivers that hand over a raw receive
    /// buffer. Malformed frames are counted and dropped.
    pub fn on_raw_frame(
        &mut self,
        channel: ChannelId,
        id: u32,
        extended: bool,
        dlc: u8,
        bytes: &[u8],
        hw: &mut dyn CanTransport,
    ) -> Result<Route, FrameError> {
        match CanFrame::from_dlc(id, extended, dlc, bytes) {
            Ok(frame) => Ok(self.on_frame_received(channel, frame, hw)),
            Err(e) => {
                bump(&mut self.stats.malformed);
                warn!("{} << malformed frame {:#X}: {}", channel, id, e);
                Err(e)
            }
        }
    }

    pub fn on_frame_received(
        &mut self,
        channel: ChannelId,
        mut frame: CanFrame,
        hw: &mut dyn CanTransport,
    ) -> Route {
        bump(&mut self.stats.received);

        if !self.policy.pairing().is_enabled(channel) {
            bump(&mut self.stats.rejected);
            warn!("{} is not paired, ignoring {:03X}", channel, frame.id());
            return Route::Unpaired;
        }

        if self.translation_active() {
            let mut batch = SyntheticBatch::new();
            if self.translate(&mut frame, &mut batch) {
                bump(&mut self.stats.rewritten);
            }
            if let Some(target) = self.policy.synthetic_target(channel) {
                for synthetic in batch {
                    bump(&mut self.stats.synthesized);
                    self.enqueue(target, synthetic, hw);
                }
            }
        }

        if self.log_frames {
            info!("{}", frame.summary(channel));
        }

        let route = self.policy.route(channel, &frame);
        match route {
            Route::Forward(to) => {
                bump(&mut self.stats.forwarded);
                self.enqueue(to, frame, hw);
            }
            Route::Blacklisted => bump(&mut self.stats.blacklisted),
            Route::Held => bump(&mut self.stats.held),
            Route::Unpaired => {}
        }
        route
    }

    /// Returns true if the frame content was changed
    fn translate(&mut self, frame: &mut CanFrame, batch: &mut SyntheticBatch) -> bool {
        let mut rewritten = false;
        for behavior in behaviors_for(frame) {
            match *behavior {
                Behavior::GearSelector => {
                    let shift = ShiftState::decode(frame.data(), self.config.eco_drive_bit);
                    self.state.set_shift(shift);
                }
                Behavior::TorqueDemand => rewritten |= self.rewrite_demand(frame),
                Behavior::TorqueResponse => rewritten |= self.rewrite_response(frame),
                Behavior::ChargePhase { byte } => {
                    if let Some(b) = frame.byte(byte) {
                        self.state.set_charge_phase(ChargePhase(b));
                    }
                }
                Behavior::EcoScreen => {
                    if let Some(eco) = EcoScreen::decode(frame.data()) {
                        self.state.set_eco_screen(eco);
                    }
                }
                Behavior::DisplaySubstitute { byte } => {
                    if let Some(decoy) = self.state.eco_screen.decoy_soc() {
                        rewritten |= commit(frame, |f| {
                            f.set_byte(byte, decoy)?;
                            apply_crc8(f)
                        });
                    }
                }
                Behavior::StateOfCharge => {
                    if let Some(soc) = decode_soc(frame.data()) {
                        self.state.battery_soc = Some(soc);
                    }
                }
                Behavior::SyntheticTrigger(anchor) => {
                    let phase = self.state.charge_phase;
                    self.generator.on_anchor(anchor, phase, batch);
                }
            }
        }
        rewritten
    }

    fn rewrite_demand(&mut self, frame: &mut CanFrame) -> bool {
        let Some(demand) = torque::read_demand(frame.data()) else {
            return false;
        };
        self.state.vcm_torque_demand = demand;

        if !self.state.torque_rewrite_allowed() {
            return false;
        }
        let tuning = &self.config.torque;
        let Some(drive) = tuning.drive_factor(self.config.inverter_upgrade) else {
            return false;
        };
        let Some(scaled) = torque::scale_demand(demand, drive, tuning.regen_factor()) else {
            return false;
        };
        commit(frame, |f| {
            torque::write_demand(f, scaled)?;
            apply_crc8(f)
        })
    }

    fn rewrite_response(&mut self, frame: &mut CanFrame) -> bool {
        let Some(response) = torque::read_response(frame.data()) else {
            return false;
        };
        if !self.state.torque_rewrite_allowed() {
            return false;
        }
        let tuning = &self.config.torque;
        if tuning.drive_factor(self.config.inverter_upgrade).is_none() {
            return false;
        }
        if response < 0 && !tuning.regen_tuning {
            return false;
        }
        let mirrored = torque::mirrored_response(self.state.vcm_torque_demand);
        commit(frame, |f| {
            torque::write_response(f, mirrored)?;
            apply_crc8(f)
        })
    }

    /// Queues a frame and immediately tries to send the head of that queue
    pub fn enqueue(
        &mut self,
        channel: ChannelId,
        frame: CanFrame,
        hw: &mut dyn CanTransport,
    ) -> Enqueued {
        let outcome = self.queues[channel.index()].enqueue(frame);
        if outcome == Enqueued::Dropped {
            bump(&mut self.stats.dropped);
            warn!("{} tx queue full, dropped {:03X}", channel, frame.id());
        }
        self.drain_channel(channel, hw);
        outcome
    }

    pub fn drain_channel(
        &mut self,
        channel: ChannelId,
        hw: &mut dyn CanTransport,
    ) -> DrainOutcome {
        let queue = &mut self.queues[channel.index()];
        let outcome = queue.drain_one(|frame| {
            let sent = hw.try_send(channel, frame);
            if sent {
                trace!("{} >> {:03X} {:02X?}", channel, frame.id(), frame.data());
            }
            sent
        });
        if outcome == DrainOutcome::NotReady {
            debug!("{} not ready, {} pending", channel, queue.pending());
        }
        outcome
    }

    /// Periodic hook, keeps the queues moving when no frames arrive
    pub fn service_tx_queues(&mut self, hw: &mut dyn CanTransport) {
        for channel in self.policy.pairing().enabled() {
            self.drain_channel(channel, hw);
        }
    }
}

/// Applies `edit` to a copy and keeps it only if every step succeeded
fn commit<F>(frame: &mut CanFrame, edit: F) -> bool
where
    F: FnOnce(&mut CanFrame) -> Result<(), FrameError>,
{
    let mut out = *frame;
    match edit(&mut out) {
        Ok(()) => {
            *frame = out;
            true
        }
        Err(e) => {
            debug!("{:03X} left as is: {}", frame.id(), e);
            false
        }
    }
}
