#![no_std]

pub mod channel;
pub use channel::*;
pub mod checksum;
pub mod config;
pub use config::*;
pub mod frame;
pub use frame::*;
pub mod tx_queue;
pub use tx_queue::*;

pub extern crate bxcan;
pub extern crate log;

/// Egress side of a CAN controller. Implemented by whatever owns the
/// transceivers (firmware HAL, desktop simulator, test recorder).
pub trait CanTransport {
    /// Hands a frame to the controller of `channel`. Returns false if the
    /// controller can't take it right now (all mailboxes busy); the caller
    /// keeps the frame and retries later.
    fn try_send(&mut self, channel: ChannelId, frame: &CanFrame) -> bool;
}
