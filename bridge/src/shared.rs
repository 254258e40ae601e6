use crate::{Bridge, Route};

use common::{CanFrame, CanTransport, ChannelId, FrameError};
use core::cell::RefCell;
use critical_section::Mutex;

/// A [`Bridge`] that several receive contexts (interrupt handlers, threads)
/// can feed. Each call runs inside a critical section so vehicle state, the
/// synthetic counters and the queues never see interleaved updates.
pub struct SharedBridge {
    inner: Mutex<RefCell<Bridge>>,
}

impl SharedBridge {
    pub const fn new(bridge: Bridge) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(bridge)),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut Bridge) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }

    pub fn on_frame_received(
        &self,
        channel: ChannelId,
        frame: CanFrame,
        hw: &mut dyn CanTransport,
    ) -> Route {
        self.with(|bridge| bridge.on_frame_received(channel, frame, hw))
    }

    pub fn on_raw_frame(
        &self,
        channel: ChannelId,
        id: u32,
        extended: bool,
        dlc: u8,
        bytes: &[u8],
        hw: &mut dyn CanTransport,
    ) -> Result<Route, FrameError> {
        self.with(|bridge| bridge.on_raw_frame(channel, id, extended, dlc, bytes, hw))
    }

    pub fn service_tx_queues(&self, hw: &mut dyn CanTransport) {
        self.with(|bridge| bridge.service_tx_queues(hw))
    }

    pub fn into_inner(self) -> Bridge {
        self.inner.into_inner().into_inner()
    }
}
