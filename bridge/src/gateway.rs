use arrayvec::ArrayVec;
use common::{CanFrame, ChannelId, ChannelPairing, FrameId, GatewayConfig, BLACKLIST_CAPACITY};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Route {
    Forward(ChannelId),
    Blacklisted,
    /// Transparent repeating is switched off
    Held,
    /// Arrived on a channel that is not part of the pairing
    Unpaired,
}

/// Where received frames go after translation
#[derive(Debug, Clone)]
pub struct ForwardingPolicy {
    pairing: ChannelPairing,
    blacklist: ArrayVec<FrameId, BLACKLIST_CAPACITY>,
    repeat: bool,
}

impl ForwardingPolicy {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            pairing: config.pairing(),
            blacklist: config.blacklist.clone(),
            repeat: config.repeat_can,
        }
    }

    pub fn pairing(&self) -> ChannelPairing {
        self.pairing
    }

    pub fn is_blacklisted(&self, id: FrameId) -> bool {
        self.blacklist.contains(&id)
    }

    pub fn route(&self, from: ChannelId, frame: &CanFrame) -> Route {
        let Some(to) = self.pairing.partner(from) else {
            return Route::Unpaired;
        };
        if !self.repeat {
            Route::Held
        } else if self.is_blacklisted(frame.frame_id()) {
            Route::Blacklisted
        } else {
            Route::Forward(to)
        }
    }

    /// Synthetic frames go to the side opposite to the anchor. They are not
    /// subject to the blacklist or the repeat switch.
    pub fn synthetic_target(&self, anchor_channel: ChannelId) -> Option<ChannelId> {
        self.pairing.partner(anchor_channel)
    }
}
