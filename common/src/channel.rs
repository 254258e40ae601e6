use core::fmt;
use int_enum::IntEnum;

#[repr(u8)]
#[derive(IntEnum, Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord)]
pub enum ChannelId {
    Can0 = 0,
    Can1 = 1,
    Can2 = 2,
}

impl ChannelId {
    pub const ALL: [ChannelId; 3] = [ChannelId::Can0, ChannelId::Can1, ChannelId::Can2];
    pub const COUNT: usize = Self::ALL.len();

    pub fn index(self) -> usize {
        u8::from(self) as usize
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CAN{}", u8::from(*self))
    }
}

/// The two channels facing the vehicle. One of them is wired, the other one
/// stays unused.
#[repr(u8)]
#[derive(IntEnum, Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum ExternalChannel {
    Can0 = 0,
    #[default]
    Can1 = 1,
}

impl From<ExternalChannel> for ChannelId {
    fn from(ch: ExternalChannel) -> Self {
        match ch {
            ExternalChannel::Can0 => ChannelId::Can0,
            ExternalChannel::Can1 => ChannelId::Can1,
        }
    }
}

/// Which external channel is paired with the always-present internal one.
/// Each enabled channel forwards to the other.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct ChannelPairing {
    external: ExternalChannel,
}

impl ChannelPairing {
    pub const INTERNAL: ChannelId = ChannelId::Can2;

    pub fn new(external: ExternalChannel) -> Self {
        Self { external }
    }

    pub fn external(&self) -> ChannelId {
        self.external.into()
    }

    pub fn internal(&self) -> ChannelId {
        Self::INTERNAL
    }

    pub fn partner(&self, channel: ChannelId) -> Option<ChannelId> {
        if channel == Self::INTERNAL {
            Some(self.external())
        } else if channel == self.external() {
            Some(Self::INTERNAL)
        } else {
            None
        }
    }

    pub fn is_enabled(&self, channel: ChannelId) -> bool {
        self.partner(channel).is_some()
    }

    pub fn enabled(&self) -> [ChannelId; 2] {
        [self.external(), Self::INTERNAL]
    }
}
