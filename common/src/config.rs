use crate::{ChannelPairing, ExternalChannel, FrameId};

use arrayvec::ArrayVec;
use core::fmt;
use int_enum::IntEnum;

pub const BLACKLIST_CAPACITY: usize = 16;

// Codes match what the configuration portal stores

#[repr(u8)]
#[derive(IntEnum, Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum VehicleProfile {
    Leaf2010To2019 = 0,
    Env200 = 1,
    LeafZe0 = 2,
    #[default]
    LeafAze0 = 3,
    LeafZe1 = 4,
}

impl VehicleProfile {
    /// e-NV200 frames are forwarded without translation
    pub fn is_leaf(self) -> bool {
        self != VehicleProfile::Env200
    }
}

#[repr(u8)]
#[derive(IntEnum, Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum InverterUpgrade {
    Em57With110Kw = 0,
    Em57With160Kw = 1,
    #[default]
    Disabled = 2,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum MultiplierSet {
    /// 0.90 for the 110 kW inverter, 1.60 for the 160 kW one
    #[default]
    PedalFeel,
    /// 1.32 for the 110 kW inverter, 1.37 for the 160 kW one
    PowerMatched,
}

/// Fixed point multiplier in thousandths.
#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord)]
pub struct ScaleFactor(u16);

impl ScaleFactor {
    pub const ONE: ScaleFactor = ScaleFactor(1000);

    pub const fn from_permille(permille: u16) -> Self {
        Self(permille)
    }

    /// Rounds to the nearest thousandth. Negative and non-finite inputs give
    /// zero, which `GatewayConfig::validate` rejects.
    pub fn from_f32(factor: f32) -> Self {
        let permille = factor * 1000.0 + 0.5;
        if !(permille >= 0.0) {
            return Self(0);
        }
        if permille >= u16::MAX as f32 {
            return Self(u16::MAX);
        }
        Self(permille as u16)
    }

    pub fn permille(self) -> u16 {
        self.0
    }

    /// Multiplies and truncates toward zero
    pub fn apply(self, value: i32) -> i32 {
        value * self.0 as i32 / 1000
    }
}

impl fmt::Display for ScaleFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}.{:03}", self.0 / 1000, self.0 % 1000)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct TorqueTuning {
    pub preset_110kw: ScaleFactor,
    pub preset_160kw: ScaleFactor,
    pub regen: ScaleFactor,
    pub regen_tuning: bool,
}

impl TorqueTuning {
    pub const REGEN_DEFAULT: ScaleFactor = ScaleFactor::from_permille(1100);

    pub fn for_preset(set: MultiplierSet) -> Self {
        let (preset_110kw, preset_160kw) = match set {
            MultiplierSet::PedalFeel => (900, 1600),
            MultiplierSet::PowerMatched => (1320, 1370),
        };
        Self {
            preset_110kw: ScaleFactor::from_permille(preset_110kw),
            preset_160kw: ScaleFactor::from_permille(preset_160kw),
            regen: Self::REGEN_DEFAULT,
            regen_tuning: true,
        }
    }

    pub fn drive_factor(&self, upgrade: InverterUpgrade) -> Option<ScaleFactor> {
        match upgrade {
            InverterUpgrade::Em57With110Kw => Some(self.preset_110kw),
            InverterUpgrade::Em57With160Kw => Some(self.preset_160kw),
            InverterUpgrade::Disabled => None,
        }
    }

    pub fn regen_factor(&self) -> Option<ScaleFactor> {
        self.regen_tuning.then_some(self.regen)
    }
}

impl Default for TorqueTuning {
    fn default() -> Self {
        Self::for_preset(MultiplierSet::default())
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ConfigError {
    IdOutOfRange(u32),
    ZeroScaleFactor,
    BlacklistFull,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IdOutOfRange(id) => {
                write!(f, "blacklisted identifier {:#X} is not a valid CAN id", id)
            }
            ConfigError::ZeroScaleFactor => write!(f, "torque multipliers must be non-zero"),
            ConfigError::BlacklistFull => {
                write!(f, "blacklist holds at most {} identifiers", BLACKLIST_CAPACITY)
            }
        }
    }
}

/// Everything the gateway reads at runtime. Built once at startup.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct GatewayConfig {
    pub vehicle: VehicleProfile,
    pub inverter_upgrade: InverterUpgrade,
    pub torque: TorqueTuning,
    pub external_channel: ExternalChannel,
    pub blacklist: ArrayVec<FrameId, BLACKLIST_CAPACITY>,
    /// Rewrite frames and emit synthetic ones. Off turns the gateway into a
    /// plain repeater.
    pub translation_enabled: bool,
    /// Relay received frames to the paired channel
    pub repeat_can: bool,
    /// Decode byte 1 bit 4 of the shifter frame as Eco-Drive
    pub eco_drive_bit: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            vehicle: VehicleProfile::default(),
            inverter_upgrade: InverterUpgrade::default(),
            torque: TorqueTuning::default(),
            external_channel: ExternalChannel::default(),
            blacklist: ArrayVec::new(),
            translation_enabled: true,
            repeat_can: true,
            eco_drive_bit: false,
        }
    }
}

impl GatewayConfig {
    pub fn pairing(&self) -> ChannelPairing {
        ChannelPairing::new(self.external_channel)
    }

    /// Stops forwarding of `id` in the given format. Blocking a standard
    /// identifier leaves the extended one with the same number alone.
    pub fn block(&mut self, id: u32, extended: bool) -> Result<(), ConfigError> {
        let id = FrameId::new(id, extended).map_err(|_| ConfigError::IdOutOfRange(id))?;
        if self.blacklist.contains(&id) {
            return Ok(());
        }
        self.blacklist
            .try_push(id)
            .map_err(|_| ConfigError::BlacklistFull)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.torque;
        if [t.preset_110kw, t.preset_160kw, t.regen]
            .iter()
            .any(|f| f.permille() == 0)
        {
            return Err(ConfigError::ZeroScaleFactor);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_truncates_toward_zero() {
        let f = ScaleFactor::from_permille(900);
        assert_eq!(f.apply(400), 360);
        assert_eq!(f.apply(7), 6);
        assert_eq!(f.apply(-7), -6);
        assert_eq!(ScaleFactor::from_permille(1100).apply(101), 111);
    }

    #[test]
    fn scale_from_float() {
        assert_eq!(ScaleFactor::from_f32(1.37).permille(), 1370);
        assert_eq!(ScaleFactor::from_f32(0.9).permille(), 900);
        assert_eq!(ScaleFactor::from_f32(-1.0).permille(), 0);
        assert_eq!(ScaleFactor::from_f32(f32::NAN).permille(), 0);
    }

    #[test]
    fn multiplier_sets() {
        let t = TorqueTuning::for_preset(MultiplierSet::PowerMatched);
        assert_eq!(
            t.drive_factor(InverterUpgrade::Em57With110Kw),
            Some(ScaleFactor::from_permille(1320))
        );
        assert_eq!(t.drive_factor(InverterUpgrade::Disabled), None);
        let t = TorqueTuning::default();
        assert_eq!(
            t.drive_factor(InverterUpgrade::Em57With160Kw),
            Some(ScaleFactor::from_permille(1600))
        );
        assert_eq!(t.regen_factor(), Some(ScaleFactor::from_permille(1100)));
    }

    #[test]
    fn persisted_codes() {
        assert_eq!(VehicleProfile::try_from(1), Ok(VehicleProfile::Env200));
        assert_eq!(u8::from(VehicleProfile::LeafZe1), 4);
        assert_eq!(InverterUpgrade::try_from(2), Ok(InverterUpgrade::Disabled));
        assert!(InverterUpgrade::try_from(3).is_err());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = GatewayConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(
            config.block(0x4000_0000, true),
            Err(ConfigError::IdOutOfRange(0x4000_0000))
        );
        assert_eq!(config.block(0x800, false), Err(ConfigError::IdOutOfRange(0x800)));
        config.torque.regen = ScaleFactor::from_permille(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroScaleFactor));
    }

    #[test]
    fn blacklist_is_bounded_and_deduplicated() {
        let mut config = GatewayConfig::default();
        for id in 0..BLACKLIST_CAPACITY as u32 {
            assert_eq!(config.block(0x100 + id, false), Ok(()));
        }
        assert_eq!(config.block(0x100, false), Ok(()));
        assert_eq!(config.block(0x100, true), Err(ConfigError::BlacklistFull));
    }
}
