#[allow(unused_imports)]
use log::{debug, info, trace, warn};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum ShiftState {
    #[default]
    Park,
    Reverse,
    Neutral,
    Drive,
    EcoDrive,
}

impl ShiftState {
    /// Shifter frame 0x11A. Byte 0 high nibble selects the position; byte 1
    /// bit 4 marks Eco-Drive on cars that report it. Anything unrecognised is
    /// treated as Park.
    pub fn decode(data: &[u8], eco_drive_bit: bool) -> Self {
        let Some(b0) = data.first() else {
            return ShiftState::Park;
        };
        match b0 & 0xF0 {
            0x20 => ShiftState::Reverse,
            0x30 => ShiftState::Neutral,
            0x40 => {
                let eco = data.get(1).map_or(false, |b1| b1 & 0x10 != 0);
                if eco_drive_bit && eco {
                    ShiftState::EcoDrive
                } else {
                    ShiftState::Drive
                }
            }
            _ => ShiftState::Park,
        }
    }
}

/// Charging status byte of 0x1F2, kept verbatim.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ChargePhase(pub u8);

impl ChargePhase {
    pub const SLOW: ChargePhase = ChargePhase(0x20);
    pub const QUICK_START: ChargePhase = ChargePhase(0x40);
    pub const IDLE: ChargePhase = ChargePhase(0x60);
    pub const QUICK: ChargePhase = ChargePhase(0xC0);
    pub const QUICK_END: ChargePhase = ChargePhase(0xE0);

    pub fn is_slow(self) -> bool {
        self == Self::SLOW
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::SLOW => "slow",
            Self::QUICK_START => "quick start",
            Self::IDLE => "idle",
            Self::QUICK => "quick",
            Self::QUICK_END => "quick end",
            _ => "unknown",
        }
    }
}

impl Default for ChargePhase {
    fn default() -> Self {
        Self::IDLE
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum EcoScreen {
    #[default]
    Unreported,
    Off,
    On,
}

impl EcoScreen {
    /// 0x5A9 byte 0, low two bits: 1 = off, 2 = on. Other values carry no
    /// information.
    pub fn decode(data: &[u8]) -> Option<Self> {
        match data.first()? & 0x03 {
            1 => Some(EcoScreen::Off),
            2 => Some(EcoScreen::On),
            _ => None,
        }
    }

    /// Percentage shown on the cluster instead of the real state of charge
    pub fn decoy_soc(self) -> Option<u8> {
        match self {
            EcoScreen::On => Some(99),
            EcoScreen::Off => Some(11),
            EcoScreen::Unreported => None,
        }
    }
}

/// Battery state of charge from 0x55B, whole percent
pub fn decode_soc(data: &[u8]) -> Option<u16> {
    let b0 = *data.first()? as u16;
    let b1 = *data.get(1)? as u16;
    Some(((b0 << 2) | ((b1 & 0xC0) >> 6)) / 10)
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct VehicleState {
    pub shift: ShiftState,
    pub charge_phase: ChargePhase,
    pub eco_screen: EcoScreen,
    /// Last demand seen on 0x1D4 before any rewrite
    pub vcm_torque_demand: i16,
    pub battery_soc: Option<u16>,
}

impl VehicleState {
    /// Torque frames are only touched while driving normally and not
    /// AC charging.
    pub fn torque_rewrite_allowed(&self) -> bool {
        self.shift == ShiftState::Drive
            && self.eco_screen != EcoScreen::On
            && !self.charge_phase.is_slow()
    }

    pub fn set_shift(&mut self, shift: ShiftState) {
        if shift != self.shift {
            debug!("Shift {:?} -> {:?}", self.shift, shift);
            self.shift = shift;
        }
    }

    pub fn set_charge_phase(&mut self, phase: ChargePhase) {
        if phase != self.charge_phase {
            debug!(
                "Charge phase {:#04X} ({}) -> {:#04X} ({})",
                self.charge_phase.0,
                self.charge_phase.name(),
                phase.0,
                phase.name()
            );
            self.charge_phase = phase;
        }
    }

    pub fn set_eco_screen(&mut self, eco: EcoScreen) {
        if eco != self.eco_screen {
            debug!("Eco screen {:?} -> {:?}", self.eco_screen, eco);
            self.eco_screen = eco;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shifter_positions() {
        assert_eq!(ShiftState::decode(&[0x00, 0x00], false), ShiftState::Park);
        assert_eq!(ShiftState::decode(&[0x2E, 0x00], false), ShiftState::Reverse);
        assert_eq!(ShiftState::decode(&[0x30, 0x00], false), ShiftState::Neutral);
        assert_eq!(ShiftState::decode(&[0x40, 0x00], false), ShiftState::Drive);
        assert_eq!(ShiftState::decode(&[0x90, 0x00], false), ShiftState::Park);
        assert_eq!(ShiftState::decode(&[], false), ShiftState::Park);
    }

    #[test]
    fn eco_drive_needs_decoding_enabled() {
        assert_eq!(ShiftState::decode(&[0x40, 0x10], false), ShiftState::Drive);
        assert_eq!(ShiftState::decode(&[0x40, 0x10], true), ShiftState::EcoDrive);
        assert_eq!(ShiftState::decode(&[0x40], true), ShiftState::Drive);
    }

    #[test]
    fn eco_screen_and_decoy() {
        assert_eq!(EcoScreen::decode(&[0x01]), Some(EcoScreen::Off));
        assert_eq!(EcoScreen::decode(&[0xF6]), Some(EcoScreen::On));
        assert_eq!(EcoScreen::decode(&[0x03]), None);
        assert_eq!(EcoScreen::On.decoy_soc(), Some(99));
        assert_eq!(EcoScreen::Off.decoy_soc(), Some(11));
        assert_eq!(EcoScreen::Unreported.decoy_soc(), None);
    }

    #[test]
    fn soc_from_battery_frame() {
        // 0x2EE = 750 -> 75 %
        assert_eq!(decode_soc(&[0xBB, 0x80]), Some(75));
        assert_eq!(decode_soc(&[0xBB]), None);
    }

    #[test]
    fn starts_parked_and_idle() {
        let state = VehicleState::default();
        assert_eq!(state.shift, ShiftState::Park);
        assert_eq!(state.charge_phase, ChargePhase::IDLE);
        assert!(!state.torque_rewrite_allowed());
    }

    #[test]
    fn rewrite_gating() {
        let mut state = VehicleState {
            shift: ShiftState::Drive,
            ..Default::default()
        };
        assert!(state.torque_rewrite_allowed());
        state.eco_screen = EcoScreen::On;
        assert!(!state.torque_rewrite_allowed());
        state.eco_screen = EcoScreen::Off;
        state.charge_phase = ChargePhase::SLOW;
        assert!(!state.torque_rewrite_allowed());
        state.charge_phase = ChargePhase::QUICK;
        state.shift = ShiftState::EcoDrive;
        assert!(!state.torque_rewrite_allowed());
    }
}
