//! Torque fields of the motor frames.
//!
//! 0x1D4 (VCM demand) carries a 12 bit signed value in byte 2 and the high
//! nibble of byte 3. The low nibble of byte 3 is padding.
//!
//! 0x1DA (inverter response) carries an 11 bit signed value in the low three
//! bits of byte 2 and all of byte 3, at half the demand resolution.

use common::{CanFrame, FrameError, ScaleFactor};

pub const DEMAND_MIN: i16 = -2048;
pub const DEMAND_MAX: i16 = 2047;

pub fn sign_extend(raw: u16, bits: u32) -> i16 {
    let shift = 16 - bits;
    ((raw << shift) as i16) >> shift
}

pub fn read_demand(data: &[u8]) -> Option<i16> {
    let b2 = *data.get(2)? as u16;
    let b3 = *data.get(3)? as u16;
    Some(sign_extend((b2 << 4) | (b3 >> 4), 12))
}

/// Packs a demand back into bytes 2 and 3. The padding nibble is cleared.
pub fn write_demand(frame: &mut CanFrame, demand: i16) -> Result<(), FrameError> {
    let raw = demand as u16 & 0x0FFF;
    frame.set_byte(2, (raw >> 4) as u8)?;
    frame.set_byte(3, ((raw & 0x0F) << 4) as u8)
}

pub fn read_response(data: &[u8]) -> Option<i16> {
    let b2 = *data.get(2)? as u16;
    let b3 = *data.get(3)? as u16;
    Some(sign_extend(((b2 & 0x07) << 8) | b3, 11))
}

/// Packs a response into bytes 2 and 3, leaving the upper five bits of
/// byte 2 untouched.
pub fn write_response(frame: &mut CanFrame, response: i16) -> Result<(), FrameError> {
    let raw = response as u16 & 0x07FF;
    let b2 = frame.byte(2).ok_or(FrameError::IndexOutOfRange {
        index: 2,
        len: frame.len(),
    })?;
    frame.set_byte(2, (b2 & 0xF8) | (raw >> 8) as u8)?;
    frame.set_byte(3, raw as u8)
}

/// Rescales a demand for the upgraded inverter.
///
/// Positive values are drive torque and use `drive`. Negative values are
/// regen; their magnitude is scaled by `regen` and the sign put back, or
/// `None` is returned when regen tuning is off. The result saturates to the
/// 12 bit range.
pub fn scale_demand(demand: i16, drive: ScaleFactor, regen: Option<ScaleFactor>) -> Option<i16> {
    let scaled = if demand < 0 {
        let magnitude = -(demand as i32);
        -regen?.apply(magnitude)
    } else {
        drive.apply(demand as i32)
    };
    Some(scaled.clamp(DEMAND_MIN as i32, DEMAND_MAX as i32) as i16)
}

/// Response the VCM expects for a given demand
pub fn mirrored_response(demand: i16) -> i16 {
    demand >> 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demand_frame(demand: i16) -> CanFrame {
        let mut frame =
            CanFrame::new_standard(0x1D4, &[0x6E, 0x6E, 0x00, 0x00, 0x07, 0x44, 0x01, 0x00])
                .unwrap();
        write_demand(&mut frame, demand).unwrap();
        frame
    }

    #[test]
    fn sign_extension() {
        assert_eq!(sign_extend(0x7FF, 12), 2047);
        assert_eq!(sign_extend(0x800, 12), -2048);
        assert_eq!(sign_extend(0xF9C, 12), -100);
        assert_eq!(sign_extend(0x3FF, 11), 1023);
        assert_eq!(sign_extend(0x7CE, 11), -50);
    }

    #[test]
    fn demand_layout() {
        let frame = demand_frame(400);
        assert_eq!(&frame.data()[2..4], &[0x19, 0x00]);
        assert_eq!(read_demand(frame.data()), Some(400));

        let frame = demand_frame(-100);
        assert_eq!(&frame.data()[2..4], &[0xF9, 0xC0]);
        assert_eq!(read_demand(frame.data()), Some(-100));
    }

    #[test]
    fn demand_ignores_padding_nibble() {
        assert_eq!(read_demand(&[0, 0, 0x19, 0x0F]), Some(400));
        assert_eq!(read_demand(&[0, 0, 0x19]), None);
    }

    #[test]
    fn response_layout_keeps_upper_bits() {
        let mut frame =
            CanFrame::new_standard(0x1DA, &[0x00, 0x00, 0xA8, 0x00, 0x00, 0x00, 0x00, 0x00])
                .unwrap();
        write_response(&mut frame, -50).unwrap();
        assert_eq!(&frame.data()[2..4], &[0xAF, 0xCE]);
        assert_eq!(read_response(frame.data()), Some(-50));
        write_response(&mut frame, 200).unwrap();
        assert_eq!(&frame.data()[2..4], &[0xA8, 0xC8]);
    }

    #[test]
    fn drive_scaling_truncates() {
        let f110 = ScaleFactor::from_permille(900);
        let f160 = ScaleFactor::from_permille(1600);
        assert_eq!(scale_demand(400, f110, None), Some(360));
        assert_eq!(scale_demand(400, f160, None), Some(640));
        assert_eq!(scale_demand(333, f110, None), Some(299));
        assert_eq!(scale_demand(0, f160, None), Some(0));
    }

    #[test]
    fn drive_scaling_saturates() {
        let f160 = ScaleFactor::from_permille(1600);
        assert_eq!(scale_demand(2000, f160, None), Some(DEMAND_MAX));
    }

    #[test]
    fn regen_scales_magnitude() {
        let drive = ScaleFactor::from_permille(1600);
        let regen = Some(ScaleFactor::from_permille(1100));
        assert_eq!(scale_demand(-100, drive, regen), Some(-110));
        assert_eq!(scale_demand(-1, drive, regen), Some(-1));
        assert_eq!(scale_demand(-2048, drive, regen), Some(DEMAND_MIN));
        assert_eq!(scale_demand(-100, drive, None), None);
    }

    #[test]
    fn response_is_half_demand() {
        assert_eq!(mirrored_response(400), 200);
        assert_eq!(mirrored_response(-100), -50);
        assert_eq!(mirrored_response(-101), -51);
        assert_eq!(mirrored_response(DEMAND_MIN), -1024);
    }
}
