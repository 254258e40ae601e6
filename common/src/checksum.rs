//! Checksums carried in byte 7 of the Nissan powertrain frames.
//!
//! Two unrelated conventions are in use. Most frames carry a CRC-8 with
//! polynomial 0x85 over bytes 0..7. A few older frames use a 4-bit sum of all
//! nibbles of bytes 0..7 stored in the low nibble of byte 7.

use crate::{CanFrame, FrameError, CAN_MAX_DLEN};

const CRC8_POLY: u8 = 0x85;
const CHECKSUM_BYTE: usize = CAN_MAX_DLEN - 1;

pub const CRC8_TABLE: [u8; 256] = crc8_table(CRC8_POLY);

const fn crc8_table(poly: u8) -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ poly
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

pub fn crc8(bytes: &[u8]) -> u8 {
    bytes
        .iter()
        .fold(0u8, |crc, b| CRC8_TABLE[(crc ^ b) as usize])
}

/// Stores the CRC-8 of bytes 0..7 into byte 7. Must be called after every
/// modification of a frame that uses this convention.
pub fn apply_crc8(frame: &mut CanFrame) -> Result<(), FrameError> {
    if frame.len() != CAN_MAX_DLEN {
        return Err(FrameError::IndexOutOfRange {
            index: CHECKSUM_BYTE,
            len: frame.len(),
        });
    }
    let crc = crc8(&frame.data()[..CHECKSUM_BYTE]);
    frame.set_byte(CHECKSUM_BYTE, crc)
}

pub fn sum4(bytes: &[u8]) -> u8 {
    let sum = bytes
        .iter()
        .fold(0u8, |sum, b| sum.wrapping_add(b >> 4).wrapping_add(b & 0x0F));
    sum.wrapping_add(2) & 0x0F
}

/// Stores the nibble sum of bytes 0..7 into the low nibble of byte 7. The
/// high nibble is left alone.
pub fn apply_sum4(frame: &mut CanFrame) -> Result<(), FrameError> {
    if frame.len() != CAN_MAX_DLEN {
        return Err(FrameError::IndexOutOfRange {
            index: CHECKSUM_BYTE,
            len: frame.len(),
        });
    }
    let sum = sum4(&frame.data()[..CHECKSUM_BYTE]);
    let high = frame.data()[CHECKSUM_BYTE] & 0xF0;
    frame.set_byte(CHECKSUM_BYTE, high | sum)
}
