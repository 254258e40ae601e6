use crate::ChannelId;

use core::fmt;
use fixedstr::str_format;

pub const CAN_MAX_DLEN: usize = 8;
pub const STANDARD_ID_MAX: u32 = 0x7FF;
pub const EXTENDED_ID_MAX: u32 = 0x1FFF_FFFF;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FrameError {
    LengthOutOfRange(usize),
    IdOutOfRange(u32),
    IndexOutOfRange { index: usize, len: usize },
    RemoteFrame,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::LengthOutOfRange(len) => {
                write!(f, "frame length {} exceeds {} bytes", len, CAN_MAX_DLEN)
            }
            FrameError::IdOutOfRange(id) => write!(f, "identifier {:#X} out of range", id),
            FrameError::IndexOutOfRange { index, len } => {
                write!(f, "byte {} is beyond frame length {}", index, len)
            }
            FrameError::RemoteFrame => write!(f, "remote frames carry no payload"),
        }
    }
}

/// Identifier together with its format. Standard `0x1D4` and extended
/// `0x000001D4` are different identifiers.
#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord)]
pub struct FrameId {
    raw: u32,
    extended: bool,
}

impl FrameId {
    pub fn new(raw: u32, extended: bool) -> Result<Self, FrameError> {
        let max = if extended { EXTENDED_ID_MAX } else { STANDARD_ID_MAX };
        if raw > max {
            return Err(FrameError::IdOutOfRange(raw));
        }
        Ok(Self { raw, extended })
    }

    pub fn raw(&self) -> u32 {
        self.raw
    }

    pub fn is_extended(&self) -> bool {
        self.extended
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.extended {
            write!(f, "{:08X}x", self.raw)
        } else {
            write!(f, "{:03X}", self.raw)
        }
    }
}

/// A classic CAN data frame: identifier, length and up to 8 payload bytes.
///
/// Frames are plain values. Whatever goes towards another channel is a copy,
/// and the length can never exceed [`CAN_MAX_DLEN`], so every access through
/// [`CanFrame::data`] stays within the declared payload.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct CanFrame {
    id: u32,
    extended: bool,
    len: u8,
    data: [u8; CAN_MAX_DLEN],
}

impl CanFrame {
    /// Builds a frame at compile time. Only meant for fixed message templates;
    /// an invalid template fails the build.
    pub const fn standard_const(id: u16, len: u8, data: [u8; CAN_MAX_DLEN]) -> Self {
        assert!(id as u32 <= STANDARD_ID_MAX);
        assert!(len as usize <= CAN_MAX_DLEN);
        Self {
            id: id as u32,
            extended: false,
            len,
            data,
        }
    }

    pub fn new_standard(id: u16, data: &[u8]) -> Result<Self, FrameError> {
        if id as u32 > STANDARD_ID_MAX {
            return Err(FrameError::IdOutOfRange(id as u32));
        }
        Self::with_payload(id as u32, false, data)
    }

    pub fn new_extended(id: u32, data: &[u8]) -> Result<Self, FrameError> {
        if id > EXTENDED_ID_MAX {
            return Err(FrameError::IdOutOfRange(id));
        }
        Self::with_payload(id, true, data)
    }

    /// Builds a frame from what a transceiver driver reports: a data length
    /// code and a receive buffer which may be larger than the payload.
    pub fn from_dlc(id: u32, extended: bool, dlc: u8, bytes: &[u8]) -> Result<Self, FrameError> {
        let len = dlc as usize;
        if len > CAN_MAX_DLEN {
            return Err(FrameError::LengthOutOfRange(len));
        }
        if bytes.len() < len {
            return Err(FrameError::IndexOutOfRange {
                index: len - 1,
                len: bytes.len(),
            });
        }
        if extended {
            Self::new_extended(id, &bytes[..len])
        } else if id > STANDARD_ID_MAX {
            Err(FrameError::IdOutOfRange(id))
        } else {
            Self::with_payload(id, false, &bytes[..len])
        }
    }

    fn with_payload(id: u32, extended: bool, data: &[u8]) -> Result<Self, FrameError> {
        if data.len() > CAN_MAX_DLEN {
            return Err(FrameError::LengthOutOfRange(data.len()));
        }
        let mut frame = Self {
            id,
            extended,
            len: data.len() as u8,
            data: [0; CAN_MAX_DLEN],
        };
        frame.data[..data.len()].copy_from_slice(data);
        Ok(frame)
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn is_extended(&self) -> bool {
        self.extended
    }

    pub fn frame_id(&self) -> FrameId {
        FrameId {
            raw: self.id,
            extended: self.extended,
        }
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn data(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data[..self.len as usize]
    }

    pub fn byte(&self, index: usize) -> Option<u8> {
        self.data().get(index).copied()
    }

    pub fn set_byte(&mut self, index: usize, value: u8) -> Result<(), FrameError> {
        let len = self.len();
        match self.data_mut().get_mut(index) {
            Some(b) => {
                *b = value;
                Ok(())
            }
            None => Err(FrameError::IndexOutOfRange { index, len }),
        }
    }

    /// One line per frame, e.g. `2|1DB|[00, 11, 22]`
    pub fn summary(&self, channel: ChannelId) -> fixedstr::str64 {
        if self.extended {
            str_format!(
                fixedstr::str64,
                "{}|{:08X}|{:02X?}",
                u8::from(channel),
                self.id,
                self.data()
            )
        } else {
            str_format!(
                fixedstr::str64,
                "{}|{:03X}|{:02X?}",
                u8::from(channel),
                self.id,
                self.data()
            )
        }
    }
}

impl TryFrom<&bxcan::Frame> for CanFrame {
    type Error = FrameError;

    fn try_from(frame: &bxcan::Frame) -> Result<Self, Self::Error> {
        let data = frame.data().ok_or(FrameError::RemoteFrame)?;
        match frame.id() {
            bxcan::Id::Standard(id) => CanFrame::new_standard(id.as_raw(), data),
            bxcan::Id::Extended(id) => CanFrame::new_extended(id.as_raw(), data),
        }
    }
}

impl TryFrom<&CanFrame> for bxcan::Frame {
    type Error = FrameError;

    fn try_from(frame: &CanFrame) -> Result<Self, Self::Error> {
        let data = bxcan::Data::new(frame.data()).ok_or(FrameError::LengthOutOfRange(frame.len()))?;
        let id: bxcan::Id = if frame.is_extended() {
            bxcan::ExtendedId::new(frame.id())
                .ok_or(FrameError::IdOutOfRange(frame.id()))?
                .into()
        } else {
            bxcan::StandardId::new(frame.id() as u16)
                .filter(|_| frame.id() <= STANDARD_ID_MAX)
                .ok_or(FrameError::IdOutOfRange(frame.id()))?
                .into()
        };
        Ok(bxcan::Frame::new_data(id, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_oversized_payload() {
        assert_eq!(
            CanFrame::new_standard(0x100, &[0; 9]),
            Err(FrameError::LengthOutOfRange(9))
        );
        assert_eq!(
            CanFrame::from_dlc(0x100, false, 12, &[0; 16]),
            Err(FrameError::LengthOutOfRange(12))
        );
    }

    #[test]
    fn rejects_short_receive_buffer() {
        assert_eq!(
            CanFrame::from_dlc(0x100, false, 4, &[1, 2]),
            Err(FrameError::IndexOutOfRange { index: 3, len: 2 })
        );
    }

    #[test]
    fn rejects_out_of_range_ids() {
        assert_eq!(
            CanFrame::new_standard(0x800, &[]),
            Err(FrameError::IdOutOfRange(0x800))
        );
        assert_eq!(
            CanFrame::from_dlc(0x800, false, 0, &[]),
            Err(FrameError::IdOutOfRange(0x800))
        );
        assert!(CanFrame::new_extended(0x1FFF_FFFF, &[]).is_ok());
        assert_eq!(
            CanFrame::new_extended(0x2000_0000, &[]),
            Err(FrameError::IdOutOfRange(0x2000_0000))
        );
    }

    #[test]
    fn frame_id_keeps_the_format() {
        let std = CanFrame::new_standard(0x1D4, &[]).unwrap().frame_id();
        let ext = CanFrame::new_extended(0x1D4, &[]).unwrap().frame_id();
        assert_ne!(std, ext);
        assert_eq!(std, FrameId::new(0x1D4, false).unwrap());
        assert_eq!(FrameId::new(0x800, false), Err(FrameError::IdOutOfRange(0x800)));
        assert!(FrameId::new(0x800, true).is_ok());
    }

    #[test]
    fn from_dlc_ignores_bytes_past_dlc() {
        let frame = CanFrame::from_dlc(0x1DB, false, 2, &[0xAA, 0xBB, 0xCC, 0xDD]).unwrap();
        assert_eq!(frame.data(), &[0xAA, 0xBB]);
    }

    #[test]
    fn writes_beyond_length_are_rejected() {
        let mut frame = CanFrame::new_standard(0x4B9, &[0x40]).unwrap();
        assert_eq!(frame.set_byte(0, 0x41), Ok(()));
        assert_eq!(
            frame.set_byte(1, 0xFF),
            Err(FrameError::IndexOutOfRange { index: 1, len: 1 })
        );
        assert_eq!(frame.data(), &[0x41]);
        assert_eq!(frame.byte(1), None);
    }

    #[test]
    fn summary_matches_debug_line_layout() {
        let frame = CanFrame::new_standard(0x1DB, &[0x00, 0x1F, 0xA0]).unwrap();
        assert_eq!(frame.summary(ChannelId::Can2).as_str(), "2|1DB|[00, 1F, A0]");
    }

    #[test]
    fn bxcan_conversion_keeps_id_and_payload() {
        let frame = CanFrame::new_standard(0x1D4, &[0x6e, 0x6e, 0x00, 0x00, 0x07, 0x44, 0x01, 0x28])
            .unwrap();
        let wire = bxcan::Frame::try_from(&frame).unwrap();
        assert_eq!(
            wire.id(),
            bxcan::Id::Standard(bxcan::StandardId::new(0x1D4).unwrap())
        );
        assert_eq!(CanFrame::try_from(&wire), Ok(frame));

        let ext = CanFrame::new_extended(0x18DAF110, &[0x02, 0x10]).unwrap();
        let wire = bxcan::Frame::try_from(&ext).unwrap();
        assert_eq!(CanFrame::try_from(&wire), Ok(ext));
    }

    #[test]
    fn remote_frames_are_not_translated() {
        let remote = bxcan::Frame::new_remote(bxcan::StandardId::new(0x603).unwrap(), 1);
        assert_eq!(CanFrame::try_from(&remote), Err(FrameError::RemoteFrame));
    }
}
