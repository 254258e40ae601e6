#![allow(dead_code)]

use bridge::common::{CanFrame, CanTransport, ChannelId};

/// Accepts every frame and remembers where it went
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Vec<(ChannelId, CanFrame)>,
    /// Refuse this many frames before accepting again
    pub busy_for: usize,
}

impl CanTransport for RecordingTransport {
    fn try_send(&mut self, channel: ChannelId, frame: &CanFrame) -> bool {
        if self.busy_for > 0 {
            self.busy_for -= 1;
            return false;
        }
        self.sent.push((channel, *frame));
        true
    }
}

impl RecordingTransport {
    pub fn to(&self, channel: ChannelId) -> Vec<CanFrame> {
        self.sent
            .iter()
            .filter(|(ch, _)| *ch == channel)
            .map(|(_, f)| *f)
            .collect()
    }

    pub fn count(&self, channel: ChannelId, id: u32) -> usize {
        self.sent
            .iter()
            .filter(|(ch, f)| *ch == channel && f.id() == id)
            .count()
    }

    pub fn last(&self, channel: ChannelId, id: u32) -> Option<CanFrame> {
        self.sent
            .iter()
            .rev()
            .find(|(ch, f)| *ch == channel && f.id() == id)
            .map(|(_, f)| *f)
    }
}

pub fn frame(id: u16, data: &[u8]) -> CanFrame {
    CanFrame::new_standard(id, data).unwrap()
}
