use crate::CanFrame;

use arrayvec::ArrayVec;

pub const TX_QUEUE_CAPACITY: usize = 32;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Enqueued {
    Accepted,
    Dropped,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DrainOutcome {
    Empty,
    Sent,
    NotReady,
}

/// Bounded FIFO of frames waiting for a free transmit mailbox.
///
/// Slots `head..tail` are pending. Sending advances `head`; once it catches up
/// with `tail` both go back to zero. A full queue refuses new frames instead
/// of evicting old ones.
#[derive(Debug, Clone)]
pub struct TxQueue<const N: usize = TX_QUEUE_CAPACITY> {
    frames: ArrayVec<CanFrame, N>,
    head: usize,
    dropped: u32,
    not_ready: u32,
}

impl<const N: usize> Default for TxQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> TxQueue<N> {
    pub fn new() -> Self {
        Self {
            frames: ArrayVec::new(),
            head: 0,
            dropped: 0,
            not_ready: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn enqueue(&mut self, frame: CanFrame) -> Enqueued {
        if self.frames.is_full() && self.head > 0 {
            // Reclaim slots already sent
            self.frames.drain(..self.head);
            self.head = 0;
        }
        match self.frames.try_push(frame) {
            Ok(()) => Enqueued::Accepted,
            Err(_) => {
                self.dropped = self.dropped.wrapping_add(1);
                Enqueued::Dropped
            }
        }
    }

    /// Offers the oldest pending frame to `send`. The frame is consumed only
    /// if `send` returns true.
    pub fn drain_one<F>(&mut self, send: F) -> DrainOutcome
    where
        F: FnOnce(&CanFrame) -> bool,
    {
        let Some(frame) = self.frames.get(self.head) else {
            return DrainOutcome::Empty;
        };
        if !send(frame) {
            self.not_ready = self.not_ready.wrapping_add(1);
            return DrainOutcome::NotReady;
        }
        self.head += 1;
        if self.head == self.frames.len() {
            self.frames.clear();
            self.head = 0;
        }
        DrainOutcome::Sent
    }

    pub fn pending(&self) -> usize {
        self.frames.len() - self.head
    }

    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }

    pub fn peek(&self) -> Option<&CanFrame> {
        self.frames.get(self.head)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CanFrame> {
        self.frames[self.head..].iter()
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn tail(&self) -> usize {
        self.frames.len()
    }

    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn not_ready(&self) -> u32 {
        self.not_ready
    }
}
