use crate::behavior::Anchor;
use crate::state::ChargePhase;

use arrayvec::ArrayVec;
use common::checksum::CRC8_TABLE;
use common::CanFrame;

pub const MAX_BATCH: usize = 8;
pub type SyntheticBatch = ArrayVec<CanFrame, MAX_BATCH>;

// Messages the upgraded inverter expects from components the car no longer
// has. Payloads are captures from a running car.
const MSG_1C2: CanFrame = CanFrame::standard_const(0x1C2, 1, [0x50, 0, 0, 0, 0, 0, 0, 0]);
const MSG_108: CanFrame = CanFrame::standard_const(0x108, 3, [0x00, 0x00, 0x00, 0, 0, 0, 0, 0]);
// Startup sequence
const MSG_1CB: CanFrame =
    CanFrame::standard_const(0x1CB, 7, [0x00, 0x09, 0xFF, 0xCE, 0x10, 0x8B, 0xE7, 0]);
const MSG_1ED: CanFrame = CanFrame::standard_const(0x1ED, 3, [0xFF, 0xE0, 0x68, 0, 0, 0, 0, 0]);
const MSG_355: CanFrame =
    CanFrame::standard_const(0x355, 8, [0x14, 0x0A, 0x13, 0x97, 0x10, 0x00, 0x40, 0x00]);
// Clears P3197 and P318E
const MSG_4B9: CanFrame = CanFrame::standard_const(0x4B9, 1, [0x40, 0, 0, 0, 0, 0, 0, 0]);
const MSG_625: CanFrame =
    CanFrame::standard_const(0x625, 6, [0x02, 0x00, 0xFF, 0x1D, 0x20, 0x00, 0, 0]);
const MSG_5C5: CanFrame =
    CanFrame::standard_const(0x5C5, 8, [0x40, 0x01, 0x2F, 0x5E, 0x00, 0x00, 0x00, 0x00]);
const MSG_3B8: CanFrame =
    CanFrame::standard_const(0x3B8, 5, [0x7F, 0xE8, 0x01, 0x07, 0xFF, 0, 0, 0]);
const MSG_5EC: CanFrame = CanFrame::standard_const(0x5EC, 1, [0x00, 0, 0, 0, 0, 0, 0, 0]);
const MSG_5EB: CanFrame =
    CanFrame::standard_const(0x5EB, 8, [0xE0, 0x0F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
const MSG_5CD: CanFrame =
    CanFrame::standard_const(0x5CD, 5, [0x7A, 0x06, 0xF5, 0x1F, 0xC0, 0, 0, 0]);
const MSG_605: CanFrame = CanFrame::standard_const(0x605, 1, [0x00, 0, 0, 0, 0, 0, 0, 0]);
const MSG_607: CanFrame = CanFrame::standard_const(0x607, 1, [0x00, 0, 0, 0, 0, 0, 0, 0]);

// Bytes 5-6 of 0x1CB and bytes 1-2 of 0x1ED for each of the four PRUN steps
const PRUN_1CB: [[u8; 2]; 4] = [[0x88, 0xED], [0x89, 0x68], [0x8A, 0x62], [0x8B, 0xE7]];
const PRUN_1ED: [[u8; 2]; 4] = [[0xE0, 0x68], [0xE1, 0xED], [0xE2, 0xE7], [0xE3, 0x62]];

/// Steps a counter through `first..=last`, going back to `first` after `last`
pub fn counter_update_within(value: &mut u8, first: u8, last: u8) {
    *value = if *value >= last || *value < first {
        first
    } else {
        *value + 1
    };
}

// Templates always have the indexed byte
fn set(frame: &mut CanFrame, index: usize, value: u8) {
    if let Some(b) = frame.data_mut().get_mut(index) {
        *b = value;
    }
}

/// Fabricates the periodic frames of the replaced components. Each anchor
/// drives its own family; the generator only decides what to send, the
/// caller routes it.
#[derive(Debug, Clone)]
pub struct SyntheticGenerator {
    // 10 ms
    msg_1c2: CanFrame,
    msg_108: CanFrame,
    msg_1cb: CanFrame,
    msg_1ed: CanFrame,
    prun: u8,
    counter_108: u8,
    // 40 ms
    ticker_40ms: u8,
    // 100 ms
    msg_4b9: CanFrame,
    msg_3b8: CanFrame,
    counter_3b8: u8,
    flip_3b8: bool,
    // 500 ms and 1000 ms
    ticker_100ms: u8,
    msg_5cd: CanFrame,
    content_5cd: u8,
    flip_5cd: bool,
}

impl Default for SyntheticGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticGenerator {
    pub fn new() -> Self {
        Self {
            msg_1c2: MSG_1C2,
            msg_108: MSG_108,
            msg_1cb: MSG_1CB,
            msg_1ed: MSG_1ED,
            prun: 0,
            counter_108: 0,
            ticker_40ms: 0,
            msg_4b9: MSG_4B9,
            msg_3b8: MSG_3B8,
            counter_3b8: 0,
            flip_3b8: false,
            ticker_100ms: 0,
            msg_5cd: MSG_5CD,
            content_5cd: 0,
            flip_5cd: false,
        }
    }

    /// Appends the frames due on this arrival of `anchor` to `out`.
    pub fn on_anchor(
        &mut self,
        anchor: Anchor,
        charge_phase: ChargePhase,
        out: &mut SyntheticBatch,
    ) {
        match anchor {
            Anchor::Vcm10ms => self.tick_10ms(out),
            Anchor::Vcm20ms => {
                // Interrupts AC charging on 62 kWh packs
                if charge_phase.is_slow() {
                    return;
                }
                self.tick_20ms(out);
            }
            Anchor::Vcm100ms => self.tick_100ms(charge_phase, out),
            Anchor::Wakeup => {
                push(out, MSG_605);
                push(out, MSG_607);
            }
        }
    }

    fn tick_10ms(&mut self, out: &mut SyntheticBatch) {
        push(out, self.msg_1c2);
        push(out, self.msg_108);
        push(out, self.msg_1cb);
        push(out, self.msg_1ed);

        self.prun = (self.prun + 1) % 4;
        let [a, b] = PRUN_1CB[self.prun as usize];
        set(&mut self.msg_1cb, 5, a);
        set(&mut self.msg_1cb, 6, b);
        let [a, b] = PRUN_1ED[self.prun as usize];
        set(&mut self.msg_1ed, 1, a);
        set(&mut self.msg_1ed, 2, b);

        let mut c = self.msg_1c2.data()[0];
        counter_update_within(&mut c, 0x50, 0x5F);
        set(&mut self.msg_1c2, 0, c);

        counter_update_within(&mut self.counter_108, 0x00, 0x0F);
        set(&mut self.msg_108, 1, self.counter_108);
        set(&mut self.msg_108, 2, CRC8_TABLE[self.counter_108 as usize]);
    }

    fn tick_20ms(&mut self, out: &mut SyntheticBatch) {
        self.ticker_40ms += 1;
        if self.ticker_40ms > 1 {
            self.ticker_40ms = 0;
            push(out, MSG_355);
        }
    }

    fn tick_100ms(&mut self, charge_phase: ChargePhase, out: &mut SyntheticBatch) {
        let mut c = self.msg_4b9.data()[0];
        counter_update_within(&mut c, 0x40, 0x4F);
        set(&mut self.msg_4b9, 0, c);
        push(out, self.msg_4b9);

        if charge_phase.is_slow() {
            return;
        }

        push(out, MSG_625);
        push(out, MSG_5C5);
        push(out, self.msg_3b8);

        counter_update_within(&mut self.counter_3b8, 0, 14);
        set(&mut self.msg_3b8, 2, self.counter_3b8);
        set(&mut self.msg_3b8, 1, if self.flip_3b8 { 0xC8 } else { 0xE8 });
        self.flip_3b8 = !self.flip_3b8;

        self.ticker_100ms += 1;
        if self.ticker_100ms > 4 {
            self.ticker_100ms = 0;
            push(out, MSG_5EC);
            push(out, MSG_5EB);

            if !self.flip_5cd {
                set(&mut self.msg_5cd, 1, self.content_5cd);
                push(out, self.msg_5cd);
                self.content_5cd += 4;
                if self.content_5cd > 238 {
                    self.content_5cd = 2;
                }
            }
            self.flip_5cd = !self.flip_5cd;
        }
    }
}

fn push(out: &mut SyntheticBatch, frame: CanFrame) {
    let pushed = out.try_push(frame);
    debug_assert!(pushed.is_ok(), "synthetic batch overflow at {:03X}", frame.id());
}
