use common::checksum::apply_crc8;
use common::CanFrame;

#[allow(unused_imports)]
use log::{info, warn};
use ringbuffer::{ConstGenericRingBuffer, RingBuffer};

const CHARGE_IDLE: u8 = 0x60;
const CHARGE_SLOW: u8 = 0x20;

/// Traffic of a parked, then driving (or AC charging) AZE0 Leaf. The VCM side
/// is what the gateway sees on its external channel, the powertrain side is
/// what the inverter and the battery send on CAN2.
pub struct CanSimulator {
    pub vcm_txbuf: ConstGenericRingBuffer<CanFrame, 16>,
    pub powertrain_txbuf: ConstGenericRingBuffer<CanFrame, 16>,
    charging: bool,
    demand: i16,
    counter: u8,
}

fn push(buf: &mut ConstGenericRingBuffer<CanFrame, 16>, id: u16, data: &[u8], crc: bool) {
    match CanFrame::new_standard(id, data) {
        Ok(mut frame) => {
            if crc {
                if let Err(e) = apply_crc8(&mut frame) {
                    warn!("{:03X}: {}", id, e);
                }
            }
            buf.push(frame);
        }
        Err(e) => warn!("{:03X}: {}", id, e),
    }
}

impl CanSimulator {
    pub fn new(charging: bool) -> Self {
        Self {
            vcm_txbuf: ConstGenericRingBuffer::new(),
            powertrain_txbuf: ConstGenericRingBuffer::new(),
            charging,
            demand: 0,
            counter: 0,
        }
    }

    /// Pedal sweep from light regen to moderate acceleration, 4 s period
    fn demand_at(millis: u64) -> i16 {
        let phase = (millis % 4000) as i32;
        let demand = if phase < 2000 {
            -300 + phase * 900 / 2000
        } else {
            600 - (phase - 2000) * 900 / 2000
        };
        demand as i16
    }

    pub fn update(&mut self, millis: u64) {
        let driving = !self.charging && millis >= 500;

        if millis == 0 {
            push(&mut self.vcm_txbuf, 0x603, &[0x00], false);
        }

        // VCM
        if millis % 10 == 0 {
            self.counter = (self.counter + 1) & 0x03;
            let c = self.counter;
            let phase = if self.charging { CHARGE_SLOW } else { CHARGE_IDLE };
            let status = [0x30, 0x64, phase, 0x00, 0x00, 0x00, c, 0x00];
            push(&mut self.vcm_txbuf, 0x1F2, &status, true);

            let gear = if driving { 0x40 } else { 0x00 };
            let shifter = [gear, 0x40, 0x00, 0xAA, 0xC0, 0x00, c, 0x00];
            push(&mut self.vcm_txbuf, 0x11A, &shifter, true);

            self.demand = if driving { Self::demand_at(millis) } else { 0 };
            let raw = self.demand as u16 & 0x0FFF;
            let hi = (raw >> 4) as u8;
            let lo = ((raw & 0x0F) << 4) as u8;
            let demand = [0x6E, 0x6E, hi, lo, 0x07, 0x44, c, 0x00];
            push(&mut self.vcm_txbuf, 0x1D4, &demand, true);
        }
        if millis % 20 == 5 {
            push(&mut self.vcm_txbuf, 0x284, &[0x00; 8], false);
        }
        if millis % 100 == 7 {
            push(&mut self.vcm_txbuf, 0x50C, &[0x00; 6], false);
        }

        // Inverter and battery
        if millis % 10 == 3 {
            let c = self.counter;
            let response = (self.demand / 2) as u16 & 0x07FF;
            let hi = 0x20 | (response >> 8) as u8;
            let inverter = [0x55, 0x00, hi, response as u8, 0x00, 0x00, c, 0x00];
            push(&mut self.powertrain_txbuf, 0x1DA, &inverter, true);
            let battery = [0xFF, 0xE0, 0x68, 0x00, 0x42, 0x00, c, 0x00];
            push(&mut self.powertrain_txbuf, 0x1DB, &battery, true);
        }
        if millis % 100 == 50 {
            // 75.0 %
            let soc = [0xBB, 0x80, 0xAA, 0x00, 0x00, 0x00, 0x00, 0x00];
            push(&mut self.powertrain_txbuf, 0x55B, &soc, true);
            let eco = [0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
            push(&mut self.powertrain_txbuf, 0x5A9, &eco, false);
        }
        if millis % 500 == 250 {
            // Not known to the gateway, repeated as is
            let unknown = [0x73, 0x2E, 0x01, 0x52, 0x58, 0x60, 0x00, 0x00];
            push(&mut self.powertrain_txbuf, 0x5BC, &unknown, false);
        }
    }
}
