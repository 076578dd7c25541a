// This file is part of resid-rs.
// Copyright (c) 2017-2019 Sebastian Jastrzebski <sebby2k@gmail.com>. All rights reserved.
// Portions (c) 2004 Dag Lem <resid@nimrod.no>
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#![allow(clippy::cast_lossless)]

use bit_field::BitField;

const RATE_COUNTER_MASK: u16 = 0x7fff;
const RATE_COUNTER_MSB_MASK: u16 = 0x8000;

// Rate counter periods in cycles, one per 4-bit rate nibble. Derived from the
// envelope rates in the Programmer's Reference Guide and corrected by timing
// ENV3 from level 1 to level 129: the chip compares against the rounded
// calculated value and needs one more cycle to zero the counter.
const RATE_COUNTER_PERIOD: [u16; 16] = [
    9,     //   2ms
    32,    //   8ms
    63,    //  16ms
    95,    //  24ms
    149,   //  38ms
    220,   //  56ms
    267,   //  68ms
    313,   //  80ms
    392,   // 100ms
    977,   // 250ms
    1954,  // 500ms
    3126,  // 800ms
    3907,  //   1s
    11720, //   3s
    19532, //   5s
    31251, //   8s
];

// Both nibbles of the envelope counter are compared to the sustain value.
const SUSTAIN_LEVEL: [u8; 16] = [
    0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff,
];

/// Envelope phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum State {
    /// Counting up to 0xff.
    Attack,
    /// Counting down to the sustain level, then holding.
    DecaySustain,
    /// Counting down to zero.
    #[default]
    Release,
}

/// ADSR envelope generator.
///
/// A 15-bit rate counter divides the clock down to the selected rate period.
/// Decay and release steps are further divided by an exponential counter
/// whose period grows as the envelope falls (1, 2, 4, 8, 16, 30 at levels
/// 0xff, 0x5d, 0x36, 0x1a, 0x0e, 0x06), approximating the discharge curve of
/// the real chip. Once the counter reaches zero it is frozen until the gate
/// opens again.
#[derive(Clone, Copy, Debug)]
pub struct EnvelopeGenerator {
    // Configuration
    attack: u8,
    decay: u8,
    sustain: u8,
    release: u8,
    // Control
    gate: bool,
    // Runtime State
    state: State,
    envelope_counter: u8,
    exponential_counter: u16,
    exponential_counter_period: u16,
    hold_zero: bool,
    rate_counter: u16,
    rate_counter_period: u16,
}

impl Default for EnvelopeGenerator {
    fn default() -> Self {
        let mut envelope = EnvelopeGenerator {
            attack: 0,
            decay: 0,
            sustain: 0,
            release: 0,
            gate: false,
            state: State::Release,
            envelope_counter: 0,
            exponential_counter: 0,
            exponential_counter_period: 1,
            hold_zero: true,
            rate_counter: 0,
            rate_counter_period: RATE_COUNTER_PERIOD[0],
        };
        envelope.reset();
        envelope
    }
}

impl EnvelopeGenerator {
    // -- Register access

    /// Packed attack/decay register.
    pub fn get_attack_decay(&self) -> u8 {
        (self.attack << 4) | self.decay
    }

    /// Packed sustain/release register.
    pub fn get_sustain_release(&self) -> u8 {
        (self.sustain << 4) | self.release
    }

    /// Gate bit as it appears in the control register.
    pub fn get_control(&self) -> u8 {
        let mut value = 0u8;
        value.set_bit(0, self.gate);
        value
    }

    /// Write the attack/decay register.
    pub fn set_attack_decay(&mut self, value: u8) {
        self.attack = (value >> 4) & 0x0f;
        self.decay = value & 0x0f;
        match self.state {
            State::Attack => self.rate_counter_period = RATE_COUNTER_PERIOD[self.attack as usize],
            State::DecaySustain => {
                self.rate_counter_period = RATE_COUNTER_PERIOD[self.decay as usize]
            }
            State::Release => {}
        }
    }

    /// Write the sustain/release register.
    pub fn set_sustain_release(&mut self, value: u8) {
        self.sustain = (value >> 4) & 0x0f;
        self.release = value & 0x0f;
        if self.state == State::Release {
            self.rate_counter_period = RATE_COUNTER_PERIOD[self.release as usize];
        }
    }

    /// Write the control register; only the gate bit is used.
    pub fn set_control(&mut self, value: u8) {
        let gate_next = value.get_bit(0);
        if !self.gate && gate_next {
            self.state = State::Attack;
            self.rate_counter_period = RATE_COUNTER_PERIOD[self.attack as usize];
            // Attack unlocks the zero freeze.
            self.hold_zero = false;
        } else if self.gate && !gate_next {
            self.state = State::Release;
            self.rate_counter_period = RATE_COUNTER_PERIOD[self.release as usize];
        }
        self.gate = gate_next;
    }

    /// ENV3 readback.
    pub fn read_env(&self) -> u8 {
        self.envelope_counter
    }

    // -- Counter state

    /// Current phase.
    pub fn state(&self) -> State {
        self.state
    }

    /// Rate counter and its current period.
    pub fn rate_counter(&self) -> (u16, u16) {
        (self.rate_counter, self.rate_counter_period)
    }

    /// Exponential counter and its current period.
    pub fn exponential_counter(&self) -> (u16, u16) {
        (self.exponential_counter, self.exponential_counter_period)
    }

    /// Whether the counter is frozen at zero.
    pub fn is_hold_zero(&self) -> bool {
        self.hold_zero
    }

    /// Restore the internal counters after the registers have been written.
    pub fn restore(
        &mut self,
        state: State,
        envelope_counter: u8,
        rate_counter: (u16, u16),
        exponential_counter: (u16, u16),
        hold_zero: bool,
    ) {
        self.state = state;
        self.envelope_counter = envelope_counter;
        (self.rate_counter, self.rate_counter_period) = rate_counter;
        (self.exponential_counter, self.exponential_counter_period) = exponential_counter;
        self.hold_zero = hold_zero;
    }

    /// Advance by one cycle.
    #[inline]
    pub fn clock(&mut self) {
        // ADSR delay bug: when the period is lowered below the current count
        // the counter runs on to 0x8000 and wraps before it can match.
        self.rate_counter += 1;
        if self.rate_counter & RATE_COUNTER_MSB_MASK != 0 {
            self.rate_counter = (self.rate_counter + 1) & RATE_COUNTER_MASK;
        }
        if self.rate_counter != self.rate_counter_period {
            return;
        }
        self.rate_counter = 0;

        // The first attack step also resets the exponential counter.
        if self.state != State::Attack {
            self.exponential_counter += 1;
            if self.exponential_counter != self.exponential_counter_period {
                return;
            }
        }
        self.exponential_counter = 0;

        if self.hold_zero {
            return;
        }

        match self.state {
            State::Attack => {
                // 0xff -> 0x00 is possible after a release -> attack flip.
                self.envelope_counter = self.envelope_counter.wrapping_add(1);
                if self.envelope_counter == 0xff {
                    self.state = State::DecaySustain;
                    self.rate_counter_period = RATE_COUNTER_PERIOD[self.decay as usize];
                }
            }
            State::DecaySustain => {
                if self.envelope_counter != SUSTAIN_LEVEL[self.sustain as usize] {
                    self.envelope_counter = self.envelope_counter.wrapping_sub(1);
                }
            }
            State::Release => {
                self.envelope_counter = self.envelope_counter.wrapping_sub(1);
            }
        }

        self.exponential_counter_period = match self.envelope_counter {
            0xff => 1,
            0x5d => 2,
            0x36 => 4,
            0x1a => 8,
            0x0e => 16,
            0x06 => 30,
            0x00 => {
                self.hold_zero = true;
                1
            }
            _ => self.exponential_counter_period,
        };
    }

    /// 8-bit envelope level.
    #[inline]
    pub fn output(&self) -> u8 {
        self.envelope_counter
    }

    /// Reset to release at level zero.
    pub fn reset(&mut self) {
        self.attack = 0;
        self.decay = 0;
        self.sustain = 0;
        self.release = 0;
        self.gate = false;
        self.state = State::Release;
        self.envelope_counter = 0;
        self.exponential_counter = 0;
        self.exponential_counter_period = 1;
        self.hold_zero = true;
        self.rate_counter = 0;
        self.rate_counter_period = RATE_COUNTER_PERIOD[self.release as usize];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock_n(envelope: &mut EnvelopeGenerator, n: u32) {
        for _ in 0..n {
            envelope.clock();
        }
    }

    fn cycles_until(envelope: &mut EnvelopeGenerator, level: u8, limit: u32) -> u32 {
        let mut cycles = 0;
        while envelope.read_env() != level && cycles < limit {
            envelope.clock();
            cycles += 1;
        }
        cycles
    }

    #[test]
    fn reset_holds_zero_in_release() {
        let mut envelope = EnvelopeGenerator::default();
        clock_n(&mut envelope, 10_000);
        assert_eq!(envelope.state(), State::Release);
        assert_eq!(envelope.output(), 0);
        assert!(envelope.is_hold_zero());
    }

    #[test]
    fn attack_reaches_peak_then_decays_to_sustain() {
        let mut envelope = EnvelopeGenerator::default();
        envelope.set_attack_decay(0x00);
        envelope.set_sustain_release(0x80);
        envelope.set_control(0x01);

        let attack = cycles_until(&mut envelope, 0xff, 100_000);
        assert_eq!(attack, 9 * 255, "attack 0 steps once every 9 cycles");
        assert_eq!(envelope.state(), State::DecaySustain);

        cycles_until(&mut envelope, 0x88, 1_000_000);
        clock_n(&mut envelope, 50_000);
        assert_eq!(envelope.output(), 0x88, "decay stops at sustain level");
    }

    #[test]
    fn gate_off_releases_to_zero_and_freezes() {
        let mut envelope = EnvelopeGenerator::default();
        envelope.set_sustain_release(0xf0);
        envelope.set_control(0x01);
        cycles_until(&mut envelope, 0xff, 100_000);
        envelope.set_control(0x00);
        assert_eq!(envelope.state(), State::Release);
        let released = cycles_until(&mut envelope, 0x00, 1_000_000);
        assert!(released < 1_000_000);
        assert!(envelope.is_hold_zero());
        clock_n(&mut envelope, 10_000);
        assert_eq!(envelope.output(), 0);
    }

    #[test]
    fn adsr_delay_bug() {
        let mut envelope = EnvelopeGenerator::default();
        envelope.set_attack_decay(0x70);
        envelope.set_control(0x01);
        clock_n(&mut envelope, 200);
        assert_eq!(envelope.read_env(), 0);

        // Lowering the period below the running count: wrap at 0x8000 first.
        envelope.set_attack_decay(0x20);
        clock_n(&mut envelope, 200);
        assert_eq!(envelope.read_env(), 0, "counter must wrap before stepping");
    }

    #[test]
    fn release_to_attack_flip_wraps_ff_to_00() {
        let mut envelope = EnvelopeGenerator::default();
        envelope.set_attack_decay(0x77);
        envelope.set_sustain_release(0x77);
        envelope.set_control(0x01);
        cycles_until(&mut envelope, 0xff, 1_000_000);

        envelope.set_control(0x00);
        clock_n(&mut envelope, 3);
        envelope.set_control(0x01);
        clock_n(&mut envelope, 315);
        assert_eq!(envelope.read_env(), 0, "counter should wrap 0xff -> 0x00");
    }

    #[test]
    fn restore_round_trips_counters() {
        let mut envelope = EnvelopeGenerator::default();
        envelope.set_attack_decay(0x35);
        envelope.set_control(0x01);
        clock_n(&mut envelope, 12_345);

        let mut copy = EnvelopeGenerator::default();
        copy.set_attack_decay(envelope.get_attack_decay());
        copy.set_control(envelope.get_control());
        copy.restore(
            envelope.state(),
            envelope.output(),
            envelope.rate_counter(),
            envelope.exponential_counter(),
            envelope.is_hold_zero(),
        );
        for _ in 0..20_000 {
            envelope.clock();
            copy.clock();
            assert_eq!(envelope.output(), copy.output());
        }
    }

    macro_rules! test_attack_rate {
        ($name:ident, $attack:expr, $period:expr) => {
            #[test]
            fn $name() {
                let mut envelope = EnvelopeGenerator::default();
                envelope.set_attack_decay($attack << 4);
                envelope.set_control(0x01);
                let cycles = cycles_until(&mut envelope, 1, 100_000);
                assert_eq!(cycles, $period, "attack {} first step", $attack);
            }
        };
    }

    test_attack_rate!(attack_rate_0, 0, 9);
    test_attack_rate!(attack_rate_1, 1, 32);
    test_attack_rate!(attack_rate_2, 2, 63);
    test_attack_rate!(attack_rate_8, 8, 392);
}
