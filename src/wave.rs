// This file is part of resid-rs.
// Copyright (c) 2017-2019 Sebastian Jastrzebski <sebby2k@gmail.com>. All rights reserved.
// Portions (c) 2004 Dag Lem <resid@nimrod.no>
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#![allow(clippy::cast_lossless)]

use bit_field::BitField;

use super::wave_table::WaveTables;
use super::ChipModel;

/// Number of harmonic sub-oscillators per voice.
pub const NUM_HARMONICS: usize = 8;

const ACC_MASK: u32 = 0x00ff_ffff;
const ACC_MSB: u32 = 0x0080_0000;
const ACC_BIT19: u32 = 0x0008_0000;
const SHIFT_MASK: u32 = 0x007f_ffff;
const SHIFT_RESET: u32 = 0x007f_fffc;
/// Shift register bits routed to the noise output.
const NOISE_TAPS: u32 =
    (1 << 22) | (1 << 20) | (1 << 16) | (1 << 13) | (1 << 11) | (1 << 7) | (1 << 4) | (1 << 2);

/// A 24 bit accumulator is the basis for waveform generation. FREQ is added to
/// the lower 16 bits of the accumulator each cycle.
/// The accumulator is set to zero when TEST is set, and starts counting
/// when TEST is cleared.
/// The noise waveform is taken from intermediate bits of a 23 bit shift
/// register. This register is clocked by bit 19 of the accumulator.
///
/// Next to the fundamental the generator keeps eight harmonic
/// sub-accumulators running at integer multiples of FREQ. They only reach the
/// output when at least one harmonic volume is non-zero.
#[derive(Clone, Copy)]
pub struct WaveformGenerator {
    tables: &'static WaveTables,
    // Configuration
    frequency: u16,
    pulse_width: u16,
    waveform: u8,
    ring_mod: bool,
    sync: bool,
    test: bool,
    harmonic_volume: [u8; NUM_HARMONICS],
    // Runtime State
    acc: u32,
    shift: u32,
    msb_rising: bool,
    harmonic_acc: [u32; NUM_HARMONICS],
}

impl WaveformGenerator {
    /// Create a generator using the combined waveform tables of `chip_model`.
    pub fn new(chip_model: ChipModel) -> Self {
        let mut wave = WaveformGenerator {
            tables: WaveTables::get(chip_model),
            frequency: 0,
            pulse_width: 0,
            waveform: 0,
            ring_mod: false,
            sync: false,
            test: false,
            harmonic_volume: [0; NUM_HARMONICS],
            acc: 0,
            shift: SHIFT_RESET,
            msb_rising: false,
            harmonic_acc: [0; NUM_HARMONICS],
        };
        wave.reset();
        wave
    }

    /// Switch combined waveform tables, keeping register and oscillator state.
    pub fn set_chip_model(&mut self, chip_model: ChipModel) {
        self.tables = WaveTables::get(chip_model);
    }

    // -- Register access

    /// Frequency low byte.
    pub fn get_frequency_lo(&self) -> u8 {
        self.frequency as u8
    }

    /// Frequency high byte.
    pub fn get_frequency_hi(&self) -> u8 {
        (self.frequency >> 8) as u8
    }

    /// Pulse width low byte.
    pub fn get_pulse_width_lo(&self) -> u8 {
        self.pulse_width as u8
    }

    /// Pulse width high nibble.
    pub fn get_pulse_width_hi(&self) -> u8 {
        (self.pulse_width >> 8) as u8
    }

    /// Control register without the gate bit.
    pub fn get_control(&self) -> u8 {
        let mut value = self.waveform << 4;
        value.set_bit(3, self.test);
        value.set_bit(2, self.ring_mod);
        value.set_bit(1, self.sync);
        value
    }

    /// Volume of harmonic `index` (0 is twice the fundamental).
    pub fn get_harmonic_volume(&self, index: usize) -> u8 {
        self.harmonic_volume[index]
    }

    /// Set frequency low byte.
    pub fn set_frequency_lo(&mut self, value: u8) {
        self.frequency = (self.frequency & 0xff00) | value as u16;
    }

    /// Set frequency high byte.
    pub fn set_frequency_hi(&mut self, value: u8) {
        self.frequency = ((value as u16) << 8) | (self.frequency & 0x00ff);
    }

    /// Set pulse width low byte.
    pub fn set_pulse_width_lo(&mut self, value: u8) {
        self.pulse_width = (self.pulse_width & 0x0f00) | value as u16;
    }

    /// Set pulse width high nibble.
    pub fn set_pulse_width_hi(&mut self, value: u8) {
        self.pulse_width = (((value as u16) << 8) & 0x0f00) | (self.pulse_width & 0x00ff);
    }

    /// Write the control register (waveform, test, ring mod, sync).
    pub fn set_control(&mut self, value: u8) {
        let test_next = value.get_bit(3);
        self.waveform = (value >> 4) & 0x0f;
        self.ring_mod = value.get_bit(2);
        self.sync = value.get_bit(1);

        if test_next && !self.test {
            self.acc = 0;
            self.harmonic_acc = [0; NUM_HARMONICS];
            self.msb_rising = false;
            // The inverted bit 19 lands in bit 1, which lets software seed
            // the noise register through the test bit.
            let bit19 = (self.shift >> 19) & 1;
            self.shift = (self.shift & 0x7f_fffd) | ((bit19 ^ 1) << 1);
        } else if !test_next && self.test {
            self.clock_shift_register();
        }
        self.test = test_next;

        // Combined noise pulls the selected shift register bits low.
        if self.waveform > 8 {
            self.shift &= SHIFT_MASK ^ NOISE_TAPS;
        }
    }

    /// Set the volume of harmonic `index`.
    pub fn set_harmonic_volume(&mut self, index: usize, value: u8) {
        self.harmonic_volume[index] = value;
    }

    /// Upper 8 bits of the current output, as seen through OSC3.
    pub fn read_osc(&self, sync_source: Option<&WaveformGenerator>) -> u8 {
        (self.output(sync_source) >> 4) as u8
    }

    // -- Oscillator state

    /// Phase accumulator (24 bits).
    pub fn get_acc(&self) -> u32 {
        self.acc
    }

    /// Noise shift register (23 bits).
    pub fn get_shift(&self) -> u32 {
        self.shift
    }

    /// Harmonic sub-accumulators.
    pub fn get_harmonic_acc(&self) -> [u32; NUM_HARMONICS] {
        self.harmonic_acc
    }

    /// Sync bit of the control register.
    pub fn get_sync(&self) -> bool {
        self.sync
    }

    /// Whether the accumulator MSB went high during the last clock.
    pub fn is_msb_rising(&self) -> bool {
        self.msb_rising
    }

    /// Restore the accumulator.
    pub fn set_acc(&mut self, value: u32) {
        self.acc = value & ACC_MASK;
    }

    /// Restore the noise shift register.
    pub fn set_shift(&mut self, value: u32) {
        self.shift = value & SHIFT_MASK;
    }

    /// Restore the harmonic sub-accumulators.
    pub fn set_harmonic_acc(&mut self, value: [u32; NUM_HARMONICS]) {
        self.harmonic_acc = value.map(|acc| acc & ACC_MASK);
    }

    /// Restore the MSB edge flag.
    pub fn set_msb_rising(&mut self, value: bool) {
        self.msb_rising = value;
    }

    #[inline]
    fn clock_shift_register(&mut self) {
        let bit0 = ((self.shift >> 22) ^ (self.shift >> 17)) & 0x01;
        self.shift = ((self.shift << 1) & SHIFT_MASK) | bit0;
    }

    /// Advance the oscillator by one cycle.
    #[inline]
    pub fn clock(&mut self) {
        // Accumulator and harmonics are frozen while TEST is set.
        if self.test {
            return;
        }
        let acc_prev = self.acc;
        self.acc = (self.acc + self.frequency as u32) & ACC_MASK;
        self.msb_rising = acc_prev & ACC_MSB == 0 && self.acc & ACC_MSB != 0;

        // Shift noise register once for each time accumulator bit 19 is set high.
        if acc_prev & ACC_BIT19 == 0 && self.acc & ACC_BIT19 != 0 {
            self.clock_shift_register();
        }

        for (multiple, acc) in (2u32..).zip(self.harmonic_acc.iter_mut()) {
            *acc = (*acc + self.frequency as u32 * multiple) & ACC_MASK;
        }
    }

    /// Hard sync: restart the accumulator.
    #[inline]
    pub(crate) fn restart(&mut self) {
        self.acc = 0;
    }

    #[inline]
    fn noise(&self) -> u16 {
        let s = self.shift;
        (((s & 0x40_0000) >> 11)
            | ((s & 0x10_0000) >> 10)
            | ((s & 0x01_0000) >> 7)
            | ((s & 0x00_2000) >> 5)
            | ((s & 0x00_0800) >> 4)
            | ((s & 0x00_0080) >> 1)
            | ((s & 0x00_0010) << 1)
            | ((s & 0x00_0004) << 2)) as u16
    }

    /// Selected waveform evaluated at accumulator value `acc`.
    ///
    /// `ring_msb` is the MSB of the ring modulating accumulator, or zero.
    #[inline]
    fn waveform_at(&self, acc: u32, ring_msb: u32) -> u16 {
        let saw = (acc >> 12) as usize;
        let folded = acc ^ ring_msb;
        let pulse = if self.test || (acc >> 12) >= self.pulse_width as u32 {
            0x0fff
        } else {
            0x0000
        };
        let tone = match self.waveform & 0x07 {
            0x1 => {
                let acc = if folded & ACC_MSB != 0 { !acc } else { acc };
                ((acc >> 11) & 0x0fff) as u16
            }
            0x2 => saw as u16,
            0x3 => self.tables.st[saw],
            0x4 => pulse,
            0x5 => self.tables.pt[(folded >> 12) as usize & 0x0fff] & pulse,
            0x6 => self.tables.ps[saw] & pulse,
            0x7 => self.tables.pst[saw] & pulse,
            _ => {
                if self.waveform & 0x08 != 0 {
                    0x0fff
                } else {
                    0
                }
            }
        };
        if self.waveform & 0x08 != 0 {
            self.noise() & tone
        } else {
            tone
        }
    }

    /// 12-bit waveform output.
    ///
    /// `sync_source` is the ring modulating oscillator; `None` means the
    /// generator modulates itself, which leaves triangle unfolded.
    #[inline]
    pub fn output(&self, sync_source: Option<&WaveformGenerator>) -> u16 {
        let ring_msb = if self.ring_mod {
            sync_source.map_or(self.acc, |source| source.acc) & ACC_MSB
        } else {
            0
        };
        let base = self.waveform_at(self.acc, ring_msb);
        if self.harmonic_volume.iter().all(|&volume| volume == 0) {
            return base;
        }
        let mut sum = base as i32;
        for (&volume, &acc) in self.harmonic_volume.iter().zip(self.harmonic_acc.iter()) {
            if volume != 0 {
                sum += (volume as i32 * (self.waveform_at(acc, ring_msb) as i32 - 0x800)) >> 8;
            }
        }
        sum.clamp(0, 0x0fff) as u16
    }

    /// Reset registers and oscillator state.
    pub fn reset(&mut self) {
        self.acc = 0;
        self.harmonic_acc = [0; NUM_HARMONICS];
        self.harmonic_volume = [0; NUM_HARMONICS];
        self.shift = SHIFT_RESET;
        self.frequency = 0;
        self.pulse_width = 0;
        self.waveform = 0;
        self.test = false;
        self.ring_mod = false;
        self.sync = false;
        self.set_control(0);
        self.msb_rising = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock_n(wave: &mut WaveformGenerator, n: u32) {
        for _ in 0..n {
            wave.clock();
        }
    }

    #[test]
    fn rising_test_bit_writes_inverted_bit19() {
        let mut wave = WaveformGenerator::new(ChipModel::Mos6581);
        wave.set_shift(0x08_0000);
        wave.set_control(0x08);
        assert_eq!(wave.get_shift() & 0x02, 0);

        wave.set_control(0x00);
        wave.set_shift(0x00_0000);
        wave.set_control(0x08);
        assert_eq!(wave.get_shift() & 0x02, 0x02);
    }

    #[test]
    fn falling_test_bit_shifts_once() {
        let mut wave = WaveformGenerator::new(ChipModel::Mos6581);
        wave.set_control(0x08);
        let before = wave.get_shift();
        wave.set_control(0x00);
        let bit0 = ((before >> 22) ^ (before >> 17)) & 1;
        assert_eq!(wave.get_shift(), ((before << 1) & SHIFT_MASK) | bit0);
    }

    #[test]
    fn combined_noise_clears_taps() {
        let mut wave = WaveformGenerator::new(ChipModel::Mos8580);
        wave.set_shift(SHIFT_MASK);
        wave.set_control(0x90);
        assert_eq!(wave.get_shift() & NOISE_TAPS, 0);
        assert_eq!(wave.output(None), 0);
    }

    #[test]
    fn noise_register_clocks_on_bit19() {
        let mut wave = WaveformGenerator::new(ChipModel::Mos6581);
        wave.set_frequency_hi(0x80);
        wave.set_control(0x80);
        let start = wave.get_shift();
        // 0x8000 per cycle: bit 19 first rises on cycle 16.
        clock_n(&mut wave, 15);
        assert_eq!(wave.get_shift(), start);
        wave.clock();
        assert_ne!(wave.get_shift(), start);
    }

    #[test]
    fn pulse_compares_against_width() {
        let mut wave = WaveformGenerator::new(ChipModel::Mos6581);
        wave.set_pulse_width_hi(0x08);
        wave.set_control(0x40);
        wave.set_acc(0x7f_f000);
        assert_eq!(wave.output(None), 0);
        wave.set_acc(0x80_0000);
        assert_eq!(wave.output(None), 0xfff);
    }

    #[test]
    fn ring_mod_folds_triangle_with_source_msb() {
        let mut source = WaveformGenerator::new(ChipModel::Mos6581);
        let mut wave = WaveformGenerator::new(ChipModel::Mos6581);
        wave.set_control(0x14);
        wave.set_acc(0x10_0000);
        let plain = wave.output(Some(&source));
        source.set_acc(0x80_0000);
        let folded = wave.output(Some(&source));
        assert_eq!(plain, 0x200);
        assert_eq!(folded, 0xdff);
    }

    #[test]
    fn harmonics_run_at_multiples() {
        let mut wave = WaveformGenerator::new(ChipModel::Mos6581);
        wave.set_frequency_lo(0x10);
        wave.set_control(0x20);
        clock_n(&mut wave, 3);
        let harmonics = wave.get_harmonic_acc();
        assert_eq!(wave.get_acc(), 0x30);
        assert_eq!(harmonics[0], 0x60);
        assert_eq!(harmonics[7], 0x30 * 9);
    }

    #[test]
    fn harmonic_volume_changes_output() {
        let mut wave = WaveformGenerator::new(ChipModel::Mos6581);
        wave.set_frequency_hi(0x01);
        wave.set_control(0x20);
        clock_n(&mut wave, 3000);
        let plain = wave.output(None);
        wave.set_harmonic_volume(0, 0xff);
        assert_ne!(wave.output(None), plain);
        assert!(wave.output(None) <= 0xfff);
    }
}
