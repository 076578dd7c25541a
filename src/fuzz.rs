// This file is part of resid-rs.
// Copyright (c) 2017-2019 Sebastian Jastrzebski <sebby2k@gmail.com>. All rights reserved.
// Portions (c) 2004 Dag Lem <resid@nimrod.no>
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#![allow(clippy::cast_lossless)]

use super::{SAMPLE_MAX, SAMPLE_MIN};

/// Saturating waveshaper.
///
/// `Vo = mix * z + (1 - mix) * Vi` with `z = sign(Vi) * (1 - e^-q) * multiplier`
/// and `q = |Vi| * gain`, where gain and multiplier are 8.8 fixed point
/// relative to full scale and mix is in 1/256 steps. A gain of zero passes
/// the input through unchanged.
///
/// One instance sits after the treble boost on the master bus; every voice
/// carries another one ahead of the mixer.
#[derive(Clone, Copy, Debug, Default)]
pub struct FuzzFilter {
    // Configuration
    gain: u16,
    multiplier: u16,
    mix: u8,
    // Runtime State
    vo: i32,
}

impl FuzzFilter {
    /// Create a bypassed stage.
    pub fn new() -> Self {
        FuzzFilter::default()
    }

    /// Gain low byte.
    pub fn get_gain_lo(&self) -> u8 {
        self.gain as u8
    }

    /// Gain high byte.
    pub fn get_gain_hi(&self) -> u8 {
        (self.gain >> 8) as u8
    }

    /// Multiplier low byte.
    pub fn get_mult_lo(&self) -> u8 {
        self.multiplier as u8
    }

    /// Multiplier high byte.
    pub fn get_mult_hi(&self) -> u8 {
        (self.multiplier >> 8) as u8
    }

    /// Mix of the shaped signal, 0..=255 out of 256.
    pub fn get_mix(&self) -> u8 {
        self.mix
    }

    /// Set gain low byte.
    pub fn set_gain_lo(&mut self, value: u8) {
        self.gain = (self.gain & 0xff00) | value as u16;
    }

    /// Set gain high byte.
    pub fn set_gain_hi(&mut self, value: u8) {
        self.gain = (self.gain & 0x00ff) | ((value as u16) << 8);
    }

    /// Set multiplier low byte.
    pub fn set_mult_lo(&mut self, value: u8) {
        self.multiplier = (self.multiplier & 0xff00) | value as u16;
    }

    /// Set multiplier high byte.
    pub fn set_mult_hi(&mut self, value: u8) {
        self.multiplier = (self.multiplier & 0x00ff) | ((value as u16) << 8);
    }

    /// Set mix.
    pub fn set_mix(&mut self, value: u8) {
        self.mix = value;
    }

    /// Process one sample.
    #[inline]
    pub fn clock(&mut self, vi: i32) {
        if self.gain == 0 {
            self.vo = vi;
            return;
        }
        let full_scale = SAMPLE_MAX as f64;
        let q = (vi as f64).abs() * self.gain as f64 / 256.0 / full_scale;
        let sign = if vi >= 0 { 1.0 } else { -1.0 };
        let z = sign * (1.0 - (-q).exp()) * full_scale * self.multiplier as f64 / 256.0;
        let z = z.clamp(SAMPLE_MIN as f64, full_scale) as i64;
        let mix = self.mix as i64;
        self.vo = ((mix * z + (256 - mix) * vi as i64) >> 8) as i32;
    }

    /// Last processed sample.
    #[inline]
    pub fn output(&self) -> i32 {
        self.vo
    }

    /// Restore the output latch.
    pub fn set_output(&mut self, vo: i32) {
        self.vo = vo;
    }

    /// Bypass and clear.
    pub fn reset(&mut self) {
        *self = FuzzFilter::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_gain_is_transparent() {
        let mut fuzz = FuzzFilter::new();
        fuzz.set_mix(0x80);
        fuzz.set_mult_hi(0x01);
        for vi in [-300_000, -1, 0, 1, 77_777, SAMPLE_MAX] {
            fuzz.clock(vi);
            assert_eq!(fuzz.output(), vi);
        }
    }

    #[test]
    fn zero_mix_is_transparent() {
        let mut fuzz = FuzzFilter::new();
        fuzz.set_gain_hi(0x10);
        fuzz.set_mult_hi(0x02);
        for vi in [-500_000, -3, 0, 12_345, 900_000] {
            fuzz.clock(vi);
            assert_eq!(fuzz.output(), vi);
        }
    }

    #[test]
    fn full_mix_saturates_symmetrically() {
        let mut fuzz = FuzzFilter::new();
        fuzz.set_gain_hi(0x40);
        fuzz.set_mult_hi(0x01);
        fuzz.set_mix(0xff);
        fuzz.clock(SAMPLE_MAX / 2);
        let positive = fuzz.output();
        fuzz.clock(-SAMPLE_MAX / 2);
        let negative = fuzz.output();
        assert!(positive > SAMPLE_MAX / 2, "soft clip boosts mid level input");
        assert!(positive <= SAMPLE_MAX);
        assert_eq!(positive, -negative);
    }
}
