// This file is part of resid-rs.
// Copyright (c) 2017-2019 Sebastian Jastrzebski <sebby2k@gmail.com>. All rights reserved.
// Portions (c) 2004 Dag Lem <resid@nimrod.no>
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

//! First-order shelving filters applied after the SID filter.
//!
//! Both stages share the allpass section
//! `y1[n] = a * (x[n] - y1[n-1]) + x[n-1]` with `a = (k - 1) / (k + 1)` and
//! `k = tan(2 * PI * fc / 1MHz)`. Adding `H0/2 * y1` lifts the band below the
//! cutoff, subtracting it lifts the band above.

#![allow(clippy::cast_lossless)]

use std::f64::consts::PI;
use std::marker::PhantomData;

/// Gain registers are 8.8 fixed point dB.
const GAIN_FRACTION_BITS: u32 = 8;

const DEFAULT_CUTOFF: u16 = 100;

/// Selects which side of the cutoff a [`ShelvingFilter`] boosts.
pub trait Shelf {
    /// Sign applied to the allpass output.
    const SIGN: f64;
}

/// Low shelf.
#[derive(Clone, Copy, Debug)]
pub enum Bass {}

/// High shelf.
#[derive(Clone, Copy, Debug)]
pub enum Treble {}

impl Shelf for Bass {
    const SIGN: f64 = 1.0;
}

impl Shelf for Treble {
    const SIGN: f64 = -1.0;
}

/// Bass boost stage.
pub type BassBoostFilter = ShelvingFilter<Bass>;
/// Treble boost stage.
pub type TrebleBoostFilter = ShelvingFilter<Treble>;

/// Shelving filter with register controlled gain and cutoff.
///
/// A gain of zero bypasses the stage.
#[derive(Clone, Copy, Debug)]
pub struct ShelvingFilter<S: Shelf> {
    // Configuration
    gain: u16,
    cutoff: u16,
    a: f64,
    h0_per2: f64,
    // Runtime State
    x_prev: i32,
    y1_prev: i32,
    vo: i32,
    shelf: PhantomData<S>,
}

impl<S: Shelf> Default for ShelvingFilter<S> {
    fn default() -> Self {
        let mut filter = ShelvingFilter {
            gain: 0,
            cutoff: DEFAULT_CUTOFF,
            a: 0.0,
            h0_per2: 0.0,
            x_prev: 0,
            y1_prev: 0,
            vo: 0,
            shelf: PhantomData,
        };
        filter.reset();
        filter
    }
}

impl<S: Shelf> ShelvingFilter<S> {
    /// Create a bypassed stage with a 100Hz cutoff.
    pub fn new() -> Self {
        Self::default()
    }

    fn setup_filter(&mut self) {
        let v0 = 10f64.powf(self.gain as f64 / (1 << GAIN_FRACTION_BITS) as f64 / 20.0);
        self.h0_per2 = (v0 - 1.0) / 2.0;
        let k = (2.0 * PI * self.cutoff as f64 / 1_000_000.0).tan();
        self.a = (k - 1.0) / (k + 1.0);
    }

    /// Gain low byte.
    pub fn get_gain_lo(&self) -> u8 {
        self.gain as u8
    }

    /// Gain high byte.
    pub fn get_gain_hi(&self) -> u8 {
        (self.gain >> 8) as u8
    }

    /// Cutoff low byte.
    pub fn get_cutoff_lo(&self) -> u8 {
        self.cutoff as u8
    }

    /// Cutoff high byte.
    pub fn get_cutoff_hi(&self) -> u8 {
        (self.cutoff >> 8) as u8
    }

    /// Set gain low byte.
    pub fn set_gain_lo(&mut self, value: u8) {
        self.gain = (self.gain & 0xff00) | value as u16;
        self.setup_filter();
    }

    /// Set gain high byte.
    pub fn set_gain_hi(&mut self, value: u8) {
        self.gain = (self.gain & 0x00ff) | ((value as u16) << 8);
        self.setup_filter();
    }

    /// Set cutoff low byte.
    pub fn set_cutoff_lo(&mut self, value: u8) {
        self.cutoff = (self.cutoff & 0xff00) | value as u16;
        self.setup_filter();
    }

    /// Set cutoff high byte.
    pub fn set_cutoff_hi(&mut self, value: u8) {
        self.cutoff = (self.cutoff & 0x00ff) | ((value as u16) << 8);
        self.setup_filter();
    }

    /// Clock the stage for one cycle.
    #[inline]
    pub fn clock(&mut self, vi: i32) {
        if self.gain == 0 {
            self.vo = vi;
            return;
        }
        let x = vi;
        let y1 = (self.a * (x - self.y1_prev) as f64) as i32 + self.x_prev;
        self.vo = (self.h0_per2 * (x as f64 + S::SIGN * y1 as f64)) as i32 + x;
        self.x_prev = x;
        self.y1_prev = y1;
    }

    /// Output for the last clocked cycle.
    #[inline]
    pub fn output(&self) -> i32 {
        self.vo
    }

    /// `[x_prev, y1_prev, vo]`.
    pub fn get_state(&self) -> [i32; 3] {
        [self.x_prev, self.y1_prev, self.vo]
    }

    /// Restore `[x_prev, y1_prev, vo]`.
    pub fn set_state(&mut self, state: [i32; 3]) {
        [self.x_prev, self.y1_prev, self.vo] = state;
    }

    /// Bypass with a 100Hz cutoff and clear state.
    pub fn reset(&mut self) {
        self.gain = 0;
        self.cutoff = DEFAULT_CUTOFF;
        self.x_prev = 0;
        self.y1_prev = 0;
        self.vo = 0;
        self.setup_filter();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sine_peak<S: Shelf>(filter: &mut ShelvingFilter<S>, period: u32) -> i32 {
        let mut peak = 0;
        for cycle in 0..period * 20 {
            let phase = 2.0 * PI * (cycle % period) as f64 / period as f64;
            filter.clock((phase.sin() * 100_000.0) as i32);
            if cycle >= period * 10 {
                peak = peak.max(filter.output().abs());
            }
        }
        peak
    }

    #[test]
    fn zero_gain_is_transparent() {
        let mut bass = BassBoostFilter::new();
        let mut treble = TrebleBoostFilter::new();
        bass.set_cutoff_hi(0x10);
        treble.set_cutoff_lo(0x55);
        for vi in [-400_000, -1, 0, 3, 250_000] {
            bass.clock(vi);
            treble.clock(vi);
            assert_eq!(bass.output(), vi);
            assert_eq!(treble.output(), vi);
        }
    }

    #[test]
    fn coefficients_follow_gain_and_cutoff() {
        let mut bass = BassBoostFilter::new();
        // 6dB in 8.8 fixed point.
        bass.set_gain_hi(0x06);
        bass.set_cutoff_lo(0xe8);
        bass.set_cutoff_hi(0x03);
        assert_relative_eq!(bass.h0_per2, (10f64.powf(0.3) - 1.0) / 2.0, epsilon = 1e-12);
        let k = (2.0 * PI * 1000.0 / 1e6).tan();
        assert_relative_eq!(bass.a, (k - 1.0) / (k + 1.0), epsilon = 1e-12);
    }

    #[test]
    fn bass_lifts_lows_and_treble_lifts_highs() {
        let mut bass = BassBoostFilter::new();
        bass.set_gain_hi(0x0c);
        bass.set_cutoff_lo(0xf4);
        bass.set_cutoff_hi(0x01);
        // 100Hz and 20kHz at 1MHz.
        let low = sine_peak(&mut bass, 10_000);
        bass.reset();
        bass.set_gain_hi(0x0c);
        bass.set_cutoff_lo(0xf4);
        bass.set_cutoff_hi(0x01);
        let high = sine_peak(&mut bass, 50);
        assert!(low > 150_000, "low = {}", low);
        assert!(high < 120_000, "high = {}", high);

        let mut treble = TrebleBoostFilter::new();
        treble.set_gain_hi(0x0c);
        treble.set_cutoff_lo(0xf4);
        treble.set_cutoff_hi(0x01);
        let low = sine_peak(&mut treble, 10_000);
        treble.reset();
        treble.set_gain_hi(0x0c);
        treble.set_cutoff_lo(0xf4);
        treble.set_cutoff_hi(0x01);
        let high = sine_peak(&mut treble, 50);
        assert!(low < 150_000, "low = {}", low);
        assert!(high > 300_000, "high = {}", high);
    }
}
