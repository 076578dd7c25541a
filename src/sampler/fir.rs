// This file is part of resid-rs.
// Copyright (c) 2017-2019 Sebastian Jastrzebski <sebby2k@gmail.com>. All rights reserved.
// Portions (c) 2004 Dag Lem <resid@nimrod.no>
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

//! Kaiser-windowed sinc filter design for the resampler.

use std::f64::consts::PI;

use super::{FIR_RES_INTERPOLATE, FIR_SHIFT};

/// Bank of `res` phase shifted impulse responses, `n` taps each.
#[derive(Clone, Default)]
pub struct Fir {
    pub data: Vec<i16>,
    pub n: i32,
    pub res: i32,
}

impl Fir {
    /// Design the bank for the given rates. `pass_freq` has already been
    /// resolved and validated by the caller.
    pub fn new(clock_freq: f64, sample_freq: f64, pass_freq: f64, filter_scale: f64) -> Self {
        let samples_per_cycle = sample_freq / clock_freq;
        let cycles_per_sample = clock_freq / sample_freq;

        // 16 bits -> -96dB stopband attenuation.
        let atten = -20.0_f64 * (1.0 / (1_i32 << 16) as f64).log10();
        // A fraction of the bandwidth is allocated to the transition band,
        let dw = (1.0_f64 - 2.0 * pass_freq / sample_freq) * PI;
        // The cutoff frequency is midway through the transition band.
        let wc = (2.0_f64 * pass_freq / sample_freq + 1.0) * PI / 2.0;

        // For calculation of beta and N see the reference for the kaiserord
        // function in the MATLAB Signal Processing Toolbox:
        // http://www.mathworks.com/access/helpdesk/help/toolbox/signal/kaiserord.html
        let beta = 0.1102_f64 * (atten - 8.7);
        let io_beta = i0(beta);

        // The filter order will maximally be 124 with the current constraints.
        // N >= (96.33 - 7.95)/(2.285*0.1*pi) -> N >= 123
        // The filter order is equal to the number of zero crossings, i.e.
        // it should be an even number (sinc is symmetric about x = 0).
        let mut order = ((atten - 7.95) / (2.285 * dw) + 0.5) as i32;
        order += order & 1;

        // The filter length is equal to the filter order + 1.
        // The filter length must be an odd number (sinc is symmetric about x = 0).
        let n = ((order as f64 * cycles_per_sample) as i32 + 1) | 1;

        // We clamp the filter table resolution to 2^n, making the fixpoint
        // sample_offset a whole multiple of the filter table resolution.
        let bits = (FIR_RES_INTERPOLATE as f64 / cycles_per_sample).log2().ceil().max(0.0) as i32;
        let res = 1 << bits;

        let mut data = vec![0i16; (n * res) as usize];
        let half = n / 2;
        // Calculate res FIR tables for linear interpolation.
        for (i, table) in data.chunks_exact_mut(n as usize).enumerate() {
            let j_offset = i as f64 / res as f64;
            // This is the sinc function, weighted by the Kaiser window.
            for (tap, j) in table.iter_mut().zip(-half..=half) {
                let jx = j as f64 - j_offset;
                let wt = wc * jx / cycles_per_sample;
                let temp = jx / half as f64;
                let kaiser = if temp.abs() <= 1.0 {
                    i0(beta * (1.0 - temp * temp).sqrt()) / io_beta
                } else {
                    0.0
                };
                let sincwt = if wt.abs() >= 1e-6 { wt.sin() / wt } else { 1.0 };
                let val = (1_i32 << FIR_SHIFT) as f64 * filter_scale * samples_per_cycle * wc / PI
                    * sincwt
                    * kaiser;
                *tap = (val + 0.5) as i16;
            }
        }
        Fir { data, n, res }
    }

    /// Taps of phase `offset`.
    #[inline]
    pub fn table(&self, offset: i32) -> &[i16] {
        let start = (offset * self.n) as usize;
        &self.data[start..start + self.n as usize]
    }
}

/// Zeroth order modified Bessel function of the first kind.
fn i0(x: f64) -> f64 {
    // Max error acceptable in I0.
    const I0E: f64 = 1e-6;
    let halfx = x / 2.0;
    let mut sum = 1.0;
    let mut u = 1.0;
    let mut n = 1;
    loop {
        let temp = halfx / n as f64;
        n += 1;
        u *= temp * temp;
        sum += u;
        if u < I0E * sum {
            break;
        }
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn bessel_matches_reference_values() {
        assert_relative_eq!(i0(0.0), 1.0);
        assert_relative_eq!(i0(1.0), 1.266_065_878, max_relative = 1e-6);
        assert_relative_eq!(i0(5.0), 27.239_871_82, max_relative = 1e-6);
    }

    #[test]
    fn pal_bank_dimensions() {
        let fir = Fir::new(985_248.0, 44_100.0, 19_845.0, 0.97);
        // Order 124 stretched by ~22.34 cycles per sample.
        assert_eq!(fir.n, 2771);
        assert_eq!(fir.res, 16);
        assert_eq!(fir.data.len(), (fir.n * fir.res) as usize);
    }

    #[test]
    fn tables_are_symmetric_at_phase_zero() {
        let fir = Fir::new(985_248.0, 44_100.0, 19_845.0, 0.97);
        let table = fir.table(0);
        let n = table.len();
        for j in 0..n / 2 {
            assert_eq!(table[j], table[n - 1 - j], "tap {}", j);
        }
        // Unity DC gain in 1.15 fixed point, give or take scale and rounding.
        let dc: i32 = table.iter().map(|&tap| tap as i32).sum();
        assert!((31_000..33_500).contains(&dc), "dc = {}", dc);
    }
}
