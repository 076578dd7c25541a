// This file is part of resid-rs.
// Copyright (c) 2017-2019 Sebastian Jastrzebski <sebby2k@gmail.com>. All rights reserved.
// Portions (c) 2004 Dag Lem <resid@nimrod.no>
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

//! Conversion from the ~1MHz chip clock to the audio sample rate.
//!
//! Both methods track the position of the next output sample with a 16.16
//! fixed point cycle offset.

// Allow cast_lossless: intentional i16->i32 casts for audio sample processing
#![allow(clippy::cast_lossless)]

mod fir;

use log::{debug, warn};
use wide::{i16x16, i32x8};

use crate::synth::Synth;
use crate::SamplingError;

use self::fir::Fir;

// Resampling constants.
// The error in interpolated lookup is bounded by 1.234/L^2,
// see http://www-ccrma.stanford.edu/~jos/resample/Choice_Table_Size.html
// For a resolution of 16 bits this yields L >= 285.
const FIR_RES_INTERPOLATE: i32 = 285;
const FIR_SHIFT: i32 = 15;
/// Upper bound of the FIR order, used to check the ring buffer up front.
const FIR_N: f64 = 125.0;
const RING_SIZE: usize = 16384;
const RING_MASK: usize = RING_SIZE - 1;

const FIXP_SHIFT: i32 = 16;
const FIXP_MASK: i32 = 0xffff;

/// Default passband limit for resampling (Hz)
const DEFAULT_PASS_FREQ: f64 = 20000.0;
/// Highest pass band as a fraction of the Nyquist frequency.
const MAX_PASS_RATIO: f64 = 0.9;

/// Audio sampling method.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum SamplingMethod {
    /// Linear interpolation between the two cycles around each sample.
    #[default]
    Interpolate,
    /// Kaiser-windowed sinc resampling.
    Resample,
}

/// Audio sampler wrapping the SID synthesizer and resampler.
#[derive(Clone)]
pub struct Sampler {
    // Dependencies
    /// Underlying SID synthesizer.
    pub synth: Synth,
    // Configuration
    sampling_method: SamplingMethod,
    clock_freq: f64,
    cycles_per_sample: i32,
    fir: Fir,
    // Runtime State
    buffer: Box<[i16]>,
    index: usize,
    offset: i32,
    prev_sample: i16,
}

impl Sampler {
    /// Construct an unconfigured sampler around a SID synthesizer.
    pub fn new(synth: Synth) -> Self {
        Sampler {
            synth,
            sampling_method: SamplingMethod::default(),
            clock_freq: 0.0,
            cycles_per_sample: 0,
            fir: Fir::default(),
            buffer: vec![0; RING_SIZE * 2].into_boxed_slice(),
            index: 0,
            offset: 0,
            prev_sample: 0,
        }
    }

    /// Selected sampling method.
    pub fn sampling_method(&self) -> SamplingMethod {
        self.sampling_method
    }

    /// Validate and install sampling parameters, rebuilding the FIR bank.
    ///
    /// `pass_freq` of `None` selects 20kHz, or 0.9 * sample_freq / 2 for
    /// sample rates below ~44.1kHz. Nothing changes when validation fails.
    pub fn set_parameters(
        &mut self,
        method: SamplingMethod,
        clock_freq: f64,
        sample_freq: f64,
        pass_freq: Option<f64>,
        filter_scale: f64,
    ) -> Result<(), SamplingError> {
        let result = Self::resolve_pass_freq(clock_freq, sample_freq, pass_freq, filter_scale);
        let pass_freq = match result {
            Ok(pass_freq) => pass_freq,
            Err(err) => {
                warn!("Rejected sampling parameters: {}", err);
                return Err(err);
            }
        };
        let fir = Fir::new(clock_freq, sample_freq, pass_freq, filter_scale);
        debug!(
            "Sampling {:?}: clock {} Hz, sample {} Hz, pass {} Hz, fir_N {}, fir_RES {}",
            method, clock_freq, sample_freq, pass_freq, fir.n, fir.res
        );
        self.sampling_method = method;
        self.clock_freq = clock_freq;
        self.cycles_per_sample = Self::cycles_per_sample(clock_freq, sample_freq);
        self.fir = fir;
        // Clear state
        self.buffer.fill(0);
        self.index = 0;
        self.offset = 0;
        self.prev_sample = 0;
        Ok(())
    }

    fn resolve_pass_freq(
        clock_freq: f64,
        sample_freq: f64,
        pass_freq: Option<f64>,
        filter_scale: f64,
    ) -> Result<f64, SamplingError> {
        if clock_freq <= 0.0 {
            return Err(SamplingError::ZeroClockFreq);
        }
        if sample_freq <= 0.0 {
            return Err(SamplingError::ZeroSampleFreq);
        }
        // Check whether the sample ring buffer would overfill.
        if FIR_N * clock_freq / sample_freq >= RING_SIZE as f64 {
            return Err(SamplingError::RingBufferOverflow {
                fir_n: (FIR_N * clock_freq / sample_freq).ceil() as u64,
                ring_size: RING_SIZE,
            });
        }
        let limit = MAX_PASS_RATIO * sample_freq / 2.0;
        let pass_freq = match pass_freq {
            // The default passband limit is 0.9*sample_freq/2 for sample
            // frequencies below ~44.1kHz, and 20kHz for higher sample frequencies.
            None if 2.0 * DEFAULT_PASS_FREQ / sample_freq >= MAX_PASS_RATIO => limit,
            None => DEFAULT_PASS_FREQ,
            Some(pass_freq) if pass_freq > limit => {
                return Err(SamplingError::PassFreqTooHigh { pass_freq, limit });
            }
            Some(pass_freq) => pass_freq,
        };
        // The filter scaling is only included to avoid clipping, so keep
        // it sane.
        if !(0.9..=1.0).contains(&filter_scale) {
            return Err(SamplingError::FilterScaleOutOfRange(filter_scale));
        }
        Ok(pass_freq)
    }

    #[inline]
    fn cycles_per_sample(clock_freq: f64, sample_freq: f64) -> i32 {
        (clock_freq / sample_freq * (1 << FIXP_SHIFT) as f64 + 0.5) as i32
    }

    /// Change the sample rate without redesigning the FIR bank.
    ///
    /// Meant for small drift corrections while playing.
    pub fn adjust_sampling_frequency(&mut self, sample_freq: f64) {
        if sample_freq <= 0.0 || self.clock_freq <= 0.0 {
            return;
        }
        self.cycles_per_sample = Self::cycles_per_sample(self.clock_freq, sample_freq);
    }

    /// Reset sampler and underlying synth state.
    pub fn reset(&mut self) {
        self.synth.reset();
        self.buffer.fill(0);
        self.index = 0;
        self.offset = 0;
        self.prev_sample = 0;
    }

    /// Clock the sampler for `delta` SID cycles, writing every
    /// `interleave`th slot of `buffer`.
    ///
    /// Returns the number of samples written and the cycles left over when
    /// the buffer filled up first.
    #[inline]
    pub fn clock(&mut self, delta: u32, buffer: &mut [i16], interleave: usize) -> (usize, u32) {
        let interleave = interleave.max(1);
        let max_samples = buffer.len().div_ceil(interleave);
        match self.sampling_method {
            SamplingMethod::Interpolate => {
                self.clock_interpolate(delta, buffer, max_samples, interleave)
            }
            SamplingMethod::Resample => {
                self.clock_resample_interpolate(delta, buffer, max_samples, interleave)
            }
        }
    }

    /// Clock `cycles` cycles, keeping the previous output for interpolation.
    #[inline]
    fn clock_cycles(&mut self, cycles: u32) {
        if cycles == 0 {
            return;
        }
        for _ in 1..cycles {
            self.synth.clock();
        }
        self.prev_sample = self.synth.output();
        self.synth.clock();
    }

    /// Linear interpolation sampling.
    fn clock_interpolate(
        &mut self,
        mut delta: u32,
        buffer: &mut [i16],
        max_samples: usize,
        interleave: usize,
    ) -> (usize, u32) {
        let mut index = 0;
        loop {
            let next_sample_offset = self.offset + self.cycles_per_sample;
            let delta_sample = (next_sample_offset >> FIXP_SHIFT) as u32;
            if delta_sample > delta {
                break;
            }
            if index >= max_samples {
                return (index, delta);
            }
            self.clock_cycles(delta_sample);
            delta -= delta_sample;
            self.offset = next_sample_offset & FIXP_MASK;
            let sample_now = self.synth.output();
            let step = (self.offset as i64 * (sample_now as i64 - self.prev_sample as i64))
                >> FIXP_SHIFT;
            buffer[index * interleave] = (self.prev_sample as i64 + step) as i16;
            index += 1;
            self.prev_sample = sample_now;
        }
        self.clock_cycles(delta);
        self.offset -= (delta as i32) << FIXP_SHIFT;
        (index, 0)
    }

    /// Clock one cycle into the sample history.
    #[inline]
    fn clock_into_ring(&mut self) {
        self.synth.clock();
        let output = self.synth.output();
        self.buffer[self.index] = output;
        self.buffer[self.index + RING_SIZE] = output;
        self.index = (self.index + 1) & RING_MASK;
    }

    /// Windowed sinc resampling.
    ///
    /// This implementation is based on the paper "A Flexible Sampling-Rate
    /// Conversion Method", by J. O. Smith and P. Gosset, or rather on the
    /// expanded tutorial on the "Digital Audio Resampling Home Page":
    /// http://www-ccrma.stanford.edu/~jos/resample/
    ///
    /// By building shifted FIR tables with samples according to the
    /// sampling frequency, this implementation dramatically reduces the
    /// computational effort in the filter convolutions, without any loss
    /// of accuracy.
    fn clock_resample_interpolate(
        &mut self,
        mut delta: u32,
        buffer: &mut [i16],
        max_samples: usize,
        interleave: usize,
    ) -> (usize, u32) {
        let mut index = 0;
        loop {
            let next_sample_offset = self.offset + self.cycles_per_sample;
            let delta_sample = (next_sample_offset >> FIXP_SHIFT) as u32;
            if delta_sample > delta {
                break;
            }
            if index >= max_samples {
                return (index, delta);
            }
            for _ in 0..delta_sample {
                self.clock_into_ring();
            }
            delta -= delta_sample;
            self.offset = next_sample_offset & FIXP_MASK;

            let fir_offset_1 = (self.offset * self.fir.res) >> FIXP_SHIFT;
            let fir_offset_rmd = (self.offset * self.fir.res) & FIXP_MASK;
            let fir_n = self.fir.n as usize;
            let sample_start_1 = self.index + RING_SIZE - fir_n;

            // Convolution with filter impulse response.
            let v1 = convolve(
                &self.buffer[sample_start_1..sample_start_1 + fir_n],
                self.fir.table(fir_offset_1),
            );

            // Use next FIR table, wrap around to first FIR table using
            // previous sample.
            let (fir_offset_2, sample_start_2) = if fir_offset_1 + 1 == self.fir.res {
                (0, sample_start_1 - 1)
            } else {
                (fir_offset_1 + 1, sample_start_1)
            };
            let v2 = convolve(
                &self.buffer[sample_start_2..sample_start_2 + fir_n],
                self.fir.table(fir_offset_2),
            );

            // Linear interpolation.
            // fir_offset_rmd is equal for all samples, it can thus be factorized out:
            // sum(v1 + rmd*(v2 - v1)) = sum(v1) + rmd*(sum(v2) - sum(v1))
            let v = (v1 as i64 + ((fir_offset_rmd as i64 * (v2 as i64 - v1 as i64)) >> FIXP_SHIFT))
                >> FIR_SHIFT;

            // Saturated arithmetics to guard against 16 bit sample overflow.
            buffer[index * interleave] = v.clamp(i16::MIN as i64, i16::MAX as i64) as i16;
            index += 1;
        }
        for _ in 0..delta {
            self.clock_into_ring();
        }
        self.offset -= (delta as i32) << FIXP_SHIFT;
        (index, 0)
    }
}

/// Dot product of history and taps using 16 lane multiply-add.
#[inline]
fn convolve(sample: &[i16], fir: &[i16]) -> i32 {
    let len = sample.len().min(fir.len());
    let mut ss = &sample[..len];
    let mut fs = &fir[..len];

    // 2 accumulators hide instruction latency
    let mut v1 = i32x8::ZERO;
    let mut v2 = i32x8::ZERO;

    while ss.len() >= 32 {
        let sv1 = i16x16::from(&ss[0..16]);
        let sv2 = i16x16::from(&ss[16..32]);
        let fv1 = i16x16::from(&fs[0..16]);
        let fv2 = i16x16::from(&fs[16..32]);

        v1 += sv1.dot(fv1);
        v2 += sv2.dot(fv2);

        ss = &ss[32..];
        fs = &fs[32..];
    }

    let mut v = (v1 + v2).reduce_add();
    for (&s, &f) in ss.iter().zip(fs) {
        v += s as i32 * f as i32;
    }
    v
}
