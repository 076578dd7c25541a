// This file is part of resid-rs.
// Copyright (c) 2017-2019 Sebastian Jastrzebski <sebby2k@gmail.com>. All rights reserved.
// Portions (c) 2004 Dag Lem <resid@nimrod.no>
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use log::{debug, warn};

use super::envelope::State as EnvState;
use super::filter::{DistortionProperties, FC_MAX};
use super::register::Register;
use super::sampler::{Sampler, SamplingMethod};
use super::settings::FilterSettings;
use super::synth::Synth;
use super::wave::NUM_HARMONICS;
use super::{clock, ChipModel, CutoffTableError, SamplingError, NUM_VOICES};

/// Default clock frequency: PAL C64 (~985 kHz)
const DEFAULT_CLOCK_FREQ: u32 = clock::PAL;
/// Default sample rate: CD quality (44.1 kHz)
const DEFAULT_SAMPLE_FREQ: u32 = 44100;
/// Default FIR scaling, leaves headroom against clipping.
const DEFAULT_FILTER_SCALE: f64 = 0.97;
/// Bus value time-to-live in clock cycles (~8ms decay)
const BUS_VALUE_TTL: u32 = 0x2000;
/// Size of the register address space.
const NUM_REGS: usize = 0x100;

/// Complete SID chip state for save/restore functionality.
///
/// Contains all register values, the filter configuration and the internal
/// state needed to exactly reproduce the SID's behavior at a given point in
/// time. Chip model and sampling parameters are not included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    /// Register file as last written, indexed by address.
    pub sid_register: [u8; NUM_REGS],
    /// Last value written to the data bus.
    pub bus_value: u8,
    /// Cycles until bus value decays to zero.
    pub bus_value_ttl: u32,
    /// External audio input level.
    pub ext_in: i32,
    /// Op-amp distortion model parameters.
    pub distortion: DistortionProperties,
    /// Internal filter in the signal path.
    pub filter_enabled: bool,
    /// External filter in the signal path.
    pub ext_filter_enabled: bool,
    /// Dense custom cutoff curve, `None` for the built-in one.
    pub cutoff_curve: Option<Box<[i32; FC_MAX + 1]>>,
    /// Oscillator accumulators (24-bit).
    pub accumulator: [u32; NUM_VOICES],
    /// Noise LFSR shift registers (23-bit).
    pub shift_register: [u32; NUM_VOICES],
    /// Accumulator MSB went high on the last cycle.
    pub msb_rising: [bool; NUM_VOICES],
    /// Harmonic sub-accumulators.
    pub harmonic_accumulator: [[u32; NUM_HARMONICS]; NUM_VOICES],
    /// Envelope generator states (0=Attack, 1=DecaySustain, 2=Release).
    pub envelope_state: [u8; NUM_VOICES],
    /// Current envelope output levels (0-255).
    pub envelope_counter: [u8; NUM_VOICES],
    /// Exponential counter values for envelope curve shaping.
    pub exponential_counter: [u16; NUM_VOICES],
    /// Exponential counter period for current envelope level.
    pub exponential_counter_period: [u16; NUM_VOICES],
    /// Flags indicating envelope is held at zero.
    pub hold_zero: [bool; NUM_VOICES],
    /// Rate counters for envelope timing.
    pub rate_counter: [u16; NUM_VOICES],
    /// Rate counter periods (from ADSR settings).
    pub rate_counter_period: [u16; NUM_VOICES],
    /// Output of each voice fuzz stage.
    pub voice_fuzz_output: [i32; NUM_VOICES],
    /// Voices gated off from the mixer.
    pub muted: [bool; NUM_VOICES],
    /// Filter `[vhp, vbp, vlp, vnf]`.
    pub filter_state: [i32; 4],
    /// Smoothed cutoff slope of the distortion model.
    pub w0_deriv_smoothed: i32,
    /// Bass boost `[x_prev, y1_prev, vo]`.
    pub bass_state: [i32; 3],
    /// Treble boost `[x_prev, y1_prev, vo]`.
    pub treble_state: [i32; 3],
    /// Master fuzz output.
    pub fuzz_output: i32,
    /// External filter `[vlp, vhp, vo]`.
    pub ext_filter_state: [i32; 3],
    /// Clamped 20-bit output.
    pub output: i32,
}

impl Default for State {
    fn default() -> Self {
        State {
            sid_register: [0; NUM_REGS],
            bus_value: 0,
            bus_value_ttl: 0,
            ext_in: 0,
            distortion: DistortionProperties::default(),
            filter_enabled: true,
            ext_filter_enabled: true,
            cutoff_curve: None,
            accumulator: [0; NUM_VOICES],
            shift_register: [0; NUM_VOICES],
            msb_rising: [false; NUM_VOICES],
            harmonic_accumulator: [[0; NUM_HARMONICS]; NUM_VOICES],
            envelope_state: [0; NUM_VOICES],
            envelope_counter: [0; NUM_VOICES],
            exponential_counter: [0; NUM_VOICES],
            exponential_counter_period: [0; NUM_VOICES],
            hold_zero: [false; NUM_VOICES],
            rate_counter: [0; NUM_VOICES],
            rate_counter_period: [0; NUM_VOICES],
            voice_fuzz_output: [0; NUM_VOICES],
            muted: [false; NUM_VOICES],
            filter_state: [0; 4],
            w0_deriv_smoothed: 0,
            bass_state: [0; 3],
            treble_state: [0; 3],
            fuzz_output: 0,
            ext_filter_state: [0; 3],
            output: 0,
        }
    }
}

/// Configuration for constructing a [`Sid`].
#[derive(Clone, Debug, PartialEq)]
pub struct SidConfig {
    /// SID chip model to emulate (default: MOS 6581).
    pub chip_model: ChipModel,
    /// Audio sampling method (default: `SamplingMethod::Interpolate`).
    pub sampling_method: SamplingMethod,
    /// SID clock frequency in Hz (default: PAL C64 clock).
    pub clock_freq: u32,
    /// Output sample rate in Hz (default: 44.1kHz).
    pub sample_freq: u32,
    /// Resampler pass band in Hz, `None` picks one from the sample rate.
    pub pass_freq: Option<f64>,
    /// Resampler FIR scale within [0.9, 1.0] (default: 0.97).
    pub filter_scale: f64,
}

impl Default for SidConfig {
    fn default() -> Self {
        SidConfig {
            chip_model: ChipModel::default(),
            sampling_method: SamplingMethod::default(),
            clock_freq: DEFAULT_CLOCK_FREQ,
            sample_freq: DEFAULT_SAMPLE_FREQ,
            pass_freq: None,
            filter_scale: DEFAULT_FILTER_SCALE,
        }
    }
}

/// MOS 6581/8580 SID chip emulator.
///
/// Next to the three classic voices the emulated chip carries three extra
/// voices, per-voice harmonics and fuzz, bass and treble shelving filters and
/// a master fuzz stage, all controlled through the extended register map.
///
/// # Example
/// ```
/// use residplus::{ChipModel, Sid};
///
/// let mut sid = Sid::new(ChipModel::Mos6581);
///
/// // Write to SID registers
/// sid.write(0x01, 0x10); // Voice 1 frequency high
/// sid.write(0x05, 0x09); // Voice 1 attack/decay
/// sid.write(0x06, 0xf0); // Voice 1 sustain/release
/// sid.write(0x18, 0x0f); // Full volume
/// sid.write(0x04, 0x11); // Voice 1 control: gate + triangle
///
/// // Generate audio samples
/// let mut buffer = [0i16; 1024];
/// let (samples, remaining) = sid.sample(20000, &mut buffer, 1);
/// assert!(samples > 0);
/// assert_eq!(remaining, 0);
/// ```
#[derive(Clone)]
pub struct Sid {
    // Functional Units
    sampler: Sampler,
    // Configuration
    chip_model: ChipModel,
    // Runtime State
    bus_value: u8,
    bus_value_ttl: u32,
}

impl Sid {
    /// Construct a SID with default PAL clock, 44.1kHz sample rate and
    /// linear interpolation.
    pub fn new(chip_model: ChipModel) -> Self {
        let config = SidConfig {
            chip_model,
            ..SidConfig::default()
        };
        Self::from_config(config).expect("default sampling parameters are valid")
    }

    /// Construct a SID from a full configuration.
    ///
    /// # Errors
    /// Returns the [`SamplingError`] of a rejected sampling configuration.
    pub fn from_config(config: SidConfig) -> Result<Self, SamplingError> {
        let mut sid = Sid {
            sampler: Sampler::new(Synth::new(config.chip_model)),
            chip_model: config.chip_model,
            bus_value: 0,
            bus_value_ttl: 0,
        };
        sid.set_sampling_parameters(
            config.sampling_method,
            config.clock_freq,
            config.sample_freq,
            config.pass_freq,
            config.filter_scale,
        )?;
        Ok(sid)
    }

    /// Emulated chip model.
    pub fn chip_model(&self) -> ChipModel {
        self.chip_model
    }

    /// Switch the chip model: waveform tables, DC offsets and the built-in
    /// cutoff curve. Register and oscillator state are kept.
    pub fn set_chip_model(&mut self, chip_model: ChipModel) {
        debug!("Chip model {:?}", chip_model);
        self.chip_model = chip_model;
        self.sampler.synth.set_chip_model(chip_model);
    }

    /// Configure the op-amp distortion model of the filter.
    pub fn set_distortion_properties(&mut self, properties: DistortionProperties) {
        debug!("Distortion {:?}", properties);
        self.sampler
            .synth
            .filter
            .set_distortion_properties(properties);
    }

    /// Cutoff frequency in Hz for every FC value.
    pub fn cutoff_curve(&self) -> &[i32; FC_MAX + 1] {
        self.sampler.synth.filter.cutoff_curve()
    }

    /// Current op-amp distortion parameters.
    pub fn get_distortion_properties(&self) -> DistortionProperties {
        self.sampler.synth.filter.get_distortion_properties()
    }

    /// Install a custom `(fc, hz)` cutoff curve, or restore the built-in
    /// curve with `None`.
    ///
    /// # Errors
    /// A rejected table leaves the current curve in place.
    pub fn set_filter_cutoff_table(
        &mut self,
        points: Option<&[(i32, i32)]>,
    ) -> Result<(), CutoffTableError> {
        let result = self
            .sampler
            .synth
            .filter
            .set_cutoff_table(self.chip_model, points);
        match result {
            Ok(()) => debug!(
                "Cutoff table: {}",
                points.map_or("built-in".to_owned(), |p| format!("{} points", p.len()))
            ),
            Err(err) => warn!("Rejected cutoff table: {}", err),
        }
        result
    }

    /// Set sampling parameters for audio output.
    ///
    /// # Errors
    /// Zero frequencies, a FIR history that overflows the ring buffer, a pass
    /// band above 0.9 * sample_freq / 2 and a filter scale outside
    /// [0.9, 1.0] are rejected. The previous parameters stay in effect.
    pub fn set_sampling_parameters(
        &mut self,
        method: SamplingMethod,
        clock_freq: u32,
        sample_freq: u32,
        pass_freq: Option<f64>,
        filter_scale: f64,
    ) -> Result<(), SamplingError> {
        self.sampler.set_parameters(
            method,
            clock_freq as f64,
            sample_freq as f64,
            pass_freq,
            filter_scale,
        )
    }

    /// Change the output rate without rebuilding the resampling filter.
    pub fn adjust_sampling_frequency(&mut self, sample_freq: u32) {
        self.sampler.adjust_sampling_frequency(sample_freq as f64);
    }

    /// Selected sampling method.
    pub fn sampling_method(&self) -> SamplingMethod {
        self.sampler.sampling_method()
    }

    #[inline]
    fn age_bus_value(&mut self, cycles: u32) {
        self.bus_value_ttl = self.bus_value_ttl.saturating_sub(cycles);
        if self.bus_value_ttl == 0 {
            self.bus_value = 0;
        }
    }

    /// Advance the SID by one clock cycle.
    pub fn clock(&mut self) {
        self.age_bus_value(1);
        self.sampler.synth.clock();
    }

    /// Advance the SID by `delta` cycles without producing samples.
    pub fn clock_delta(&mut self, delta: u32) {
        self.age_bus_value(delta);
        for _ in 0..delta {
            self.sampler.synth.clock();
        }
    }

    /// Enable or disable the external output filter (C64 audio stage).
    ///
    /// While disabled the maximum mixer DC level is subtracted instead.
    /// Enabled by default.
    pub fn set_external_filter_enabled(&mut self, enabled: bool) {
        self.sampler.synth.ext_filter.set_enabled(enabled);
    }

    /// Enable or disable the internal SID filter.
    ///
    /// Disabled, every voice goes straight to the mixer. Enabled by default.
    pub fn set_filter_enabled(&mut self, enabled: bool) {
        self.sampler.synth.filter.set_enabled(enabled);
    }

    /// Gate `voice` off from the mixer. Its generators keep running.
    pub fn set_mute(&mut self, voice: usize, muted: bool) {
        if let Some(voice) = self.sampler.synth.voices.get_mut(voice) {
            voice.set_mute(muted);
        }
    }

    /// Whether `voice` is gated off from the mixer.
    pub fn is_muted(&self, voice: usize) -> bool {
        self.sampler
            .synth
            .voices
            .get(voice)
            .is_some_and(|voice| voice.is_muted())
    }

    /// Feed an external audio input sample.
    pub fn input(&mut self, sample: i32) {
        // Voice outputs are 20 bits. Scale up to match three voices in order
        // to facilitate simulation of the MOS8580 "digi boost" hardware hack.
        self.sampler.synth.ext_in = (sample << 4) * 3;
    }

    /// Current mixed audio sample (16-bit).
    pub fn output(&self) -> i16 {
        self.sampler.synth.output()
    }

    /// Current mixed audio sample scaled to `bits` (1 to 16) bits.
    pub fn output_bits(&self, bits: u32) -> i32 {
        self.sampler.synth.output_bits(bits)
    }

    /// Reset all internal SID state.
    pub fn reset(&mut self) {
        self.sampler.reset();
        self.bus_value = 0;
        self.bus_value_ttl = 0;
    }

    /// SID clocking with audio sampling.
    /// Fixpoint arithmetics is used.
    ///
    /// Returns the number of samples written and the cycles that were left
    /// when the buffer filled up. The example below shows how to clock the
    /// SID a specified amount of cycles while producing audio output:
    /// ``` ignore,
    /// let mut buffer = [0i16; 8192];
    /// while delta > 0 {
    ///     let (samples, next_delta) = self.resid.sample(delta, &mut buffer[..], 1);
    ///     let mut output = self.sound_buffer.lock();
    ///     for i in 0..samples {
    ///         output.write(buffer[i]);
    ///     }
    ///     delta = next_delta;
    /// }
    /// ```
    pub fn sample(&mut self, delta: u32, buffer: &mut [i16], interleave: usize) -> (usize, u32) {
        let (written, remaining) = self.sampler.clock(delta, buffer, interleave);
        self.age_bus_value(delta - remaining);
        (written, remaining)
    }

    // -- Device I/O

    /// Read a SID register (applies bus decay).
    pub fn read(&self, reg: u8) -> u8 {
        self.sampler.synth.read(reg, self.bus_value)
    }

    /// Write a SID register. Unmapped addresses only load the data bus.
    pub fn write(&mut self, reg: u8, value: u8) {
        self.bus_value = value;
        self.bus_value_ttl = BUS_VALUE_TTL;
        if let Some(register) = Register::decode(reg) {
            self.sampler.synth.write(register, value);
        }
    }

    /// Apply a preset: cutoff table, distortion, stage registers and mutes.
    ///
    /// # Errors
    /// A rejected cutoff table aborts before anything else changes.
    pub fn apply_settings(&mut self, settings: &FilterSettings) -> Result<(), CutoffTableError> {
        self.set_filter_cutoff_table(settings.cutoff_table.as_deref())?;
        self.set_distortion_properties(settings.distortion);
        for (reg, value) in settings.register_writes() {
            self.write(reg, value);
        }
        for (voice, &muted) in settings.mute.iter().enumerate() {
            self.set_mute(voice, muted);
        }
        Ok(())
    }

    // -- State

    /// Snapshot full SID state (registers, filter configuration and internals).
    pub fn read_state(&self) -> State {
        let synth = &self.sampler.synth;
        let mut state = State::default();
        for (address, value) in state.sid_register.iter_mut().enumerate() {
            if let Some(register) = Register::decode(address as u8) {
                *value = synth.register_value(register);
            }
        }
        state.bus_value = self.bus_value;
        state.bus_value_ttl = self.bus_value_ttl;
        state.ext_in = synth.ext_in;
        state.distortion = synth.filter.get_distortion_properties();
        state.filter_enabled = synth.filter.is_enabled();
        state.ext_filter_enabled = synth.ext_filter.is_enabled();
        state.cutoff_curve = synth.filter.custom_cutoff_curve().map(|f0| Box::new(*f0));
        for (i, voice) in synth.voices.iter().enumerate() {
            let wave = &voice.wave;
            let envelope = &voice.envelope;
            state.accumulator[i] = wave.get_acc();
            state.shift_register[i] = wave.get_shift();
            state.msb_rising[i] = wave.is_msb_rising();
            state.harmonic_accumulator[i] = wave.get_harmonic_acc();
            state.envelope_state[i] = envelope.state() as u8;
            state.envelope_counter[i] = envelope.read_env();
            (state.exponential_counter[i], state.exponential_counter_period[i]) =
                envelope.exponential_counter();
            state.hold_zero[i] = envelope.is_hold_zero();
            (state.rate_counter[i], state.rate_counter_period[i]) = envelope.rate_counter();
            state.voice_fuzz_output[i] = voice.fuzz.output();
            state.muted[i] = voice.is_muted();
        }
        state.filter_state = synth.filter.get_state();
        state.w0_deriv_smoothed = synth.filter.get_w0_deriv_smoothed();
        state.bass_state = synth.bass.get_state();
        state.treble_state = synth.treble.get_state();
        state.fuzz_output = synth.fuzz.output();
        state.ext_filter_state = synth.ext_filter.get_state();
        state.output = synth.raw_output();
        state
    }

    /// Restore full SID state (registers, filter configuration and internals).
    pub fn write_state(&mut self, state: &State) {
        for (address, &value) in state.sid_register.iter().enumerate() {
            self.write(address as u8, value);
        }
        self.bus_value = state.bus_value;
        self.bus_value_ttl = state.bus_value_ttl;
        let synth = &mut self.sampler.synth;
        synth.ext_in = state.ext_in;
        synth.filter.set_distortion_properties(state.distortion);
        synth.filter.set_enabled(state.filter_enabled);
        synth.ext_filter.set_enabled(state.ext_filter_enabled);
        synth
            .filter
            .restore_cutoff_curve(self.chip_model, state.cutoff_curve.clone());
        for (i, voice) in synth.voices.iter_mut().enumerate() {
            voice.wave.set_acc(state.accumulator[i]);
            voice.wave.set_shift(state.shift_register[i]);
            voice.wave.set_msb_rising(state.msb_rising[i]);
            voice.wave.set_harmonic_acc(state.harmonic_accumulator[i]);
            let env_state = match state.envelope_state[i] {
                0 => EnvState::Attack,
                1 => EnvState::DecaySustain,
                _ => EnvState::Release,
            };
            voice.envelope.restore(
                env_state,
                state.envelope_counter[i],
                (state.rate_counter[i], state.rate_counter_period[i]),
                (state.exponential_counter[i], state.exponential_counter_period[i]),
                state.hold_zero[i],
            );
            voice.fuzz.set_output(state.voice_fuzz_output[i]);
            voice.set_mute(state.muted[i]);
        }
        synth
            .filter
            .set_state(state.filter_state, state.w0_deriv_smoothed);
        synth.bass.set_state(state.bass_state);
        synth.treble.set_state(state.treble_state);
        synth.fuzz.set_output(state.fuzz_output);
        synth.ext_filter.set_state(state.ext_filter_state);
        synth.vo = state.output;
    }
}
