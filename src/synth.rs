// This file is part of resid-rs.
// Copyright (c) 2017-2019 Sebastian Jastrzebski <sebby2k@gmail.com>. All rights reserved.
// Portions (c) 2004 Dag Lem <resid@nimrod.no>
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#![allow(clippy::cast_lossless)]

use super::external_filter::ExternalFilter;
use super::filter::Filter;
use super::fuzz::FuzzFilter;
use super::register::{reg, FilterReg, FuzzReg, Register, ToneReg, VoiceReg};
use super::tone::{BassBoostFilter, Shelf, ShelvingFilter, TrebleBoostFilter};
use super::voice::Voice;
use super::wave::WaveformGenerator;
use super::{ChipModel, NUM_VOICES, SAMPLE_MAX, SAMPLE_MIN};

/// Voice whose oscillator hard syncs and ring modulates voice `i`.
/// Voices beyond the classic three are their own source.
pub const SYNC_SOURCE: [usize; NUM_VOICES] = [2, 0, 1, 3, 4, 5];

/// Divisor that maps the 20-bit output onto a 1-bit range.
const OUTPUT_SCALE: i32 = ((4095 * 255) >> 7) * 3 * 15 * 2;

/// Value returned by the unconnected paddle inputs.
const POT_UNCONNECTED: u8 = 0xff;

/// The synthesis engine: six voices feeding the filter chain.
#[derive(Clone)]
pub struct Synth {
    // Functional Units
    pub(crate) voices: [Voice; NUM_VOICES],
    pub(crate) filter: Filter,
    pub(crate) bass: BassBoostFilter,
    pub(crate) treble: TrebleBoostFilter,
    pub(crate) fuzz: FuzzFilter,
    pub(crate) ext_filter: ExternalFilter,
    // Runtime State
    pub(crate) ext_in: i32,
    pub(crate) vo: i32,
}

impl Synth {
    /// Create an engine for the given chip model.
    pub fn new(chip_model: ChipModel) -> Self {
        Synth {
            voices: [Voice::new(chip_model); NUM_VOICES],
            filter: Filter::new(chip_model),
            bass: BassBoostFilter::new(),
            treble: TrebleBoostFilter::new(),
            fuzz: FuzzFilter::new(),
            ext_filter: ExternalFilter::new(chip_model),
            ext_in: 0,
            vo: 0,
        }
    }

    /// Switch DC levels, waveform tables and cutoff curve.
    pub fn set_chip_model(&mut self, chip_model: ChipModel) {
        for voice in self.voices.iter_mut() {
            voice.set_chip_model(chip_model);
        }
        self.filter.set_chip_model(chip_model);
        self.ext_filter.set_chip_model(chip_model);
    }

    /// Advance every unit by one cycle.
    #[inline]
    pub fn clock(&mut self) {
        // Clock amplitude modulators.
        for voice in self.voices.iter_mut() {
            voice.envelope.clock();
        }
        // Clock oscillators.
        for voice in self.voices.iter_mut() {
            voice.wave.clock();
        }
        // Synchronize oscillators.
        self.synchronize();
        // Clock filter chain.
        let mut s = [0; NUM_VOICES];
        for (i, sample) in s.iter_mut().enumerate() {
            *sample = self.voice_output(i);
        }
        self.filter.clock(&s, self.ext_in);
        self.bass.clock(self.filter.output());
        self.treble.clock(self.bass.output());
        self.fuzz.clock(self.treble.output());
        // Clock external filter.
        self.ext_filter.clock(self.fuzz.output());
        self.vo = self.ext_filter.output().clamp(SAMPLE_MIN, SAMPLE_MAX);
    }

    /// Restart every destination whose source MSB rose this cycle, unless the
    /// source is itself being restarted.
    #[inline]
    fn synchronize(&mut self) {
        let mut rising = [false; NUM_VOICES];
        for (flag, voice) in rising.iter_mut().zip(self.voices.iter()) {
            *flag = voice.wave.is_msb_rising();
        }
        for (dest, &source) in SYNC_SOURCE.iter().enumerate() {
            if source == dest {
                continue;
            }
            let source_restarting =
                self.voices[source].wave.get_sync() && rising[SYNC_SOURCE[source]];
            if rising[source] && self.voices[dest].wave.get_sync() && !source_restarting {
                self.voices[dest].wave.restart();
            }
        }
    }

    #[inline]
    fn voice_output(&mut self, index: usize) -> i32 {
        let source = SYNC_SOURCE[index];
        if source == index {
            self.voices[index].output(None)
        } else if source < index {
            let (head, tail) = self.voices.split_at_mut(index);
            tail[0].output(Some(&head[source].wave))
        } else {
            let (head, tail) = self.voices.split_at_mut(source);
            head[index].output(Some(&tail[0].wave))
        }
    }

    fn sync_source_wave(&self, index: usize) -> Option<&WaveformGenerator> {
        let source = SYNC_SOURCE[index];
        (source != index).then(|| &self.voices[source].wave)
    }

    /// Clamped 20-bit output of the last cycle.
    #[inline]
    pub fn raw_output(&self) -> i32 {
        self.vo
    }

    /// Output scaled to a signed `bits` wide range, saturating at the ends.
    #[inline]
    pub fn output_bits(&self, bits: u32) -> i32 {
        debug_assert!((1..=16).contains(&bits));
        let half = 1i32 << (bits - 1);
        let sample = self.vo / (OUTPUT_SCALE >> bits).max(1);
        sample.clamp(-half, half - 1)
    }

    /// 16-bit output.
    #[inline]
    pub fn output(&self) -> i16 {
        self.output_bits(16) as i16
    }

    /// Reset all units and unmute every voice.
    pub fn reset(&mut self) {
        for voice in self.voices.iter_mut() {
            voice.reset();
        }
        self.filter.reset();
        self.bass.reset();
        self.treble.reset();
        self.fuzz.reset();
        self.ext_filter.reset();
        self.ext_in = 0;
        self.vo = 0;
    }

    // -- Device I/O

    /// Read side of the register file. Write-only registers read back as
    /// `bus_value`.
    pub fn read(&self, address: u8, bus_value: u8) -> u8 {
        match address {
            reg::POTX | reg::POTY => POT_UNCONNECTED,
            reg::OSC3 => self.voices[2].wave.read_osc(self.sync_source_wave(2)),
            reg::ENV3 => self.voices[2].envelope.read_env(),
            _ => bus_value,
        }
    }

    /// Dispatch a decoded register write.
    pub fn write(&mut self, register: Register, value: u8) {
        match register {
            Register::Voice { voice, reg } => self.write_voice(voice, reg, value),
            Register::Filter(reg) => match reg {
                FilterReg::FcLo => self.filter.set_fc_lo(value),
                FilterReg::FcHi => self.filter.set_fc_hi(value),
                FilterReg::ResFilt => self.filter.set_res_filt(value),
                FilterReg::ModeVol => self.filter.set_mode_vol(value),
                FilterReg::Res => self.filter.set_res(value),
            },
            Register::BassBoost(reg) => write_tone(&mut self.bass, reg, value),
            Register::TrebleBoost(reg) => write_tone(&mut self.treble, reg, value),
            Register::Fuzz(reg) => write_fuzz(&mut self.fuzz, reg, value),
        }
    }

    fn write_voice(&mut self, index: usize, reg: VoiceReg, value: u8) {
        let voice = &mut self.voices[index];
        match reg {
            VoiceReg::FreqLo => voice.wave.set_frequency_lo(value),
            VoiceReg::FreqHi => voice.wave.set_frequency_hi(value),
            VoiceReg::PwLo => voice.wave.set_pulse_width_lo(value),
            VoiceReg::PwHi => voice.wave.set_pulse_width_hi(value),
            VoiceReg::Control => voice.set_control(value),
            VoiceReg::AttackDecay => voice.envelope.set_attack_decay(value),
            VoiceReg::SustainRelease => voice.envelope.set_sustain_release(value),
            VoiceReg::HarmonicVolume(harmonic) => voice.wave.set_harmonic_volume(harmonic, value),
            VoiceReg::Fuzz(reg) => write_fuzz(&mut voice.fuzz, reg, value),
            VoiceReg::Filt => self.filter.set_voice_filt(index, value),
        }
    }

    /// Current value of a register as it would have to be written to
    /// reproduce the configuration.
    pub fn register_value(&self, register: Register) -> u8 {
        match register {
            Register::Voice { voice: index, reg } => {
                let voice = &self.voices[index];
                match reg {
                    VoiceReg::FreqLo => voice.wave.get_frequency_lo(),
                    VoiceReg::FreqHi => voice.wave.get_frequency_hi(),
                    VoiceReg::PwLo => voice.wave.get_pulse_width_lo(),
                    VoiceReg::PwHi => voice.wave.get_pulse_width_hi(),
                    VoiceReg::Control => voice.get_control(),
                    VoiceReg::AttackDecay => voice.envelope.get_attack_decay(),
                    VoiceReg::SustainRelease => voice.envelope.get_sustain_release(),
                    VoiceReg::HarmonicVolume(harmonic) => voice.wave.get_harmonic_volume(harmonic),
                    VoiceReg::Fuzz(reg) => read_fuzz(&voice.fuzz, reg),
                    VoiceReg::Filt => self.filter.get_voice_filt(index),
                }
            }
            Register::Filter(reg) => match reg {
                FilterReg::FcLo => self.filter.get_fc_lo(),
                FilterReg::FcHi => self.filter.get_fc_hi(),
                FilterReg::ResFilt => self.filter.get_res_filt(),
                FilterReg::ModeVol => self.filter.get_mode_vol(),
                FilterReg::Res => self.filter.get_res_filt() & 0xf0,
            },
            Register::BassBoost(reg) => read_tone(&self.bass, reg),
            Register::TrebleBoost(reg) => read_tone(&self.treble, reg),
            Register::Fuzz(reg) => read_fuzz(&self.fuzz, reg),
        }
    }
}

fn write_fuzz(fuzz: &mut FuzzFilter, reg: FuzzReg, value: u8) {
    match reg {
        FuzzReg::GainLo => fuzz.set_gain_lo(value),
        FuzzReg::GainHi => fuzz.set_gain_hi(value),
        FuzzReg::MultLo => fuzz.set_mult_lo(value),
        FuzzReg::MultHi => fuzz.set_mult_hi(value),
        FuzzReg::Mix => fuzz.set_mix(value),
    }
}

fn read_fuzz(fuzz: &FuzzFilter, reg: FuzzReg) -> u8 {
    match reg {
        FuzzReg::GainLo => fuzz.get_gain_lo(),
        FuzzReg::GainHi => fuzz.get_gain_hi(),
        FuzzReg::MultLo => fuzz.get_mult_lo(),
        FuzzReg::MultHi => fuzz.get_mult_hi(),
        FuzzReg::Mix => fuzz.get_mix(),
    }
}

fn write_tone<S: Shelf>(filter: &mut ShelvingFilter<S>, reg: ToneReg, value: u8) {
    match reg {
        ToneReg::GainLo => filter.set_gain_lo(value),
        ToneReg::GainHi => filter.set_gain_hi(value),
        ToneReg::CutoffLo => filter.set_cutoff_lo(value),
        ToneReg::CutoffHi => filter.set_cutoff_hi(value),
    }
}

fn read_tone<S: Shelf>(filter: &ShelvingFilter<S>, reg: ToneReg) -> u8 {
    match reg {
        ToneReg::GainLo => filter.get_gain_lo(),
        ToneReg::GainHi => filter.get_gain_hi(),
        ToneReg::CutoffLo => filter.get_cutoff_lo(),
        ToneReg::CutoffHi => filter.get_cutoff_hi(),
    }
}
