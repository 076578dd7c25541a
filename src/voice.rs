// This file is part of resid-rs.
// Copyright (c) 2017-2019 Sebastian Jastrzebski <sebby2k@gmail.com>. All rights reserved.
// Portions (c) 2004 Dag Lem <resid@nimrod.no>
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#![allow(clippy::cast_lossless)]

use super::envelope::EnvelopeGenerator;
use super::fuzz::FuzzFilter;
use super::wave::WaveformGenerator;
use super::ChipModel;

/// The waveform output range is 0x000 to 0xfff, so the "zero"
/// level should ideally have been 0x800. In the measured chip, the
/// waveform output "zero" level was found to be 0x380 (i.e. $d41b
/// = 0x38) at 5.94V.
const WAVE_ZERO: i32 = 0x0380;

/// The envelope multiplying D/A converter introduces another DC
/// offset. This is isolated by the following measurements:
///
/// * The "zero" output level of the mixer at full volume is 5.44V.
/// * Routing one voice to the mixer at full volume yields
///   6.75V at maximum voice output (wave = 0xfff, sustain = 0xf)
///   5.94V at "zero" voice output  (wave = any,   sustain = 0x0)
///   5.70V at minimum voice output (wave = 0x000, sustain = 0xf)
/// * The DC offset of one voice is (5.94V - 5.44V) = 0.50V
/// * The dynamic range of one voice is |6.75V - 5.70V| = 1.05V
/// * The DC offset is thus 0.50V/1.05V ~ 1/2 of the dynamic range.
const VOICE_DC: i32 = 0x800 * 0xff;

/// A single SID voice: waveform generator, envelope generator and a
/// per-voice fuzz stage ahead of the mixer.
#[derive(Clone, Copy)]
pub struct Voice {
    // Configuration
    wave_zero: i32,
    voice_dc: i32,
    muted: bool,
    // Generators
    pub(crate) envelope: EnvelopeGenerator,
    pub(crate) wave: WaveformGenerator,
    pub(crate) fuzz: FuzzFilter,
}

impl Voice {
    /// Create a voice for the given chip model.
    pub fn new(chip_model: ChipModel) -> Self {
        let mut voice = Voice {
            wave_zero: 0,
            voice_dc: 0,
            muted: false,
            envelope: EnvelopeGenerator::default(),
            wave: WaveformGenerator::new(chip_model),
            fuzz: FuzzFilter::new(),
        };
        voice.set_chip_model(chip_model);
        voice
    }

    /// Switch DC levels and combined waveform tables.
    pub fn set_chip_model(&mut self, chip_model: ChipModel) {
        match chip_model {
            ChipModel::Mos6581 => {
                self.wave_zero = WAVE_ZERO;
                self.voice_dc = VOICE_DC;
            }
            ChipModel::Mos8580 => {
                // No DC offsets in the MOS8580.
                self.wave_zero = 0x800;
                self.voice_dc = 0;
            }
        }
        self.wave.set_chip_model(chip_model);
    }

    /// Update envelope and waveform control registers.
    pub fn set_control(&mut self, value: u8) {
        self.envelope.set_control(value);
        self.wave.set_control(value);
    }

    /// Control register as last written, gate included.
    pub fn get_control(&self) -> u8 {
        self.wave.get_control() | self.envelope.get_control()
    }

    /// Whether the voice is gated off from the mixer.
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Gate the voice output. Generators keep running while muted.
    pub fn set_mute(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Amplitude modulated 20-bit waveform output for the current cycle.
    ///
    /// The AC part of the signal runs through the voice fuzz stage, so this
    /// advances that stage and must be called once per cycle.
    #[inline]
    pub fn output(&mut self, sync_source: Option<&WaveformGenerator>) -> i32 {
        let wave = self.wave.output(sync_source) as i32;
        let env = self.envelope.output() as i32;
        self.fuzz.clock((wave - 0x800) * env);
        if self.muted {
            return 0;
        }
        self.fuzz.output() + (0x800 - self.wave_zero) * env + self.voice_dc
    }

    /// Reset generators, the fuzz stage and the mute gate.
    pub fn reset(&mut self) {
        self.muted = false;
        self.envelope.reset();
        self.wave.reset();
        self.fuzz.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_6581_voice_sits_at_dc_level() {
        let mut voice = Voice::new(ChipModel::Mos6581);
        assert_eq!(voice.output(None), VOICE_DC);
    }

    #[test]
    fn silent_8580_voice_is_zero() {
        let mut voice = Voice::new(ChipModel::Mos8580);
        assert_eq!(voice.output(None), 0);
    }

    #[test]
    fn bypassed_fuzz_matches_linear_model() {
        let mut voice = Voice::new(ChipModel::Mos6581);
        voice.wave.set_frequency_hi(0x20);
        voice.envelope.set_attack_decay(0x00);
        voice.envelope.set_sustain_release(0xf0);
        voice.set_control(0x21);
        for _ in 0..5000 {
            voice.envelope.clock();
            voice.wave.clock();
            let expected = (voice.wave.output(None) as i32 - WAVE_ZERO)
                * voice.envelope.output() as i32
                + VOICE_DC;
            assert_eq!(voice.output(None), expected);
        }
    }

    #[test]
    fn mute_gates_output_only() {
        let mut voice = Voice::new(ChipModel::Mos8580);
        voice.wave.set_frequency_hi(0x10);
        voice.set_control(0x21);
        voice.set_mute(true);
        for _ in 0..1000 {
            voice.envelope.clock();
            voice.wave.clock();
            assert_eq!(voice.output(None), 0);
        }
        assert_ne!(voice.wave.get_acc(), 0);
        assert_ne!(voice.envelope.output(), 0);
    }
}
