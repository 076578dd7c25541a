// This file is part of resid-rs.
// Copyright (c) 2017-2019 Sebastian Jastrzebski <sebby2k@gmail.com>. All rights reserved.
// Portions (c) 2004 Dag Lem <resid@nimrod.no>
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

//! Presets for the extension registers.
//!
//! A [`FilterSettings`] value is turned into the register writes a player
//! would issue, so applying a preset and replaying those writes end up in
//! the same state.

use super::filter::DistortionProperties;
use super::register::reg;
use super::wave::NUM_HARMONICS;
use super::{ChipModel, NUM_VOICES};

// Shape of the generated 6581 cutoff curve.
const KINKINESS_6581: f32 = 0.17;
const BASE_LEVEL_6581: f32 = 210.0;
const OFFSET_6581: f32 = -375.0;
const STEEPNESS_6581: f32 = 120.0;
const ROLLOFF_6581: f32 = 5.5;
const CEILING_6581: f32 = 18500.0;

/// Shelving filter preset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct ToneSettings {
    /// A disabled stage is written with gain 0.
    pub enabled: bool,
    /// Gain in 8.8 fixed point dB.
    pub gain: u16,
    /// Cutoff frequency in Hz.
    pub cutoff: u16,
}

/// Fuzz stage preset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct FuzzSettings {
    /// A disabled stage is written with gain 0.
    pub enabled: bool,
    /// Drive in 8.8 fixed point.
    pub gain: u16,
    /// Output multiplier in 8.8 fixed point.
    pub multiplier: u16,
    /// Wet share out of 256.
    pub mix: u8,
}

/// Harmonic oscillator preset of one voice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct HarmonicSettings {
    /// A disabled set writes all volumes as 0.
    pub enabled: bool,
    /// Volumes of harmonics 2 to 9.
    pub volumes: [u8; NUM_HARMONICS],
}

/// Complete extension preset.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct FilterSettings {
    /// Custom `(fc, hz)` cutoff points, `None` for the built-in curve.
    pub cutoff_table: Option<Vec<(i32, i32)>>,
    /// Op-amp distortion model.
    pub distortion: DistortionProperties,
    /// Bass boost stage.
    pub bass_boost: ToneSettings,
    /// Treble boost stage.
    pub treble_boost: ToneSettings,
    /// Master fuzz stage.
    pub fuzz: FuzzSettings,
    /// Fuzz stage of each voice.
    pub voice_fuzz: [FuzzSettings; NUM_VOICES],
    /// Harmonics of each voice.
    pub harmonics: [HarmonicSettings; NUM_VOICES],
    /// Voices gated off from the mixer.
    pub mute: [bool; NUM_VOICES],
}

/// FC as seen through a DAC whose upper bits are slightly overweighted.
fn approximate_dac(fc: i32, kinkiness: f32) -> f32 {
    let bits: f32 = (0..11)
        .filter(|bit| fc & (1 << bit) != 0)
        .map(|bit| (bit as f32).powi(4) / 1e4)
        .sum();
    fc as f32 * (1.0 + bits * kinkiness)
}

/// Exponential 6581 cutoff curve, rolled off above 1kHz in 500Hz steps.
fn cutoff_points_6581() -> Vec<(i32, i32)> {
    (0..0x800)
        .map(|fc| {
            let kinked = approximate_dac(fc, KINKINESS_6581);
            let mut freq = BASE_LEVEL_6581 + 2f32.powf((kinked - OFFSET_6581) / STEEPNESS_6581);
            let mut knee = 1000.0;
            while knee < CEILING_6581 {
                if freq > knee {
                    freq -= (freq - knee) / ROLLOFF_6581;
                }
                knee += 500.0;
            }
            (fc, freq.min(CEILING_6581) as i32)
        })
        .collect()
}

impl ToneSettings {
    fn writes(&self, gain_lo: u8, out: &mut Vec<(u8, u8)>) {
        let gain = if self.enabled { self.gain } else { 0 };
        let [gain_l, gain_h] = gain.to_le_bytes();
        let [cutoff_l, cutoff_h] = self.cutoff.to_le_bytes();
        out.extend_from_slice(&[
            (gain_lo, gain_l),
            (gain_lo + 1, gain_h),
            (gain_lo + 2, cutoff_l),
            (gain_lo + 3, cutoff_h),
        ]);
    }
}

impl FuzzSettings {
    fn writes(&self, gain_lo: u8, out: &mut Vec<(u8, u8)>) {
        let gain = if self.enabled { self.gain } else { 0 };
        let [gain_l, gain_h] = gain.to_le_bytes();
        let [mult_l, mult_h] = self.multiplier.to_le_bytes();
        out.extend_from_slice(&[
            (gain_lo, gain_l),
            (gain_lo + 1, gain_h),
            (gain_lo + 2, mult_l),
            (gain_lo + 3, mult_h),
            (gain_lo + 4, self.mix),
        ]);
    }
}

impl FilterSettings {
    /// Player default for `chip_model`: distortion on, every extension
    /// stage off.
    ///
    /// The 8580 keeps its built-in cutoff curve. The 6581 gets a generated
    /// curve with a kink at every DAC bit, which tracks typical chips better
    /// than the averaged reference curve.
    pub fn for_chip(chip_model: ChipModel) -> Self {
        let (cutoff_table, distortion) = match chip_model {
            ChipModel::Mos6581 => (
                Some(cutoff_points_6581()),
                DistortionProperties {
                    enabled: true,
                    rate: 1500,
                    headroom: 300,
                    opmin: -20000,
                    opmax: 20000,
                },
            ),
            ChipModel::Mos8580 => (
                None,
                DistortionProperties {
                    enabled: true,
                    rate: 3200,
                    headroom: 235,
                    opmin: -99999,
                    opmax: 99999,
                },
            ),
        };
        FilterSettings {
            cutoff_table,
            distortion,
            ..FilterSettings::default()
        }
    }

    /// Register writes that install the stage settings of this preset.
    ///
    /// The cutoff table, distortion properties and mute flags are not
    /// register controlled.
    pub fn register_writes(&self) -> Vec<(u8, u8)> {
        let mut writes = Vec::new();
        self.bass_boost.writes(reg::BASS_GAIN_LO, &mut writes);
        self.treble_boost.writes(reg::TREBLE_GAIN_LO, &mut writes);
        self.fuzz.writes(reg::FUZZ_GAIN_LO, &mut writes);
        for voice in 0..NUM_VOICES {
            let harmonics = &self.harmonics[voice];
            for (harmonic, &volume) in harmonics.volumes.iter().enumerate() {
                let volume = if harmonics.enabled { volume } else { 0 };
                writes.push((reg::ext_voice(voice, reg::V_HVOL + harmonic as u8), volume));
            }
            self.voice_fuzz[voice].writes(reg::ext_voice(voice, reg::V_FUZZ_GAIN_LO), &mut writes);
        }
        writes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_stages_write_zero_gain() {
        let settings = FilterSettings {
            bass_boost: ToneSettings {
                enabled: false,
                gain: 0x0c00,
                cutoff: 0x01f4,
            },
            ..FilterSettings::default()
        };
        let writes = settings.register_writes();
        assert_eq!(
            &writes[..4],
            &[
                (reg::BASS_GAIN_LO, 0),
                (reg::BASS_GAIN_HI, 0),
                (reg::BASS_CUTOFF_LO, 0xf4),
                (reg::BASS_CUTOFF_HI, 0x01)
            ]
        );
    }

    #[test]
    fn voice_blocks_are_covered() {
        let mut settings = FilterSettings::default();
        settings.harmonics[5] = HarmonicSettings {
            enabled: true,
            volumes: [1, 2, 3, 4, 5, 6, 7, 8],
        };
        settings.voice_fuzz[5] = FuzzSettings {
            enabled: true,
            gain: 0x0180,
            multiplier: 0x0100,
            mix: 0x80,
        };
        let writes = settings.register_writes();
        // 4 + 4 + 5 bank writes, then 8 + 5 per voice.
        assert_eq!(writes.len(), 13 + NUM_VOICES * 13);
        assert!(writes.contains(&(reg::ext_voice(5, reg::V_HVOL + 7), 8)));
        assert!(writes.contains(&(reg::ext_voice(5, reg::V_FUZZ_GAIN_HI), 0x01)));
        assert!(writes.contains(&(reg::ext_voice(5, reg::V_FUZZ_MIX), 0x80)));
    }

    #[test]
    fn dac_weighting_grows_with_set_bits() {
        assert_eq!(approximate_dac(0, KINKINESS_6581), 0.0);
        assert_eq!(approximate_dac(1, KINKINESS_6581), 1.0);
        // Bit 10 alone adds 0.17 of itself.
        assert!((approximate_dac(0x400, KINKINESS_6581) - 1024.0 * 1.17).abs() < 0.01);
    }

    #[test]
    fn generated_6581_curve_spans_full_range() {
        let points = cutoff_points_6581();
        assert_eq!(points.len(), 0x800);
        assert!(points.iter().enumerate().all(|(i, &(fc, _))| fc == i as i32));
        assert_eq!(points[0].1, 218);
        assert_eq!(points[0x7ff].1, 18500);
        assert!(points.iter().all(|&(_, hz)| (218..=18500).contains(&hz)));
    }

    #[test]
    fn chip_presets_leave_stages_off() {
        for model in [ChipModel::Mos6581, ChipModel::Mos8580] {
            let settings = FilterSettings::for_chip(model);
            assert!(settings.distortion.enabled);
            assert!(!settings.fuzz.enabled && !settings.bass_boost.enabled);
            assert_eq!(settings.mute, [false; NUM_VOICES]);
        }
        assert!(FilterSettings::for_chip(ChipModel::Mos8580).cutoff_table.is_none());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn preset_deserializes_with_defaults() {
        let json = r#"{
            "cutoff_table": [[0, 200], [2047, 12000]],
            "distortion": {"enabled": true, "rate": 3200, "headroom": 10, "opmin": -20000, "opmax": 20000},
            "treble_boost": {"enabled": true, "gain": 1536, "cutoff": 6000}
        }"#;
        let settings: FilterSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.cutoff_table, Some(vec![(0, 200), (2047, 12000)]));
        assert!(settings.distortion.enabled);
        assert_eq!(settings.distortion.rate, 3200);
        assert_eq!(settings.treble_boost.cutoff, 6000);
        assert_eq!(settings.bass_boost, ToneSettings::default());
        assert_eq!(settings.mute, [false; NUM_VOICES]);
    }
}
