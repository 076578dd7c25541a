// This file is part of resid-rs.
// Copyright (c) 2017-2019 Sebastian Jastrzebski <sebby2k@gmail.com>. All rights reserved.
// Portions (c) 2004 Dag Lem <resid@nimrod.no>
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

//! Combined waveform lookup tables.
//!
//! When more than one of triangle, sawtooth and pulse is selected the
//! waveform outputs are wired together and each output bit is pulled towards
//! its neighbours. The tables are indexed by the top 12 bits of the
//! accumulator and generated once per chip model from a small parametric
//! model of that interaction.

use std::sync::OnceLock;

use super::ChipModel;

const TABLE_SIZE: usize = 4096;

/// Parameters of the bit interaction model for one waveform combination.
#[derive(Clone, Copy, Debug)]
struct CombinedWaveformConfig {
    /// Threshold an averaged bit must exceed to read as 1.
    bias: f32,
    /// Pull of the pulse output on every bit.
    pulse_strength: f32,
    /// Weight of the sawtooth MSB.
    top_bit: f32,
    /// Falloff of the neighbour weighting per bit of distance.
    distance: f32,
    /// Blend of sawtooth and shifted triangle bits.
    st_mix: f32,
}

impl CombinedWaveformConfig {
    const fn new(bias: f32, pulse_strength: f32, top_bit: f32, distance: f32, st_mix: f32) -> Self {
        CombinedWaveformConfig {
            bias,
            pulse_strength,
            top_bit,
            distance,
            st_mix,
        }
    }
}

// Order: ST, PT, PS, PST.
const CONFIG_6581: [CombinedWaveformConfig; 4] = [
    CombinedWaveformConfig::new(0.880_815, 0.0, 0.0, 1.6, 0.7),
    CombinedWaveformConfig::new(0.93, 2.5, 0.0, 1.05, 0.0),
    CombinedWaveformConfig::new(0.90, 2.2, 0.0, 1.03, 0.0),
    CombinedWaveformConfig::new(0.94, 2.2, 0.0, 1.04, 0.0),
];

const CONFIG_8580: [CombinedWaveformConfig; 4] = [
    CombinedWaveformConfig::new(0.95, 0.0, 0.9, 1.3, 0.5),
    CombinedWaveformConfig::new(0.93, 1.9, 1.0, 1.1, 0.0),
    CombinedWaveformConfig::new(0.92, 1.8, 0.95, 1.07, 0.0),
    CombinedWaveformConfig::new(0.92, 1.7, 1.0, 1.05, 0.0),
];

/// Output of `waveform` (bit 0 triangle, bit 1 sawtooth, bit 2 pulse) for a
/// 12-bit accumulator value.
fn combined_value(config: &CombinedWaveformConfig, waveform: u8, accumulator: u32) -> u16 {
    let mut bits = [0f32; 12];
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = if accumulator & (1 << i) != 0 { 1.0 } else { 0.0 };
    }

    // Triangle alone: shift up one bit and fold about the MSB.
    if waveform & 3 == 1 {
        let fold = accumulator & 0x800 != 0;
        for i in (1..12).rev() {
            bits[i] = if fold { 1.0 - bits[i - 1] } else { bits[i - 1] };
        }
        bits[0] = 0.0;
    }

    // Triangle and sawtooth together.
    if waveform & 3 == 3 {
        bits[0] *= config.st_mix;
        for i in 1..12 {
            bits[i] = bits[i - 1] * (1.0 - config.st_mix) + bits[i] * config.st_mix;
        }
    }

    if waveform & 2 != 0 {
        bits[11] *= config.top_bit;
    }

    if waveform == 3 || waveform > 4 {
        let mut weight = [0f32; 25];
        weight[12] = 1.0;
        let mut w = 1.0f32;
        for i in 1..=12 {
            w /= config.distance;
            weight[12 - i] = w;
            weight[12 + i] = w;
        }

        let mut mixed = [0f32; 12];
        for (i, out) in mixed.iter_mut().enumerate() {
            let mut sum = 0.0;
            let mut norm = 0.0;
            for (j, &bit) in bits.iter().enumerate() {
                let w = weight[i + 12 - j];
                sum += bit * w;
                norm += w;
            }
            if waveform > 4 {
                let w = weight[i];
                sum += config.pulse_strength * w;
                norm += w;
            }
            *out = (bits[i] + sum / norm) * 0.5;
        }
        bits = mixed;
    }

    let mut value = 0u16;
    for (i, &bit) in bits.iter().enumerate() {
        if bit > config.bias {
            value |= 1 << i;
        }
    }
    value
}

fn build_table(config: &CombinedWaveformConfig, waveform: u8) -> Box<[u16; TABLE_SIZE]> {
    let mut table = Box::new([0u16; TABLE_SIZE]);
    for (accumulator, value) in table.iter_mut().enumerate() {
        *value = combined_value(config, waveform, accumulator as u32);
    }
    table
}

/// Combined waveform tables for one chip model.
pub struct WaveTables {
    /// Triangle + sawtooth.
    pub st: Box<[u16; TABLE_SIZE]>,
    /// Pulse + triangle.
    pub pt: Box<[u16; TABLE_SIZE]>,
    /// Pulse + sawtooth.
    pub ps: Box<[u16; TABLE_SIZE]>,
    /// Pulse + sawtooth + triangle.
    pub pst: Box<[u16; TABLE_SIZE]>,
}

impl WaveTables {
    fn build(config: &[CombinedWaveformConfig; 4]) -> Self {
        WaveTables {
            st: build_table(&config[0], 3),
            pt: build_table(&config[1], 5),
            ps: build_table(&config[2], 6),
            pst: build_table(&config[3], 7),
        }
    }

    /// Shared tables for `chip_model`, built on first use.
    pub fn get(chip_model: ChipModel) -> &'static WaveTables {
        static TABLES_6581: OnceLock<WaveTables> = OnceLock::new();
        static TABLES_8580: OnceLock<WaveTables> = OnceLock::new();
        match chip_model {
            ChipModel::Mos6581 => TABLES_6581.get_or_init(|| {
                log::debug!("building MOS6581 combined waveform tables");
                WaveTables::build(&CONFIG_6581)
            }),
            ChipModel::Mos8580 => TABLES_8580.get_or_init(|| {
                log::debug!("building MOS8580 combined waveform tables");
                WaveTables::build(&CONFIG_8580)
            }),
        }
    }
}
