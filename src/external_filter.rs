// This file is part of resid-rs.
// Copyright (c) 2017-2019 Sebastian Jastrzebski <sebby2k@gmail.com>. All rights reserved.
// Portions (c) 2004 Dag Lem <resid@nimrod.no>
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use super::{ChipModel, NUM_VOICES};

/// Maximum mixer DC output level; to be removed if the external
/// filter is turned off: ((wave DC + voice DC)*voices + mixer DC)*volume
/// See voice.rs and filter.rs for an explanation of the values.
const MIXER_DC_6581: i32 =
    ((((0x800 - 0x380) + 0x800) * 0xff * NUM_VOICES as i32 - 0xfff * 0xff / 18) >> 7) * 0x0f;

// External filter circuit component values.
// The C64 audio output stage uses two RC networks:
//
// 1. Low-pass: R = 10kOhm, C = 1000pF
//    w0 = 1/RC = 100000, cutoff = 1/(2*PI*RC) = 15.9kHz
//
// 2. High-pass: R = 10kOhm, C = 1uF
//    w0 = 1/RC = 100, cutoff = 1/(2*PI*RC) = 15.9Hz
const R_LP: f64 = 10e3;
const C_LP: f64 = 1000e-12;
const R_HP: f64 = 10e3;
const C_HP: f64 = 1e-6;

/// Fixed-point multiplier for 1MHz clock (2^20 / 1_000_000)
const FIXP_SCALE: f64 = 1.048_576;

/// Angular frequency 1/RC scaled for a right shift by 20.
#[inline]
fn w0_of(resistance: f64, capacitance: f64) -> i32 {
    (FIXP_SCALE / (resistance * capacitance) + 0.5) as i32
}

/// The audio output stage in a Commodore 64 consists of two STC networks,
/// a low-pass filter with 3-dB frequency 16kHz followed by a high-pass
/// filter with 3-dB frequency 16Hz (the latter provided an audio equipment
/// input impedance of 1kOhm).
///
/// The STC networks are connected with a BJT supposedly meant to act as
/// a unity gain buffer, which is not really how it works. A more elaborate
/// model would include the BJT, however DC circuit analysis yields BJT
/// base-emitter and emitter-base impedances sufficiently low to produce
/// additional low-pass and high-pass 3dB-frequencies in the order of hundreds
/// of kHz. This calls for a sampling frequency of several MHz, which is far
/// too high for practical use.
#[derive(Clone, Copy)]
pub struct ExternalFilter {
    // Configuration
    enabled: bool,
    mixer_dc: i32,
    w0lp: i32,
    w0hp: i32,
    // Runtime State
    vlp: i32,
    vhp: i32,
    vo: i32,
}

impl ExternalFilter {
    /// Create an external filter model for the selected SID chip.
    pub fn new(chip_model: ChipModel) -> Self {
        let mut filter = ExternalFilter {
            enabled: true,
            mixer_dc: 0,
            w0lp: w0_of(R_LP, C_LP),
            w0hp: w0_of(R_HP, C_HP),
            vlp: 0,
            vhp: 0,
            vo: 0,
        };
        filter.set_chip_model(chip_model);
        filter.reset();
        filter
    }

    /// Select the mixer DC level removed while the filter is disabled.
    pub fn set_chip_model(&mut self, chip_model: ChipModel) {
        self.mixer_dc = match chip_model {
            ChipModel::Mos6581 => MIXER_DC_6581,
            ChipModel::Mos8580 => 0,
        };
    }

    /// Enable or disable the external audio filter stage.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether the stage is in the signal path.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Clock the filter for one cycle.
    #[inline]
    pub fn clock(&mut self, vi: i32) {
        // This is handy for testing.
        if !self.enabled {
            // Remove maximum DC level since there is no filter to do it.
            self.vlp = 0;
            self.vhp = 0;
            self.vo = vi - self.mixer_dc;
            return;
        }

        // delta_t is converted to seconds given a 1MHz clock by dividing
        // with 1 000 000.

        // Calculate filter outputs.
        // Vo  = Vlp - Vhp;
        // Vlp = Vlp + w0lp*(Vi - Vlp)*delta_t;
        // Vhp = Vhp + w0hp*(Vlp - Vhp)*delta_t;
        let vlp = self.vlp as i64;
        let vhp = self.vhp as i64;
        let dvlp = ((self.w0lp as i64 >> 8) * (vi as i64 - vlp)) >> 12;
        let dvhp = (self.w0hp as i64 * (vlp - vhp)) >> 20;
        self.vo = (vlp - vhp) as i32;
        self.vlp = (vlp + dvlp) as i32;
        self.vhp = (vhp + dvhp) as i32;
    }

    /// Filter output for the last clocked cycle.
    #[inline]
    pub fn output(&self) -> i32 {
        self.vo
    }

    /// `[vlp, vhp, vo]`.
    pub fn get_state(&self) -> [i32; 3] {
        [self.vlp, self.vhp, self.vo]
    }

    /// Restore `[vlp, vhp, vo]`.
    pub fn set_state(&mut self, state: [i32; 3]) {
        [self.vlp, self.vhp, self.vo] = state;
    }

    /// Reset internal filter state to zero.
    pub fn reset(&mut self) {
        self.vlp = 0;
        self.vhp = 0;
        self.vo = 0;
    }
}
