// This file is part of resid-rs.
// Copyright (c) 2017-2019 Sebastian Jastrzebski <sebby2k@gmail.com>. All rights reserved.
// Portions (c) 2004 Dag Lem <resid@nimrod.no>
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#![allow(clippy::cast_lossless)]

use std::f64::consts::PI;
use std::sync::OnceLock;

use bit_field::BitField;

use super::error::CutoffTableError;
use super::spline::{interpolate, Point, PointPlotter};
use super::{ChipModel, NUM_VOICES};

const MIXER_DC_6581: i32 = (-0xfff * 0xff / 18) >> 7;

/// Minimum Q factor (~1/√2, critically damped)
const Q_MIN: f64 = 0.707;

/// Maximum cutoff frequency for 1-cycle filter stability (Hz)
const F0_MAX_1CYCLE: f64 = 16000.0;

/// Distorted cutoff limits (Hz). The floor is the fixed resistor in the
/// cutoff network, the ceiling is where the FET saturates.
const F0_MIN_DISTORTED: f64 = 170.0;
const F0_MAX_DISTORTED: f64 = 20000.0;

/// Fixed-point multiplier for 1MHz clock (2^20 / 1_000_000)
const FIXP_SCALE: f64 = 1.048_576;

pub(crate) const FC_MAX: usize = 2047;

/// Half width of the FC window used to estimate the cutoff curve slope.
const DERIV_SPAN: usize = 64;

/// Maximum cutoff frequency is assumed to be found in the range 4.2kHz-16kHz
/// for the 6581. The measured points include a discontinuity at the
/// 1023 -> 1024 transition of the FC register.
const F0_POINTS_6581: [(i32, i32); 31] = [
    (0, 220),
    (0, 220),
    (128, 230),
    (256, 250),
    (384, 300),
    (512, 420),
    (640, 780),
    (768, 1600),
    (832, 2300),
    (896, 3200),
    (960, 4300),
    (992, 5000),
    (1008, 5400),
    (1016, 5700),
    (1023, 6000),
    (1023, 6000),
    (1024, 4600),
    (1024, 4600),
    (1032, 4800),
    (1056, 5300),
    (1088, 6000),
    (1120, 6600),
    (1152, 7200),
    (1280, 9500),
    (1408, 12000),
    (1536, 14500),
    (1664, 16000),
    (1792, 17100),
    (1920, 17700),
    (2047, 18000),
    (2047, 18000),
];

/// The 8580 cutoff curve is close to linear up to 12.5kHz.
const F0_POINTS_8580: [(i32, i32); 19] = [
    (0, 0),
    (0, 0),
    (128, 800),
    (256, 1600),
    (384, 2500),
    (512, 3300),
    (640, 4100),
    (768, 4800),
    (896, 5600),
    (1024, 6500),
    (1152, 7500),
    (1280, 8400),
    (1408, 9200),
    (1536, 9800),
    (1664, 10500),
    (1792, 11000),
    (1920, 11700),
    (2047, 12500),
    (2047, 12500),
];

fn plot_curve(points: &[(i32, i32)]) -> Box<[i32; FC_MAX + 1]> {
    let points = points
        .iter()
        .map(|&(x, y)| Point::new(x, y))
        .collect::<Vec<_>>();
    let mut f0 = Box::new([0i32; FC_MAX + 1]);
    interpolate(&points, &mut PointPlotter::new(&mut f0[..]), 1.0);
    f0
}

/// FC to cutoff frequency (Hz) mapping.
#[derive(Clone)]
enum CutoffCurve {
    /// Measured reference curve of a chip model.
    Builtin(ChipModel),
    /// Curve interpolated from host supplied points.
    Custom(Box<[i32; FC_MAX + 1]>),
}

impl CutoffCurve {
    fn f0(&self) -> &[i32; FC_MAX + 1] {
        static F0_6581: OnceLock<Box<[i32; FC_MAX + 1]>> = OnceLock::new();
        static F0_8580: OnceLock<Box<[i32; FC_MAX + 1]>> = OnceLock::new();
        match self {
            CutoffCurve::Builtin(ChipModel::Mos6581) => {
                F0_6581.get_or_init(|| plot_curve(&F0_POINTS_6581))
            }
            CutoffCurve::Builtin(ChipModel::Mos8580) => {
                F0_8580.get_or_init(|| plot_curve(&F0_POINTS_8580))
            }
            CutoffCurve::Custom(f0) => f0,
        }
    }

    /// Validate `points` and build a dense curve. The end points are
    /// repeated for the spline and the curve is held flat outside them.
    fn custom(points: &[(i32, i32)]) -> Result<Self, CutoffTableError> {
        if points.len() < 2 || points.len() > FC_MAX + 1 {
            return Err(CutoffTableError::PointCount(points.len()));
        }
        for (index, &(x, y)) in points.iter().enumerate() {
            if x < 0 || x > FC_MAX as i32 || y < 0 {
                return Err(CutoffTableError::OutOfRange { index });
            }
            if index > 0 && x <= points[index - 1].0 {
                return Err(CutoffTableError::NotIncreasing { index });
            }
        }
        let first = points[0];
        let last = points[points.len() - 1];
        let mut padded = Vec::with_capacity(points.len() + 2);
        padded.push(first);
        padded.extend_from_slice(points);
        padded.push(last);
        let mut f0 = plot_curve(&padded);
        let (x_first, x_last) = (first.0 as usize, last.0 as usize);
        let (y_first, y_last) = (f0[x_first], f0[x_last]);
        f0[..x_first].fill(y_first);
        f0[x_last + 1..].fill(y_last);
        Ok(CutoffCurve::Custom(f0))
    }
}

/// Op-amp distortion model parameters.
///
/// When enabled the cutoff frequency follows the energy in the integrators
/// and every integrator update is clamped to `[opmin, opmax]`. When disabled
/// no clamping happens at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistortionProperties {
    /// Enable cutoff modulation and integrator clamping.
    pub enabled: bool,
    /// Divisor applied to the squared source level. Zero acts as one.
    pub rate: i32,
    /// Signal level tolerated before the cutoff starts to move.
    pub headroom: i32,
    /// Lower integrator bound.
    pub opmin: i32,
    /// Upper integrator bound.
    pub opmax: i32,
}

impl Default for DistortionProperties {
    fn default() -> Self {
        DistortionProperties {
            enabled: false,
            rate: 0,
            headroom: 0,
            opmin: -64000,
            opmax: 64000,
        }
    }
}

/// The SID filter is modeled with a two-integrator-loop biquadratic filter,
/// which has been confirmed by Bob Yannes to be the actual circuit used in
/// the SID chip.
///
/// Measurements show that excellent emulation of the SID filter is achieved,
/// except when high resonance is combined with high sustain levels.
/// In this case the SID op-amps are performing less than ideally and are
/// causing some peculiar behavior of the SID filter. The distortion model
/// approximates this by shifting the cutoff frequency with the signal level
/// in the integrators and clamping the integrators to the op-amp range.
///
/// Vhp is the output of the summer, Vbp is the output of the first integrator,
/// and Vlp is the output of the second integrator in the filter circuit.
///
/// Each voice has its own routing bit. Bits 0-2 of RES_FILT overwrite the
/// routing of voices 0-2, bit 3 routes the external input, and the extended
/// voice blocks set or clear the bit of any voice.
#[derive(Clone)]
pub struct Filter {
    // Configuration
    enabled: bool,
    fc: u16,
    res: u8,
    routing: u8,
    ext_filt: bool,
    distortion: DistortionProperties,
    // Mode
    voice3_off: bool,
    hp_bp_lp: u8,
    vol: u8,
    // Runtime State
    vhp: i32,
    vbp: i32,
    vlp: i32,
    vnf: i32,
    w0_deriv_smoothed: i32,
    // Cutoff Freq/Res
    mixer_dc: i32,
    q_1024_div: i32,
    w0: i32,
    w0_deriv: i32,
    w0_min: i32,
    w0_max: i32,
    // Cutoff Freq Tables
    curve: CutoffCurve,
}

#[inline]
fn w0_for(f0: f64) -> i32 {
    // Multiply with FIXP_SCALE to facilitate division by 1_000_000 by right-
    // shifting 20 times (2 ^ 20 = 1048576).
    (2.0 * PI * f0 * FIXP_SCALE) as i32
}

impl Filter {
    /// Create a filter for the given chip model.
    pub fn new(chip_model: ChipModel) -> Self {
        let mut filter = Filter {
            enabled: true,
            fc: 0,
            res: 0,
            routing: 0,
            ext_filt: false,
            distortion: DistortionProperties::default(),
            voice3_off: false,
            hp_bp_lp: 0,
            vol: 0,
            vhp: 0,
            vbp: 0,
            vlp: 0,
            vnf: 0,
            w0_deriv_smoothed: 0,
            mixer_dc: 0,
            q_1024_div: 0,
            w0: 0,
            w0_deriv: 0,
            w0_min: w0_for(F0_MIN_DISTORTED),
            w0_max: w0_for(F0_MAX_DISTORTED),
            curve: CutoffCurve::Builtin(chip_model),
        };
        filter.set_chip_model(chip_model);
        filter.reset();
        filter
    }

    /// Switch mixer DC offset and reinstall the built-in cutoff curve.
    pub fn set_chip_model(&mut self, chip_model: ChipModel) {
        self.mixer_dc = match chip_model {
            // The mixer has a small input DC offset of about -1/18 of the
            // dynamic range of one voice.
            ChipModel::Mos6581 => MIXER_DC_6581,
            // No DC offsets in the MOS8580.
            ChipModel::Mos8580 => 0,
        };
        self.curve = CutoffCurve::Builtin(chip_model);
        self.set_w0();
        self.set_q();
    }

    /// Install a custom FC to cutoff (Hz) curve from `(fc, hz)` points.
    ///
    /// `None` restores the built-in curve of `chip_model`. A rejected table
    /// leaves the current curve in place.
    pub fn set_cutoff_table(
        &mut self,
        chip_model: ChipModel,
        points: Option<&[(i32, i32)]>,
    ) -> Result<(), CutoffTableError> {
        self.curve = match points {
            Some(points) => CutoffCurve::custom(points)?,
            None => CutoffCurve::Builtin(chip_model),
        };
        self.set_w0();
        Ok(())
    }

    /// Cutoff frequency in Hz for every FC value.
    pub fn cutoff_curve(&self) -> &[i32; FC_MAX + 1] {
        self.curve.f0()
    }

    /// The installed custom curve, `None` while the built-in one is used.
    pub fn custom_cutoff_curve(&self) -> Option<&[i32; FC_MAX + 1]> {
        match &self.curve {
            CutoffCurve::Builtin(_) => None,
            CutoffCurve::Custom(f0) => Some(f0),
        }
    }

    /// Reinstall a dense curve taken from [`Filter::custom_cutoff_curve`].
    pub fn restore_cutoff_curve(
        &mut self,
        chip_model: ChipModel,
        curve: Option<Box<[i32; FC_MAX + 1]>>,
    ) {
        self.curve = match curve {
            Some(f0) => CutoffCurve::Custom(f0),
            None => CutoffCurve::Builtin(chip_model),
        };
        self.set_w0();
    }

    /// Current distortion model parameters.
    pub fn get_distortion_properties(&self) -> DistortionProperties {
        self.distortion
    }

    /// Replace the distortion model parameters.
    pub fn set_distortion_properties(&mut self, properties: DistortionProperties) {
        self.distortion = properties;
    }

    /// Enable or disable the filter. A disabled filter routes everything to
    /// the mixer and holds its integrators at zero.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether the filter is in the signal path.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_q(&mut self) {
        // Q is controlled linearly by res. Q has approximate range [Q_MIN, 1.7].
        // As resonance is increased, the filter must be clocked more often to keep
        // stable.

        // The coefficient 1024 is dispensed of later by right-shifting 10 times
        // (2 ^ 10 = 1024).
        debug_assert!(self.res < 16);
        self.q_1024_div = (1024.0 / (Q_MIN + self.res as f64 / 15.0)) as i32;
    }

    fn set_w0(&mut self) {
        let f0 = self.curve.f0();
        let fc = self.fc as usize;
        debug_assert!(fc <= FC_MAX);

        // Limit f0 to keep 1-cycle filter stable.
        self.w0 = w0_for(f0[fc] as f64).min(w0_for(F0_MAX_1CYCLE));

        // The slope of the curve around fc scales the distortion, which acts
        // much like a change of FC. The 1023 -> 1024 step is a DAC artifact
        // and is cancelled from the estimate.
        let fc_min = fc.saturating_sub(DERIV_SPAN);
        let fc_max = (fc + DERIV_SPAN).min(FC_MAX);
        let kinkfix = if fc_min <= 1023 && fc_max >= 1024 {
            f0[1024] - f0[1023]
        } else {
            0
        };
        self.w0_deriv = (f0[fc_max] - f0[fc_min] - kinkfix) * 256 / (fc_max - fc_min) as i32;
    }

    /// Effective w0 under op-amp distortion, given the level in the
    /// integrators.
    #[inline]
    fn estimate_distorted_w0(&self, source: i32) -> i32 {
        let rate = self.distortion.rate.max(1) as i64;
        let source = source as i64;
        // Smoothly ramp distortion from 0.
        let mut level = if source <= 0 { 0 } else { source * source / rate };
        level -= (self.distortion.headroom as i64 * rate) >> 8;
        let w0_eff = self.w0 as i64 + self.w0_deriv_smoothed as i64 * level / rate;
        w0_eff.clamp(self.w0_min as i64, self.w0_max as i64) as i32
    }

    #[inline]
    fn clamp_op(&self, value: i64) -> i32 {
        if self.distortion.enabled {
            value.clamp(self.distortion.opmin as i64, self.distortion.opmax as i64) as i32
        } else {
            value as i32
        }
    }

    /// Clock the filter for one cycle with 20-bit voice outputs and external
    /// input.
    #[inline]
    pub fn clock(&mut self, voices: &[i32; NUM_VOICES], ext_in: i32) {
        // Scale each voice down from 20 to 13 bits.
        // NB! Voice 3 is not silenced by voice3off if it is routed through
        // the filter.
        let silence_voice3 = self.voice3_off && !self.routing.get_bit(2);
        let scaled = |index: usize, sample: i32| {
            if index == 2 && silence_voice3 {
                0
            } else {
                sample >> 7
            }
        };
        let ext_in = ext_in >> 7;

        // This is handy for testing.
        if !self.enabled {
            self.vnf = voices
                .iter()
                .enumerate()
                .fold(ext_in, |sum, (index, &sample)| sum + scaled(index, sample));
            self.vhp = 0;
            self.vbp = 0;
            self.vlp = 0;
            return;
        }

        let mut vi = 0;
        let mut vnf = 0;
        for (index, &sample) in voices.iter().enumerate() {
            if self.routing.get_bit(index) {
                vi += scaled(index, sample);
            } else {
                vnf += scaled(index, sample);
            }
        }
        if self.ext_filt {
            vi += ext_in;
        } else {
            vnf += ext_in;
        }
        self.vnf = vnf;

        let w0_eff = if self.distortion.enabled {
            self.estimate_distorted_w0(self.vhp + self.vbp)
        } else {
            self.w0
        };
        self.w0_deriv_smoothed += (self.w0_deriv - self.w0_deriv_smoothed).signum();

        // delta_t = 1 is converted to seconds given a 1MHz clock by dividing
        // with 1 000 000.
        //
        // Vhp = -Vbp/Q - Vlp - Vi;
        // dVlp = w0*Vbp*dt;
        // dVbp = w0*Vhp*dt;
        self.vhp = self.clamp_op((-(self.vbp as i64) * self.q_1024_div as i64) >> 10);
        self.vhp = self.clamp_op(self.vhp as i64 - (self.vlp as i64 + vi as i64));
        self.vlp = self.clamp_op(self.vlp as i64 + ((w0_eff as i64 * self.vbp as i64) >> 20));
        self.vbp = self.clamp_op(self.vbp as i64 + ((w0_eff as i64 * self.vhp as i64) >> 20));
    }

    /// Mixer output: bypass sum plus selected filter outputs, times volume.
    #[inline]
    pub fn output(&self) -> i32 {
        let vf = if !self.enabled {
            0
        } else {
            let mut vf = 0;
            if self.hp_bp_lp.get_bit(0) {
                vf += self.vlp;
            }
            if self.hp_bp_lp.get_bit(1) {
                vf += self.vbp;
            }
            if self.hp_bp_lp.get_bit(2) {
                vf += self.vhp;
            }
            vf
        };
        (self.vnf + vf + self.mixer_dc) * self.vol as i32
    }

    /// Reset registers and integrators.
    pub fn reset(&mut self) {
        self.fc = 0;
        self.res = 0;
        self.routing = 0;
        self.ext_filt = false;
        self.voice3_off = false;
        self.hp_bp_lp = 0;
        self.vol = 0;
        self.vhp = 0;
        self.vbp = 0;
        self.vlp = 0;
        self.vnf = 0;
        self.set_w0();
        self.set_q();
        self.w0_deriv_smoothed = 0;
    }

    // -- Register access

    /// FC low bits.
    pub fn get_fc_lo(&self) -> u8 {
        (self.fc & 0x007) as u8
    }

    /// FC high bits.
    pub fn get_fc_hi(&self) -> u8 {
        (self.fc >> 3) as u8
    }

    /// Resonance and classic routing nibble.
    pub fn get_res_filt(&self) -> u8 {
        let mut value = (self.res << 4) | (self.routing & 0x07);
        value.set_bit(3, self.ext_filt);
        value
    }

    /// voice3off, mode and volume.
    pub fn get_mode_vol(&self) -> u8 {
        let mut value = (self.hp_bp_lp << 4) | (self.vol & 0x0f);
        value.set_bit(7, self.voice3_off);
        value
    }

    /// Routing bit of `voice` as seen through its extended FILT register.
    pub fn get_voice_filt(&self, voice: usize) -> u8 {
        self.routing.get_bit(voice) as u8
    }

    /// Set FC low bits.
    pub fn set_fc_lo(&mut self, value: u8) {
        self.fc = (self.fc & 0x7f8) | (value as u16 & 0x007);
        self.set_w0();
    }

    /// Set FC high bits.
    pub fn set_fc_hi(&mut self, value: u8) {
        self.fc = (((value as u16) << 3) & 0x7f8) | (self.fc & 0x007);
        self.set_w0();
    }

    /// Set resonance and the routing of voices 0-2 and the external input.
    pub fn set_res_filt(&mut self, value: u8) {
        self.res = (value >> 4) & 0x0f;
        self.routing = (self.routing & !0x07) | (value & 0x07);
        self.ext_filt = value.get_bit(3);
        self.set_q();
    }

    /// Set resonance only.
    pub fn set_res(&mut self, value: u8) {
        self.res = (value >> 4) & 0x0f;
        self.set_q();
    }

    /// Set voice3off, mode and volume.
    pub fn set_mode_vol(&mut self, value: u8) {
        self.voice3_off = value.get_bit(7);
        self.hp_bp_lp = (value >> 4) & 0x07;
        self.vol = value & 0x0f;
    }

    /// Route `voice` through the filter when bit 0 of `value` is set.
    pub fn set_voice_filt(&mut self, voice: usize, value: u8) {
        debug_assert!(voice < NUM_VOICES);
        self.routing.set_bit(voice, value.get_bit(0));
    }

    // -- Integrator state

    /// `[vhp, vbp, vlp, vnf]`.
    pub fn get_state(&self) -> [i32; 4] {
        [self.vhp, self.vbp, self.vlp, self.vnf]
    }

    /// Smoothed cutoff curve slope used by the distortion estimate.
    pub fn get_w0_deriv_smoothed(&self) -> i32 {
        self.w0_deriv_smoothed
    }

    /// Restore integrators and smoothed slope.
    pub fn set_state(&mut self, state: [i32; 4], w0_deriv_smoothed: i32) {
        [self.vhp, self.vbp, self.vlp, self.vnf] = state;
        self.w0_deriv_smoothed = w0_deriv_smoothed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(cycle: u32) -> i32 {
        if (cycle / 300) % 2 == 0 {
            0x7ff * 0xff
        } else {
            -0x7ff * 0xff
        }
    }

    #[test]
    fn builtin_curves_hit_measured_points() {
        let f0 = Filter::new(ChipModel::Mos6581);
        let curve = f0.cutoff_curve();
        assert_eq!(curve[0], 220);
        assert_eq!(curve[1023], 6000);
        assert_eq!(curve[1024], 4600);
        assert_eq!(curve[2047], 18000);

        let f0 = Filter::new(ChipModel::Mos8580);
        let curve = f0.cutoff_curve();
        assert_eq!(curve[0], 0);
        assert_eq!(curve[1024], 6500);
        assert_eq!(curve[2047], 12500);
    }

    #[test]
    fn custom_curve_is_flat_outside_points() {
        let mut filter = Filter::new(ChipModel::Mos8580);
        filter
            .set_cutoff_table(ChipModel::Mos8580, Some(&[(100, 1000), (200, 2000)]))
            .unwrap();
        let curve = filter.cutoff_curve();
        assert_eq!(curve[0], 1000);
        assert_eq!(curve[150], 1500);
        assert_eq!(curve[2047], 2000);
    }

    #[test]
    fn rejected_curve_keeps_previous() {
        let mut filter = Filter::new(ChipModel::Mos6581);
        assert_eq!(
            filter.set_cutoff_table(ChipModel::Mos6581, Some(&[(5, 10)])),
            Err(CutoffTableError::PointCount(1))
        );
        assert_eq!(
            filter.set_cutoff_table(ChipModel::Mos6581, Some(&[(5, 10), (5, 20)])),
            Err(CutoffTableError::NotIncreasing { index: 1 })
        );
        assert_eq!(
            filter.set_cutoff_table(ChipModel::Mos6581, Some(&[(0, 10), (2048, 20)])),
            Err(CutoffTableError::OutOfRange { index: 1 })
        );
        assert_eq!(filter.cutoff_curve()[1024], 4600);
    }

    #[test]
    fn res_filt_keeps_extended_routing() {
        let mut filter = Filter::new(ChipModel::Mos6581);
        filter.set_voice_filt(4, 0x01);
        filter.set_res_filt(0xf9);
        assert_eq!(filter.get_res_filt(), 0xf9);
        assert_eq!(filter.get_voice_filt(0), 1);
        assert_eq!(filter.get_voice_filt(4), 1);
        filter.set_res_filt(0x00);
        assert_eq!(filter.get_voice_filt(0), 0);
        assert_eq!(filter.get_voice_filt(4), 1);
    }

    #[test]
    fn disabled_distortion_never_clamps() {
        let mut filter = Filter::new(ChipModel::Mos6581);
        filter.set_distortion_properties(DistortionProperties {
            enabled: false,
            rate: 100,
            headroom: 10,
            opmin: -10,
            opmax: 10,
        });
        filter.set_fc_lo(0x07);
        filter.set_fc_hi(0x40);
        filter.set_res_filt(0xf1);
        filter.set_mode_vol(0x1f);

        // Reference two-integrator loop without any clamping.
        let w0 = filter.w0 as i64;
        let q = filter.q_1024_div as i64;
        let (mut vhp, mut vbp, mut vlp) = (0i64, 0i64, 0i64);
        let mut exceeded = false;
        for cycle in 0..20_000 {
            let mut voices = [0; NUM_VOICES];
            voices[0] = square(cycle);
            filter.clock(&voices, 0);

            let vi = (voices[0] >> 7) as i64;
            vhp = (-vbp * q) >> 10;
            vhp -= vlp + vi;
            vlp += (w0 * vbp) >> 20;
            vbp += (w0 * vhp) >> 20;

            let [hp, bp, lp, _] = filter.get_state();
            assert_eq!(
                [hp, bp, lp],
                [vhp as i32, vbp as i32, vlp as i32],
                "cycle {}",
                cycle
            );
            exceeded |= vbp.abs() > 10;
        }
        assert!(exceeded, "signal must leave the configured op-amp range");
    }

    #[test]
    fn enabled_distortion_clamps_integrators() {
        let mut filter = Filter::new(ChipModel::Mos6581);
        filter.set_distortion_properties(DistortionProperties {
            enabled: true,
            rate: 2048,
            headroom: 0,
            opmin: -2000,
            opmax: 2000,
        });
        filter.set_fc_hi(0x80);
        filter.set_res_filt(0xf1);
        for cycle in 0..20_000 {
            let mut voices = [0; NUM_VOICES];
            voices[0] = square(cycle);
            filter.clock(&voices, 0);
            for value in filter.get_state().iter().take(3) {
                assert!((-2000..=2000).contains(value), "cycle {}", cycle);
            }
        }
    }

    #[test]
    fn voice3off_spares_filtered_voice() {
        let mut filter = Filter::new(ChipModel::Mos8580);
        filter.set_enabled(false);
        filter.set_mode_vol(0x81);
        let mut voices = [0; NUM_VOICES];
        voices[2] = 0x100 << 7;
        filter.clock(&voices, 0);
        assert_eq!(filter.output(), 0);

        filter.set_res_filt(0x04);
        filter.clock(&voices, 0);
        assert_eq!(filter.output(), 0x100);
    }
}
