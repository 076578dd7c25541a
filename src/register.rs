// This file is part of resid-rs.
// Copyright (c) 2017-2019 Sebastian Jastrzebski <sebby2k@gmail.com>. All rights reserved.
// Portions (c) 2004 Dag Lem <resid@nimrod.no>
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

//! Register address decoding.
//!
//! The classic bank (0x00-0x18) and the extension bank (0x19-0x26) are
//! looked up in a constant table. From 0x40 on every voice owns a block of
//! 0x20 registers decoded through a second table.

use super::wave::NUM_HARMONICS;
use super::NUM_VOICES;

/// Register addresses.
#[allow(missing_docs)]
pub mod reg {
    pub const FREQLO1: u8 = 0x00;
    pub const FREQHI1: u8 = 0x01;
    pub const PWLO1: u8 = 0x02;
    pub const PWHI1: u8 = 0x03;
    pub const CR1: u8 = 0x04;
    pub const AD1: u8 = 0x05;
    pub const SR1: u8 = 0x06;
    pub const FREQLO2: u8 = 0x07;
    pub const FREQHI2: u8 = 0x08;
    pub const PWLO2: u8 = 0x09;
    pub const PWHI2: u8 = 0x0a;
    pub const CR2: u8 = 0x0b;
    pub const AD2: u8 = 0x0c;
    pub const SR2: u8 = 0x0d;
    pub const FREQLO3: u8 = 0x0e;
    pub const FREQHI3: u8 = 0x0f;
    pub const PWLO3: u8 = 0x10;
    pub const PWHI3: u8 = 0x11;
    pub const CR3: u8 = 0x12;
    pub const AD3: u8 = 0x13;
    pub const SR3: u8 = 0x14;
    pub const FCLO: u8 = 0x15;
    pub const FCHI: u8 = 0x16;
    pub const RESFILT: u8 = 0x17;
    pub const MODVOL: u8 = 0x18;
    // Read side of 0x19-0x1c.
    pub const POTX: u8 = 0x19;
    pub const POTY: u8 = 0x1a;
    pub const OSC3: u8 = 0x1b;
    pub const ENV3: u8 = 0x1c;
    // Write side of the extension bank.
    pub const BASS_GAIN_LO: u8 = 0x19;
    pub const BASS_GAIN_HI: u8 = 0x1a;
    pub const BASS_CUTOFF_LO: u8 = 0x1b;
    pub const BASS_CUTOFF_HI: u8 = 0x1c;
    pub const TREBLE_GAIN_LO: u8 = 0x1d;
    pub const TREBLE_GAIN_HI: u8 = 0x1e;
    pub const TREBLE_CUTOFF_LO: u8 = 0x1f;
    pub const TREBLE_CUTOFF_HI: u8 = 0x20;
    pub const RES: u8 = 0x21;
    pub const FUZZ_GAIN_LO: u8 = 0x22;
    pub const FUZZ_GAIN_HI: u8 = 0x23;
    pub const FUZZ_MULT_LO: u8 = 0x24;
    pub const FUZZ_MULT_HI: u8 = 0x25;
    pub const FUZZ_MIX: u8 = 0x26;
    // Extended voice blocks.
    pub const EXT_VOICE_BASE: u8 = 0x40;
    pub const EXT_VOICE_STRIDE: u8 = 0x20;
    // Offsets within an extended voice block.
    pub const V_FREQLO: u8 = 0x00;
    pub const V_FREQHI: u8 = 0x01;
    pub const V_PWLO: u8 = 0x02;
    pub const V_PWHI: u8 = 0x03;
    pub const V_CR: u8 = 0x04;
    pub const V_AD: u8 = 0x05;
    pub const V_SR: u8 = 0x06;
    pub const V_HVOL: u8 = 0x07;
    pub const V_FUZZ_GAIN_LO: u8 = 0x0f;
    pub const V_FUZZ_GAIN_HI: u8 = 0x10;
    pub const V_FUZZ_MULT_LO: u8 = 0x11;
    pub const V_FUZZ_MULT_HI: u8 = 0x12;
    pub const V_FUZZ_MIX: u8 = 0x13;
    pub const V_FILT: u8 = 0x14;

    /// Address of `offset` in the extended block of `voice`.
    pub const fn ext_voice(voice: usize, offset: u8) -> u8 {
        EXT_VOICE_BASE + voice as u8 * EXT_VOICE_STRIDE + offset
    }
}

/// Fuzz stage register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FuzzReg {
    /// Gain low byte.
    GainLo,
    /// Gain high byte.
    GainHi,
    /// Multiplier low byte.
    MultLo,
    /// Multiplier high byte.
    MultHi,
    /// Dry/wet mix.
    Mix,
}

/// Per-voice register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoiceReg {
    /// Frequency low byte.
    FreqLo,
    /// Frequency high byte.
    FreqHi,
    /// Pulse width low byte.
    PwLo,
    /// Pulse width high nibble.
    PwHi,
    /// Waveform, test, ring mod, sync and gate.
    Control,
    /// Attack and decay nibbles.
    AttackDecay,
    /// Sustain and release nibbles.
    SustainRelease,
    /// Volume of a harmonic, 0 is the second harmonic.
    HarmonicVolume(usize),
    /// Voice fuzz stage.
    Fuzz(FuzzReg),
    /// Filter routing of this voice.
    Filt,
}

/// Shared filter register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterReg {
    /// Cutoff low bits.
    FcLo,
    /// Cutoff high bits.
    FcHi,
    /// Resonance and routing of voices 0-2 and the external input.
    ResFilt,
    /// voice3off, filter mode and volume.
    ModeVol,
    /// Resonance only.
    Res,
}

/// Shelving filter register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToneReg {
    /// Gain low byte.
    GainLo,
    /// Gain high byte.
    GainHi,
    /// Cutoff low byte.
    CutoffLo,
    /// Cutoff high byte.
    CutoffHi,
}

/// A decoded register address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Register {
    /// Register of one voice.
    Voice {
        /// Voice index.
        voice: usize,
        /// Register within the voice.
        reg: VoiceReg,
    },
    /// Shared filter register.
    Filter(FilterReg),
    /// Bass boost register.
    BassBoost(ToneReg),
    /// Treble boost register.
    TrebleBoost(ToneReg),
    /// Master fuzz register.
    Fuzz(FuzzReg),
}

const CLASSIC_VOICE_REGS: usize = 7;
const BANK_SIZE: usize = reg::FUZZ_MIX as usize + 1;
const VOICE_BLOCK_SIZE: usize = reg::EXT_VOICE_STRIDE as usize;

const VOICE_BLOCK: [Option<VoiceReg>; VOICE_BLOCK_SIZE] = build_voice_block();
const BANK: [Option<Register>; BANK_SIZE] = build_bank();

const fn build_voice_block() -> [Option<VoiceReg>; VOICE_BLOCK_SIZE] {
    let mut block = [None; VOICE_BLOCK_SIZE];
    block[reg::V_FREQLO as usize] = Some(VoiceReg::FreqLo);
    block[reg::V_FREQHI as usize] = Some(VoiceReg::FreqHi);
    block[reg::V_PWLO as usize] = Some(VoiceReg::PwLo);
    block[reg::V_PWHI as usize] = Some(VoiceReg::PwHi);
    block[reg::V_CR as usize] = Some(VoiceReg::Control);
    block[reg::V_AD as usize] = Some(VoiceReg::AttackDecay);
    block[reg::V_SR as usize] = Some(VoiceReg::SustainRelease);
    let mut harmonic = 0;
    while harmonic < NUM_HARMONICS {
        block[reg::V_HVOL as usize + harmonic] = Some(VoiceReg::HarmonicVolume(harmonic));
        harmonic += 1;
    }
    block[reg::V_FUZZ_GAIN_LO as usize] = Some(VoiceReg::Fuzz(FuzzReg::GainLo));
    block[reg::V_FUZZ_GAIN_HI as usize] = Some(VoiceReg::Fuzz(FuzzReg::GainHi));
    block[reg::V_FUZZ_MULT_LO as usize] = Some(VoiceReg::Fuzz(FuzzReg::MultLo));
    block[reg::V_FUZZ_MULT_HI as usize] = Some(VoiceReg::Fuzz(FuzzReg::MultHi));
    block[reg::V_FUZZ_MIX as usize] = Some(VoiceReg::Fuzz(FuzzReg::Mix));
    block[reg::V_FILT as usize] = Some(VoiceReg::Filt);
    block
}

const fn build_bank() -> [Option<Register>; BANK_SIZE] {
    let mut bank = [None; BANK_SIZE];
    let mut address = 0;
    while address < 3 * CLASSIC_VOICE_REGS {
        if let Some(reg) = VOICE_BLOCK[address % CLASSIC_VOICE_REGS] {
            bank[address] = Some(Register::Voice {
                voice: address / CLASSIC_VOICE_REGS,
                reg,
            });
        }
        address += 1;
    }
    bank[reg::FCLO as usize] = Some(Register::Filter(FilterReg::FcLo));
    bank[reg::FCHI as usize] = Some(Register::Filter(FilterReg::FcHi));
    bank[reg::RESFILT as usize] = Some(Register::Filter(FilterReg::ResFilt));
    bank[reg::MODVOL as usize] = Some(Register::Filter(FilterReg::ModeVol));
    bank[reg::BASS_GAIN_LO as usize] = Some(Register::BassBoost(ToneReg::GainLo));
    bank[reg::BASS_GAIN_HI as usize] = Some(Register::BassBoost(ToneReg::GainHi));
    bank[reg::BASS_CUTOFF_LO as usize] = Some(Register::BassBoost(ToneReg::CutoffLo));
    bank[reg::BASS_CUTOFF_HI as usize] = Some(Register::BassBoost(ToneReg::CutoffHi));
    bank[reg::TREBLE_GAIN_LO as usize] = Some(Register::TrebleBoost(ToneReg::GainLo));
    bank[reg::TREBLE_GAIN_HI as usize] = Some(Register::TrebleBoost(ToneReg::GainHi));
    bank[reg::TREBLE_CUTOFF_LO as usize] = Some(Register::TrebleBoost(ToneReg::CutoffLo));
    bank[reg::TREBLE_CUTOFF_HI as usize] = Some(Register::TrebleBoost(ToneReg::CutoffHi));
    bank[reg::RES as usize] = Some(Register::Filter(FilterReg::Res));
    bank[reg::FUZZ_GAIN_LO as usize] = Some(Register::Fuzz(FuzzReg::GainLo));
    bank[reg::FUZZ_GAIN_HI as usize] = Some(Register::Fuzz(FuzzReg::GainHi));
    bank[reg::FUZZ_MULT_LO as usize] = Some(Register::Fuzz(FuzzReg::MultLo));
    bank[reg::FUZZ_MULT_HI as usize] = Some(Register::Fuzz(FuzzReg::MultHi));
    bank[reg::FUZZ_MIX as usize] = Some(Register::Fuzz(FuzzReg::Mix));
    bank
}

impl Register {
    /// Decode a register address. Unmapped addresses yield `None`.
    pub fn decode(address: u8) -> Option<Register> {
        let address = address as usize;
        if address < BANK_SIZE {
            return BANK[address];
        }
        let offset = address.checked_sub(reg::EXT_VOICE_BASE as usize)?;
        let voice = offset / VOICE_BLOCK_SIZE;
        if voice >= NUM_VOICES {
            return None;
        }
        VOICE_BLOCK[offset % VOICE_BLOCK_SIZE].map(|reg| Register::Voice { voice, reg })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_voice_registers() {
        assert_eq!(
            Register::decode(reg::FREQLO1),
            Some(Register::Voice {
                voice: 0,
                reg: VoiceReg::FreqLo
            })
        );
        assert_eq!(
            Register::decode(reg::CR2),
            Some(Register::Voice {
                voice: 1,
                reg: VoiceReg::Control
            })
        );
        assert_eq!(
            Register::decode(reg::SR3),
            Some(Register::Voice {
                voice: 2,
                reg: VoiceReg::SustainRelease
            })
        );
    }

    #[test]
    fn extension_bank() {
        assert_eq!(
            Register::decode(reg::MODVOL),
            Some(Register::Filter(FilterReg::ModeVol))
        );
        assert_eq!(
            Register::decode(0x1c),
            Some(Register::BassBoost(ToneReg::CutoffHi))
        );
        assert_eq!(
            Register::decode(0x1d),
            Some(Register::TrebleBoost(ToneReg::GainLo))
        );
        assert_eq!(Register::decode(0x21), Some(Register::Filter(FilterReg::Res)));
        assert_eq!(Register::decode(0x26), Some(Register::Fuzz(FuzzReg::Mix)));
    }

    #[test]
    fn extended_voice_blocks() {
        assert_eq!(
            Register::decode(reg::ext_voice(5, reg::V_FILT)),
            Some(Register::Voice {
                voice: 5,
                reg: VoiceReg::Filt
            })
        );
        assert_eq!(
            Register::decode(reg::ext_voice(3, reg::V_HVOL + 7)),
            Some(Register::Voice {
                voice: 3,
                reg: VoiceReg::HarmonicVolume(7)
            })
        );
        assert_eq!(
            Register::decode(reg::ext_voice(0, reg::V_FUZZ_MULT_HI)),
            Some(Register::Voice {
                voice: 0,
                reg: VoiceReg::Fuzz(FuzzReg::MultHi)
            })
        );
    }

    #[test]
    fn unmapped_addresses() {
        for address in 0x27..0x40 {
            assert_eq!(Register::decode(address), None, "{:02x}", address);
        }
        for voice in 0..NUM_VOICES {
            for offset in 0x15..reg::EXT_VOICE_STRIDE {
                assert_eq!(Register::decode(reg::ext_voice(voice, offset)), None);
            }
        }
    }
}
