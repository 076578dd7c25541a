// Oscillator corner cases: the noise register, the TEST bit and the
// accumulator arithmetic behind every waveform.

use residplus::wave::{WaveformGenerator, NUM_HARMONICS};
use residplus::ChipModel;

fn new_wave() -> WaveformGenerator {
    let mut gen = WaveformGenerator::new(ChipModel::Mos6581);
    gen.reset();
    gen
}

fn clock_n(gen: &mut WaveformGenerator, n: u32) {
    for _ in 0..n {
        gen.clock();
    }
}

#[test]
fn shift_register_init_value() {
    let gen = new_wave();
    assert_eq!(gen.get_shift(), 0x007f_fffc);
}

#[test]
fn noise_output() {
    let mut gen = new_wave();
    gen.set_shift(0x35_555f);
    gen.set_control(0x80);
    assert!(gen.output(None) > 0);
    // Only the eight tapped bits reach the output.
    assert_eq!(gen.output(None) & 0x00f, 0);
}

#[test]
fn test_bit_freezes_oscillator() {
    let mut gen = new_wave();
    gen.set_frequency_lo(0xff);
    gen.set_frequency_hi(0xff);
    clock_n(&mut gen, 100);
    assert_ne!(gen.get_acc(), 0);

    gen.set_control(0x08);
    assert_eq!(gen.get_acc(), 0);
    assert_eq!(gen.get_harmonic_acc(), [0; NUM_HARMONICS]);
    let shift = gen.get_shift();
    clock_n(&mut gen, 1000);
    assert_eq!(gen.get_acc(), 0);
    assert_eq!(gen.get_shift(), shift);

    gen.set_control(0x00);
    gen.clock();
    assert_eq!(gen.get_acc(), 0xffff);
}

#[test]
fn test_bit_forces_pulse_high() {
    let mut gen = new_wave();
    gen.set_pulse_width_hi(0x0f);
    gen.set_pulse_width_lo(0xff);
    gen.set_control(0x48);
    assert_eq!(gen.output(None), 0x0fff);
}

#[test]
fn accumulator_increment() {
    let mut gen = new_wave();
    gen.set_frequency_lo(0x01);

    gen.clock();
    assert_eq!(gen.get_acc(), 1);
    gen.clock();
    assert_eq!(gen.get_acc(), 2);

    gen.set_frequency_lo(0x00);
    gen.set_frequency_hi(0x01);
    gen.clock();
    assert_eq!(gen.get_acc(), 2 + 256);
}

#[test]
fn accumulator_wrap() {
    let mut gen = new_wave();
    gen.set_acc(0x00ff_fffe);
    gen.set_frequency_lo(0x10);
    gen.clock();
    assert_eq!(gen.get_acc(), 0x00_000e);
}

#[test]
fn msb_rising_is_flagged_for_one_cycle() {
    let mut gen = new_wave();
    gen.set_acc(0x7f_fff0);
    gen.set_frequency_lo(0x20);
    gen.clock();
    assert!(gen.is_msb_rising());
    gen.clock();
    assert!(!gen.is_msb_rising());
}

#[test]
fn shift_register_clocks_on_bit19() {
    let mut gen = new_wave();
    let initial = gen.get_shift();

    gen.set_acc(0x0007_fff0);
    gen.set_frequency_lo(0x20);
    gen.clock();
    let expected = ((initial << 1) & 0x7f_ffff) | (((initial >> 22) ^ (initial >> 17)) & 1);
    assert_eq!(gen.get_shift(), expected);

    // Bit 19 stays high: no further shift.
    gen.clock();
    assert_eq!(gen.get_shift(), expected);
}

#[test]
fn sawtooth_follows_accumulator() {
    let mut gen = new_wave();
    gen.set_control(0x20);
    for acc in [0x00_0000, 0x12_3456, 0x80_0000, 0xff_ffff] {
        gen.set_acc(acc);
        assert_eq!(gen.output(None) as u32, acc >> 12);
    }
}

#[test]
fn triangle_peaks_at_half_period() {
    let mut gen = new_wave();
    gen.set_control(0x10);
    gen.set_acc(0x7f_ffff);
    assert_eq!(gen.output(None), 0x0fff);
    gen.set_acc(0x80_0000);
    assert_eq!(gen.output(None), 0x0fff);
    gen.set_acc(0x00_0000);
    assert_eq!(gen.output(None), 0x0000);
    gen.set_acc(0xff_ffff);
    assert_eq!(gen.output(None), 0x0000);
}

#[test]
fn combined_waveforms_never_exceed_sawtooth() {
    for model in [ChipModel::Mos6581, ChipModel::Mos8580] {
        let mut gen = WaveformGenerator::new(model);
        gen.set_control(0x60);
        for step in 0..4096u32 {
            let acc = step << 12;
            gen.set_acc(acc);
            assert!(gen.output(None) as u32 <= acc >> 12);
        }
    }
}

#[test]
fn sync_bit() {
    let mut gen = new_wave();
    assert!(!gen.get_sync());
    gen.set_control(0x02);
    assert!(gen.get_sync());
    assert_eq!(gen.get_control(), 0x02);
    gen.set_control(0x00);
    assert!(!gen.get_sync());
}

#[test]
fn accumulator_returns_to_zero_phase() {
    for freq in [0x0010u32, 0x0100, 0x1234, 0xffff] {
        let mut gen = new_wave();
        gen.set_frequency_lo(freq as u8);
        gen.set_frequency_hi((freq >> 8) as u8);
        let mut cycles = 0u32;
        loop {
            gen.clock();
            cycles += 1;
            if gen.get_acc() < freq {
                break;
            }
        }
        // Wrap happens on the first step past 2^24.
        assert_eq!(cycles, (1 << 24) / freq + u32::from((1 << 24) % freq != 0));
        assert_eq!(gen.get_acc(), (cycles * freq) & 0x00ff_ffff);
    }
}

#[test]
fn zero_frequency_sawtooth_is_constant() {
    let mut gen = new_wave();
    gen.set_acc(0x45_6789);
    gen.set_control(0x20);
    let first = gen.output(None);
    for _ in 0..1000 {
        gen.clock();
        assert_eq!(gen.output(None), first);
    }
}

#[test]
fn held_test_bit_pins_triangle_at_zero_phase() {
    let mut gen = new_wave();
    gen.set_frequency_hi(0x20);
    clock_n(&mut gen, 500);
    gen.set_control(0x18);
    for _ in 0..1000 {
        gen.clock();
        assert_eq!(gen.output(None), 0);
    }
}
