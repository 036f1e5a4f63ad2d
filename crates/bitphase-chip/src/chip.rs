//! AY-3-8910 / YM2149 PSG emulation.
//!
//! The generators run at the master clock divided by 8. Each output sample
//! averages the channel levels over the internal steps it spans, which acts
//! as a simple box filter against aliasing.

use serde::{Deserialize, Serialize};

use crate::backend::PsgBackend;
use crate::dc_filter::DcFilter;
use crate::generators::{EnvelopeGenerator, NUM_CHANNELS, NoiseGenerator, ToneGenerator};
use crate::registers::{REGISTER_COUNT, Register, RegisterBank};
use crate::tables::{AY_LEVELS, YM_LEVELS};

/// ZX Spectrum 128 master clock.
pub const DEFAULT_CHIP_CLOCK: u32 = 1_773_400;

const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Which chip's amplitude curve to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChipVariant {
    /// General Instrument AY-3-8910 (16 amplitude steps).
    #[default]
    #[serde(rename = "AY", alias = "ay")]
    Ay,
    /// Yamaha YM2149 (32 envelope steps).
    #[serde(rename = "YM", alias = "ym")]
    Ym,
}

impl ChipVariant {
    fn levels(self) -> &'static [f32; 32] {
        match self {
            ChipVariant::Ay => &AY_LEVELS,
            ChipVariant::Ym => &YM_LEVELS,
        }
    }
}

/// Register-level PSG emulator.
#[derive(Clone, Debug)]
pub struct AyChip {
    variant: ChipVariant,
    clock_eighth: u32,
    sample_rate: u32,
    inner_cycle: u32,
    bank: RegisterBank,
    tones: [ToneGenerator; NUM_CHANNELS],
    noise: NoiseGenerator,
    envelope: EnvelopeGenerator,
    muted: [bool; NUM_CHANNELS],
    last_channels: [f32; NUM_CHANNELS],
    last_sample: f32,
    dc_filter: DcFilter,
}

impl AyChip {
    /// Creates an AY at the Spectrum clock and 44.1 kHz.
    pub fn new() -> Self {
        Self::with_clocks(ChipVariant::Ay, DEFAULT_CHIP_CLOCK, DEFAULT_SAMPLE_RATE)
    }

    /// Creates a chip with explicit variant, master clock and sample rate.
    pub fn with_clocks(variant: ChipVariant, master_clock: u32, sample_rate: u32) -> Self {
        let mut chip = Self {
            variant,
            clock_eighth: (master_clock / 8).max(1),
            sample_rate: sample_rate.max(1),
            inner_cycle: 0,
            bank: RegisterBank::new(),
            tones: Default::default(),
            noise: NoiseGenerator::new(),
            envelope: EnvelopeGenerator::new(),
            muted: [false; NUM_CHANNELS],
            last_channels: [0.0; NUM_CHANNELS],
            last_sample: 0.0,
            dc_filter: DcFilter::new(),
        };
        chip.reset();
        chip
    }

    /// Chip variant.
    pub fn variant(&self) -> ChipVariant {
        self.variant
    }

    /// Current register contents.
    pub fn registers(&self) -> &RegisterBank {
        &self.bank
    }

    /// Writes all 14 registers; R13 is only written when `write_shape` is set.
    pub fn load_registers(&mut self, regs: &[u8; REGISTER_COUNT], write_shape: bool) {
        for (addr, &value) in regs.iter().enumerate().take(REGISTER_COUNT - 1) {
            self.write_register(addr as u8, value);
        }
        if write_shape {
            self.write_register(Register::EnvelopeShape.addr(), regs[REGISTER_COUNT - 1]);
        }
    }

    fn step(&mut self) -> [f32; NUM_CHANNELS] {
        let mixer = self.bank.mixer();
        let noise = self.noise.tick();
        self.envelope.tick();
        let levels = self.variant.levels();

        let mut out = [0.0; NUM_CHANNELS];
        for (channel, slot) in out.iter_mut().enumerate() {
            let tone = self.tones[channel].tick();
            let gate = (tone || !mixer.tone_enabled(channel))
                && (noise || !mixer.noise_enabled(channel));
            if !gate || self.muted[channel] {
                continue;
            }
            let volume = self.bank.get(Register::volume(channel));
            let level = if volume & 0x10 != 0 {
                self.envelope.level()
            } else {
                (volume as usize & 0x0F) * 2 + 1
            };
            *slot = levels[level];
        }
        out
    }

    /// Advances the chip by one output sample and returns per-channel levels.
    pub fn compute_next_sample(&mut self) -> [f32; NUM_CHANNELS] {
        let mut sum = [0.0f32; NUM_CHANNELS];
        let mut steps = 0u32;
        loop {
            let levels = self.step();
            for (acc, level) in sum.iter_mut().zip(levels) {
                *acc += level;
            }
            steps += 1;
            self.inner_cycle += self.sample_rate;
            if self.inner_cycle >= self.clock_eighth {
                break;
            }
        }
        self.inner_cycle -= self.clock_eighth;

        for acc in &mut sum {
            *acc /= steps as f32;
        }
        self.last_channels = sum;
        let mono = (sum[0] + sum[1] + sum[2]) / NUM_CHANNELS as f32;
        self.last_sample = self.dc_filter.process(mono).clamp(-1.0, 1.0);
        sum
    }
}

impl Default for AyChip {
    fn default() -> Self {
        Self::new()
    }
}

impl PsgBackend for AyChip {
    fn reset(&mut self) {
        self.bank = RegisterBank::new();
        for tone in &mut self.tones {
            tone.reset();
        }
        self.noise.reset();
        self.envelope.reset();
        self.inner_cycle = 0;
        self.last_channels = [0.0; NUM_CHANNELS];
        self.last_sample = 0.0;
        self.dc_filter.reset();
    }

    fn write_register(&mut self, addr: u8, value: u8) {
        let Some(reg) = Register::from_addr(addr) else {
            return;
        };
        self.bank.set(reg, value);
        match reg {
            Register::ToneALo
            | Register::ToneAHi
            | Register::ToneBLo
            | Register::ToneBHi
            | Register::ToneCLo
            | Register::ToneCHi => {
                let channel = addr as usize / 2;
                self.tones[channel].set_period(self.bank.tone_period(channel));
            }
            Register::NoisePeriod => self.noise.set_period(value),
            Register::EnvelopeLo | Register::EnvelopeHi => {
                self.envelope.set_period(self.bank.envelope_period());
            }
            Register::EnvelopeShape => self.envelope.set_shape(value),
            Register::Mixer | Register::VolumeA | Register::VolumeB | Register::VolumeC => {}
        }
    }

    fn read_register(&self, addr: u8) -> u8 {
        Register::from_addr(addr).map_or(0, |reg| self.bank.get(reg))
    }

    fn trigger_envelope(&mut self) {
        self.envelope.trigger();
    }

    fn clock(&mut self) {
        self.compute_next_sample();
    }

    fn sample(&self) -> f32 {
        self.last_sample
    }

    fn channel_outputs(&self) -> [f32; 3] {
        self.last_channels
    }

    fn set_channel_mute(&mut self, channel: usize, mute: bool) {
        if let Some(slot) = self.muted.get_mut(channel) {
            *slot = mute;
        }
    }

    fn is_channel_muted(&self, channel: usize) -> bool {
        self.muted.get(channel).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audible_chip() -> AyChip {
        let mut chip = AyChip::new();
        chip.write_register(0x00, 0xFE);
        chip.write_register(0x01, 0x00);
        chip.write_register(0x07, 0x3E);
        chip.write_register(0x08, 0x0F);
        chip
    }

    #[test]
    fn silent_after_reset() {
        let mut chip = AyChip::new();
        for _ in 0..100 {
            chip.clock();
            assert_eq!(chip.channel_outputs(), [0.0; 3]);
        }
    }

    #[test]
    fn tone_produces_output_on_channel_a_only() {
        let mut chip = audible_chip();
        let mut peak = [0.0f32; 3];
        for _ in 0..2000 {
            chip.clock();
            for (p, v) in peak.iter_mut().zip(chip.channel_outputs()) {
                *p = p.max(v);
            }
        }
        assert!(peak[0] > 0.5);
        assert_eq!(peak[1], 0.0);
        assert_eq!(peak[2], 0.0);
    }

    #[test]
    fn mute_silences_channel() {
        let mut chip = audible_chip();
        chip.set_channel_mute(0, true);
        assert!(chip.is_channel_muted(0));
        for _ in 0..500 {
            chip.clock();
            assert_eq!(chip.channel_outputs()[0], 0.0);
        }
    }

    #[test]
    fn registers_are_masked() {
        let mut chip = AyChip::new();
        chip.write_register(0x01, 0xFF);
        chip.write_register(0x08, 0xFF);
        assert_eq!(chip.read_register(0x01), 0x0F);
        assert_eq!(chip.read_register(0x08), 0x1F);
        assert_eq!(chip.read_register(0x0E), 0);
    }

    #[test]
    fn rendering_is_deterministic() {
        let mut a = audible_chip();
        let mut b = audible_chip();
        a.write_register(0x07, 0x36);
        b.write_register(0x07, 0x36);
        for _ in 0..4000 {
            a.clock();
            b.clock();
            assert_eq!(a.sample().to_bits(), b.sample().to_bits());
        }
    }
}
