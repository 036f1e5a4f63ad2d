//! Sound generators for the AY/YM PSG
//!
//! All generators are stepped at the chip clock divided by 8:
//! - Tone generators flip their output when the counter reaches the period
//! - Noise runs at half rate through a 17-bit LFSR
//! - Envelope steps one of 32 levels per period

use crate::tables::{ENVELOPE_SHAPES, EnvelopeSegment};

/// Number of tone channels
pub const NUM_CHANNELS: usize = 3;

/// Square wave generator for one channel
#[derive(Clone, Debug, Default)]
pub struct ToneGenerator {
    counter: u32,
    period: u32,
    output: bool,
}

impl ToneGenerator {
    /// Create a new tone generator
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the 12-bit period; 0 behaves as 1
    #[inline]
    pub fn set_period(&mut self, period: u16) {
        self.period = u32::from(period).max(1);
    }

    /// Current period
    #[inline]
    pub fn period(&self) -> u32 {
        self.period
    }

    /// Advance one step and return the output level
    #[inline]
    pub fn tick(&mut self) -> bool {
        self.counter += 1;
        if self.counter >= self.period {
            self.counter = 0;
            self.output = !self.output;
        }
        self.output
    }

    /// Reset to initial state
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Noise generator using a 17-bit LFSR
#[derive(Clone, Debug)]
pub struct NoiseGenerator {
    counter: u32,
    period: u32,
    lfsr: u32,
    output: bool,
    half_tick: bool,
}

impl NoiseGenerator {
    /// Create a new noise generator
    pub fn new() -> Self {
        Self {
            counter: 0,
            period: 1,
            lfsr: 1,
            output: false,
            half_tick: false,
        }
    }

    /// Set the 5-bit period; 0 behaves as 1
    #[inline]
    pub fn set_period(&mut self, period: u8) {
        self.period = u32::from(period & 0x1F).max(1);
    }

    /// Advance one step and return the output level
    ///
    /// Taps at bits 13 and 16 match the hardware sequence.
    #[inline]
    pub fn tick(&mut self) -> bool {
        self.half_tick = !self.half_tick;
        if self.half_tick {
            self.counter += 1;
            if self.counter >= self.period {
                self.counter = 0;
                let lsb = self.lfsr & 1;
                self.lfsr >>= 1;
                if lsb != 0 {
                    self.lfsr ^= 0x12000;
                }
                self.output = lsb != 0;
            }
        }
        self.output
    }

    /// Reset to initial state
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for NoiseGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Envelope generator with 16 shapes built from two segments each
#[derive(Clone, Debug)]
pub struct EnvelopeGenerator {
    counter: u32,
    period: u32,
    shape: usize,
    segment: usize,
    level: i32,
}

impl EnvelopeGenerator {
    /// Create a new envelope generator
    pub fn new() -> Self {
        let mut env = Self {
            counter: 0,
            period: 1,
            shape: 0,
            segment: 0,
            level: 0,
        };
        env.trigger();
        env
    }

    /// Set the 16-bit period; 0 behaves as 1
    #[inline]
    pub fn set_period(&mut self, period: u16) {
        self.period = u32::from(period).max(1);
    }

    /// Select a shape (R13) and restart the envelope
    #[inline]
    pub fn set_shape(&mut self, shape: u8) {
        self.shape = (shape & 0x0F) as usize;
        self.trigger();
    }

    /// Restart the current shape
    #[inline]
    pub fn trigger(&mut self) {
        self.counter = 0;
        self.segment = 0;
        self.level = ENVELOPE_SHAPES[self.shape][0].start_level();
    }

    /// Advance one step
    #[inline]
    pub fn tick(&mut self) {
        self.counter += 1;
        if self.counter < self.period {
            return;
        }
        self.counter = 0;

        let segment = ENVELOPE_SHAPES[self.shape][self.segment];
        match segment {
            EnvelopeSegment::SlideUp => {
                self.level += 1;
                if self.level > 31 {
                    self.next_segment();
                }
            }
            EnvelopeSegment::SlideDown => {
                self.level -= 1;
                if self.level < 0 {
                    self.next_segment();
                }
            }
            EnvelopeSegment::HoldTop | EnvelopeSegment::HoldBottom => {}
        }
    }

    fn next_segment(&mut self) {
        self.segment ^= 1;
        self.level = ENVELOPE_SHAPES[self.shape][self.segment].start_level();
    }

    /// Current 5-bit level
    #[inline]
    pub fn level(&self) -> usize {
        self.level.clamp(0, 31) as usize
    }

    /// Reset to initial state
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for EnvelopeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_toggles_every_period() {
        let mut tone = ToneGenerator::new();
        tone.set_period(4);
        let outputs: Vec<bool> = (0..8).map(|_| tone.tick()).collect();
        assert_eq!(
            outputs,
            vec![false, false, false, true, true, true, true, false]
        );
    }

    #[test]
    fn noise_generator_varies() {
        let mut noise = NoiseGenerator::new();
        let outputs: Vec<bool> = (0..400).map(|_| noise.tick()).collect();
        assert!(outputs.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn decay_shape_holds_at_zero() {
        let mut env = EnvelopeGenerator::new();
        env.set_period(1);
        env.set_shape(0x00);
        assert_eq!(env.level(), 31);
        for _ in 0..40 {
            env.tick();
        }
        assert_eq!(env.level(), 0);
    }

    #[test]
    fn sawtooth_repeats() {
        let mut env = EnvelopeGenerator::new();
        env.set_period(1);
        env.set_shape(0x0C);
        assert_eq!(env.level(), 0);
        for _ in 0..31 {
            env.tick();
        }
        assert_eq!(env.level(), 31);
        env.tick();
        assert_eq!(env.level(), 0);
    }

    #[test]
    fn attack_and_hold_stays_on_top() {
        let mut env = EnvelopeGenerator::new();
        env.set_period(2);
        env.set_shape(0x0D);
        for _ in 0..200 {
            env.tick();
        }
        assert_eq!(env.level(), 31);
    }
}
