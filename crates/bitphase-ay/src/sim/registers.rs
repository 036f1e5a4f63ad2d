//! Register state produced by the simulation, one snapshot per tick.

use bitphase_chip::{MixerBits, REGISTER_COUNT, Register, RegisterBank};

/// Mixer switches of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MixerState {
    /// Tone enabled.
    pub tone: bool,
    /// Noise enabled.
    pub noise: bool,
    /// Amplitude taken from the hardware envelope.
    pub envelope: bool,
}

/// Register values of one hardware channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelRegisters {
    /// Tone period (12 bits).
    pub tone: u16,
    /// Amplitude (0..=15).
    pub volume: u8,
    /// Mixer switches.
    pub mixer: MixerState,
}

/// Complete chip state after one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegisterState {
    /// Channels A, B and C.
    pub channels: [ChannelRegisters; 3],
    /// Noise period (5 bits).
    pub noise: u8,
    /// Envelope period.
    pub envelope_period: u16,
    /// Envelope shape (R13).
    pub envelope_shape: u8,
    /// R13 must be rewritten this tick even if unchanged.
    pub envelope_retrigger: bool,
}

/// Raw register snapshot handed to the chip and to the PSG encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterFrame {
    /// R0..R13.
    pub registers: [u8; REGISTER_COUNT],
    /// Whether R13 is written this frame.
    pub envelope_retrigger: bool,
}

impl RegisterState {
    /// Packs the state into the 14-register layout.
    pub fn to_frame(&self) -> RegisterFrame {
        let mut bank = RegisterBank::new();
        let mut mixer = MixerBits::all_off();

        for (index, channel) in self.channels.iter().enumerate() {
            bank.set_tone_period(index, channel.tone);
            mixer.set_channel(index, channel.mixer.tone, channel.mixer.noise);
            let envelope = if channel.mixer.envelope { 0x10 } else { 0 };
            bank.set(Register::volume(index), (channel.volume & 0x0F) | envelope);
        }
        bank.set(Register::NoisePeriod, self.noise);
        bank.set(Register::Mixer, mixer.bits());
        bank.set_envelope_period(self.envelope_period);
        bank.set(Register::EnvelopeShape, self.envelope_shape);

        RegisterFrame {
            registers: *bank.as_array(),
            envelope_retrigger: self.envelope_retrigger,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_channel_registers() {
        let mut state = RegisterState::default();
        state.channels[1] = ChannelRegisters {
            tone: 0x1FC,
            volume: 12,
            mixer: MixerState {
                tone: true,
                noise: true,
                envelope: true,
            },
        };
        state.noise = 0x3F;
        state.envelope_period = 0x1234;
        state.envelope_shape = 0x0E;

        let regs = state.to_frame().registers;
        assert_eq!(regs[2], 0xFC);
        assert_eq!(regs[3], 0x01);
        assert_eq!(regs[6], 0x1F);
        // only channel B audible: tone A/C off (0x05), noise A/C off (0x28)
        assert_eq!(regs[7], 0x2D);
        assert_eq!(regs[9], 0x1C);
        assert_eq!(regs[11], 0x34);
        assert_eq!(regs[12], 0x12);
        assert_eq!(regs[13], 0x0E);
    }
}
