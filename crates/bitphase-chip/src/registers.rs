//! AY-3-8910 / YM2149 register map.
//!
//! Only the 14 sound registers (R0-R13) are modelled; the I/O ports are not
//! used by the tracker.

use std::fmt;

use bitflags::bitflags;

/// Number of sound registers.
pub const REGISTER_COUNT: usize = 14;

/// Bits implemented by each register.
pub const REGISTER_MASKS: [u8; REGISTER_COUNT] = [
    0xFF, 0x0F, 0xFF, 0x0F, 0xFF, 0x0F, 0x1F, 0xFF, 0x1F, 0x1F, 0x1F, 0xFF, 0xFF, 0x0F,
];

/// Sound register address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Register {
    /// Channel A tone period, low byte - R0
    ToneALo = 0,
    /// Channel A tone period, high nibble - R1
    ToneAHi = 1,
    /// Channel B tone period, low byte - R2
    ToneBLo = 2,
    /// Channel B tone period, high nibble - R3
    ToneBHi = 3,
    /// Channel C tone period, low byte - R4
    ToneCLo = 4,
    /// Channel C tone period, high nibble - R5
    ToneCHi = 5,
    /// Noise period - R6
    NoisePeriod = 6,
    /// Mixer control - R7
    Mixer = 7,
    /// Channel A amplitude - R8
    VolumeA = 8,
    /// Channel B amplitude - R9
    VolumeB = 9,
    /// Channel C amplitude - R10
    VolumeC = 10,
    /// Envelope period, low byte - R11
    EnvelopeLo = 11,
    /// Envelope period, high byte - R12
    EnvelopeHi = 12,
    /// Envelope shape - R13
    EnvelopeShape = 13,
}

impl Register {
    /// All sound registers in address order.
    pub const ALL: [Register; REGISTER_COUNT] = [
        Register::ToneALo,
        Register::ToneAHi,
        Register::ToneBLo,
        Register::ToneBHi,
        Register::ToneCLo,
        Register::ToneCHi,
        Register::NoisePeriod,
        Register::Mixer,
        Register::VolumeA,
        Register::VolumeB,
        Register::VolumeC,
        Register::EnvelopeLo,
        Register::EnvelopeHi,
        Register::EnvelopeShape,
    ];

    /// Converts a raw address, `None` for the I/O ports and above.
    pub fn from_addr(addr: u8) -> Option<Self> {
        Self::ALL.get(addr as usize).copied()
    }

    /// Register address.
    pub fn addr(self) -> u8 {
        self as u8
    }

    /// Low tone register of a channel (0-2).
    pub fn tone_lo(channel: usize) -> Self {
        Self::ALL[(channel % 3) * 2]
    }

    /// Amplitude register of a channel (0-2).
    pub fn volume(channel: usize) -> Self {
        Self::ALL[8 + channel % 3]
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.addr())
    }
}

bitflags! {
    /// Mixer register (R7) bits. A set bit *disables* the source.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MixerBits: u8 {
        /// Tone A off.
        const TONE_A_OFF = 0x01;
        /// Tone B off.
        const TONE_B_OFF = 0x02;
        /// Tone C off.
        const TONE_C_OFF = 0x04;
        /// Noise A off.
        const NOISE_A_OFF = 0x08;
        /// Noise B off.
        const NOISE_B_OFF = 0x10;
        /// Noise C off.
        const NOISE_C_OFF = 0x20;
    }
}

impl MixerBits {
    /// Mixer value with every source muted.
    pub fn all_off() -> Self {
        Self::all()
    }

    /// Whether tone is enabled for `channel`.
    pub fn tone_enabled(self, channel: usize) -> bool {
        self.bits() & (1 << channel) == 0
    }

    /// Whether noise is enabled for `channel`.
    pub fn noise_enabled(self, channel: usize) -> bool {
        self.bits() & (8 << channel) == 0
    }

    /// Sets the tone/noise enables of one channel.
    pub fn set_channel(&mut self, channel: usize, tone: bool, noise: bool) {
        let tone_bit = MixerBits::from_bits_truncate(1 << channel);
        let noise_bit = MixerBits::from_bits_truncate(8 << channel);
        self.set(tone_bit, !tone);
        self.set(noise_bit, !noise);
    }
}

/// Plain copy of the 14 sound registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterBank {
    regs: [u8; REGISTER_COUNT],
}

impl Default for RegisterBank {
    fn default() -> Self {
        let mut regs = [0; REGISTER_COUNT];
        regs[Register::Mixer as usize] = MixerBits::all_off().bits();
        Self { regs }
    }
}

impl RegisterBank {
    /// Creates a bank in power-on state (everything silent).
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps raw register values, masking unimplemented bits.
    pub fn from_array(values: [u8; REGISTER_COUNT]) -> Self {
        let mut bank = Self { regs: [0; REGISTER_COUNT] };
        for (addr, value) in values.into_iter().enumerate() {
            bank.regs[addr] = value & REGISTER_MASKS[addr];
        }
        bank
    }

    /// Reads a register.
    pub fn get(&self, reg: Register) -> u8 {
        self.regs[reg as usize]
    }

    /// Writes a register, masking unimplemented bits.
    pub fn set(&mut self, reg: Register, value: u8) {
        self.regs[reg as usize] = value & REGISTER_MASKS[reg as usize];
    }

    /// 12-bit tone period of a channel.
    pub fn tone_period(&self, channel: usize) -> u16 {
        let lo = Register::tone_lo(channel) as usize;
        u16::from(self.regs[lo]) | (u16::from(self.regs[lo + 1]) << 8)
    }

    /// Writes a 12-bit tone period.
    pub fn set_tone_period(&mut self, channel: usize, period: u16) {
        let lo = Register::tone_lo(channel);
        self.set(lo, (period & 0xFF) as u8);
        self.regs[lo as usize + 1] = ((period >> 8) & 0x0F) as u8;
    }

    /// 16-bit envelope period.
    pub fn envelope_period(&self) -> u16 {
        u16::from(self.get(Register::EnvelopeLo)) | (u16::from(self.get(Register::EnvelopeHi)) << 8)
    }

    /// Writes the envelope period.
    pub fn set_envelope_period(&mut self, period: u16) {
        self.set(Register::EnvelopeLo, (period & 0xFF) as u8);
        self.set(Register::EnvelopeHi, (period >> 8) as u8);
    }

    /// Mixer bits.
    pub fn mixer(&self) -> MixerBits {
        MixerBits::from_bits_truncate(self.get(Register::Mixer))
    }

    /// Raw register values.
    pub fn as_array(&self) -> &[u8; REGISTER_COUNT] {
        &self.regs
    }
}
