//! Backend trait abstraction for PSG emulation cores
//!
//! The simulation loop only talks to the chip through register writes and
//! per-sample clocking, so any register-level core can be plugged in.

/// Common interface for AY/YM emulation backends
///
/// # Example
///
/// ```
/// use bitphase_chip::{AyChip, PsgBackend};
///
/// fn play_note<B: PsgBackend>(chip: &mut B) {
///     chip.write_register(0x00, 0xF0); // Channel A period low
///     chip.write_register(0x01, 0x01); // Channel A period high
///     chip.write_register(0x08, 0x0F); // Channel A volume
///     chip.write_register(0x07, 0x3E); // Mixer: enable tone A
///
///     chip.clock();
///     let _ = chip.channel_outputs();
/// }
///
/// play_note(&mut AyChip::new());
/// ```
pub trait PsgBackend: Send {
    /// Reset every register and generator
    fn reset(&mut self);

    /// Write a sound register (0x00-0x0D); other addresses are ignored
    fn write_register(&mut self, addr: u8, value: u8);

    /// Read back a sound register, 0 for other addresses
    fn read_register(&self, addr: u8) -> u8;

    /// Restart the envelope even if R13 keeps its value
    fn trigger_envelope(&mut self);

    /// Produce the next output sample
    fn clock(&mut self);

    /// Mono sample in range [-1.0, 1.0] after DC removal
    fn sample(&self) -> f32;

    /// Per-channel levels of the last sample, each in [0.0, 1.0]
    fn channel_outputs(&self) -> [f32; 3];

    /// Mute or unmute a channel
    fn set_channel_mute(&mut self, channel: usize, mute: bool);

    /// Whether a channel is muted
    fn is_channel_muted(&self, channel: usize) -> bool;
}
