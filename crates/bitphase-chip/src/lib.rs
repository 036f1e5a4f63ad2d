//! AY-3-8910 / YM2149 register-level emulation core.
//!
//! The tracker's simulation loop produces register frames; this crate turns
//! them into audio. It is intentionally a black box: write registers, clock
//! once per output sample, read levels.
//!
//! # Example
//!
//! ```
//! use bitphase_chip::{AyChip, ChipVariant, PsgBackend};
//!
//! let mut chip = AyChip::with_clocks(ChipVariant::Ym, 2_000_000, 48_000);
//! chip.write_register(0x00, 0x1C);
//! chip.write_register(0x08, 0x0F);
//! chip.write_register(0x07, 0x3E);
//!
//! let samples: Vec<f32> = (0..480).map(|_| { chip.clock(); chip.sample() }).collect();
//! assert_eq!(samples.len(), 480);
//! ```

#![warn(missing_docs)]

pub mod backend;
pub mod chip;
pub mod dc_filter;
pub mod generators;
pub mod registers;
pub mod tables;

// Re-export public API (explicit, no star exports)
pub use backend::PsgBackend;
pub use chip::{AyChip, ChipVariant, DEFAULT_CHIP_CLOCK};
pub use dc_filter::DcFilter;
pub use registers::{MixerBits, REGISTER_COUNT, REGISTER_MASKS, Register, RegisterBank};
