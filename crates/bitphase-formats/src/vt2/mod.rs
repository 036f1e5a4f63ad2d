//! Vortex Tracker II text modules.
//!
//! VT2 text is the interchange format of the import pipeline: PT3 binaries
//! are decoded into [`Vt2Module`]s, written out as text and read back, so
//! both file types share one conversion path into a project.
//!
//! ```
//! use bitphase_formats::vt2::{parse_vt2, write_vt2};
//!
//! let text = "[Module]\nTitle=demo\nSpeed=3\nPlayOrder=L0\n\n[Pattern0]\n....|..|C-4 .... ....|--- .... ....|--- .... ....\n";
//! let modules = parse_vt2(text).unwrap();
//! assert_eq!(modules[0].title, "demo");
//! assert_eq!(parse_vt2(&write_vt2(&modules)).unwrap(), modules);
//! ```

mod parse;
mod write;

use std::collections::BTreeMap;

use bitphase_ay::DEFAULT_CHIP_CLOCK;

pub use parse::parse_vt2;
pub use write::{write_module, write_vt2};

/// Tone table used when a module does not name one.
pub const DEFAULT_NOTE_TABLE: u8 = 2;

/// Speed used when a module does not set one.
pub const DEFAULT_MODULE_SPEED: u8 = 3;

/// Highest sample number.
pub const MAX_SAMPLES: usize = 31;

/// Highest ornament number.
pub const MAX_ORNAMENTS: usize = 15;

/// One module (one chip of a TurboSound file).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vt2Module {
    /// Title.
    pub title: String,
    /// Author.
    pub author: String,
    /// Tracker version string (e.g. `3.6`).
    pub version: String,
    /// PT3 tone table index.
    pub note_table: u8,
    /// Chip clock in Hz.
    pub chip_freq: u32,
    /// Interrupt frequency in mHz (50000 = 50 Hz).
    pub int_freq: u32,
    /// Initial speed.
    pub speed: u8,
    /// Pattern numbers in play order.
    pub play_order: Vec<usize>,
    /// Index into `play_order` playback loops back to.
    pub loop_position: usize,
    /// Ornaments by number.
    pub ornaments: BTreeMap<usize, Vt2Ornament>,
    /// Samples by number.
    pub samples: BTreeMap<usize, Vt2Sample>,
    /// Patterns by number.
    pub patterns: BTreeMap<usize, Vt2Pattern>,
}

impl Default for Vt2Module {
    fn default() -> Self {
        Self {
            title: String::new(),
            author: String::new(),
            version: "3.6".to_string(),
            note_table: DEFAULT_NOTE_TABLE,
            chip_freq: DEFAULT_CHIP_CLOCK,
            int_freq: 50_000,
            speed: DEFAULT_MODULE_SPEED,
            play_order: Vec::new(),
            loop_position: 0,
            ornaments: BTreeMap::new(),
            samples: BTreeMap::new(),
            patterns: BTreeMap::new(),
        }
    }
}

/// Ornament: semitone offsets with a loop point.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Vt2Ornament {
    /// Offsets.
    pub offsets: Vec<i8>,
    /// Loop index.
    pub loop_point: usize,
}

/// One sample line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Vt2SampleLine {
    /// Tone enabled (`T`).
    pub tone: bool,
    /// Noise enabled (`N`).
    pub noise: bool,
    /// Envelope enabled (`E`).
    pub envelope: bool,
    /// Tone period offset.
    pub tone_offset: i16,
    /// Tone offset accumulates (`^`).
    pub tone_accumulate: bool,
    /// Noise or envelope offset.
    pub noise_envelope_offset: i8,
    /// Noise/envelope offset accumulates (`^`).
    pub noise_envelope_accumulate: bool,
    /// Amplitude (0..=15).
    pub amplitude: u8,
    /// Amplitude slide (-1, 0, +1).
    pub amplitude_slide: i8,
}

/// Sample: lines with a loop point.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Vt2Sample {
    /// Lines.
    pub lines: Vec<Vt2SampleLine>,
    /// Loop index.
    pub loop_point: usize,
}

/// Note column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Vt2Note {
    /// `---`
    #[default]
    Empty,
    /// `R--`
    Off,
    /// Note number, 0 = C-1.
    Note(u8),
}

/// Command column (`CDPP`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Vt2Command {
    /// Command number (0 = none, 1..=0xB).
    pub command: u8,
    /// Delay nibble.
    pub delay: u8,
    /// Parameter byte.
    pub parameter: u8,
}

impl Vt2Command {
    /// Returns `true` for `....`.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One channel cell of a pattern row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Vt2Cell {
    /// Note.
    pub note: Vt2Note,
    /// Sample number, 0 = unchanged.
    pub sample: u8,
    /// Envelope shape, 0 = unchanged, 15 = envelope off.
    pub envelope: u8,
    /// Ornament number, `None` = unchanged.
    pub ornament: Option<u8>,
    /// Volume, 0 = unchanged.
    pub volume: u8,
    /// Command.
    pub command: Vt2Command,
}

/// One pattern row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Vt2Row {
    /// Envelope period, 0 = unchanged.
    pub envelope_period: u16,
    /// Noise period, 0 = unchanged.
    pub noise: u8,
    /// Channels A, B and C.
    pub channels: [Vt2Cell; 3],
}

/// Pattern rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Vt2Pattern {
    /// Rows.
    pub rows: Vec<Vt2Row>,
}
