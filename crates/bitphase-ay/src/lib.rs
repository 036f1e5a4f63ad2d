//! AY/YM project model and register simulation for the bitphase tracker.
//!
//! This crate provides:
//! - The AY pattern graph ([`Pattern`], [`Row`], [`Note`]) and the project
//!   model ([`Project`], [`Song`], [`Instrument`], [`Table`])
//! - The AY [`ChipSchema`](bitphase_common::ChipSchema) and the converter to
//!   and from generic patterns
//! - `.btp` persistence (gzip-compressed JSON)
//! - The deterministic tick simulation ([`SongSimulator`]) and the renderer
//!   that feeds it into the chip emulator ([`SongRenderer`])
//! - The chip registry ([`get_chip_by_type`])
//!
//! # Example
//!
//! ```
//! use bitphase_ay::{FrameCollector, Note, NoteName, Pattern, Project, RenderSettings, require_chip};
//! use bitphase_common::CancellationToken;
//!
//! let mut project = Project::default();
//! let mut pattern = Pattern::new(0, 16, 3);
//! pattern.channels[0].rows[0].note = Note::new(NoteName::C, 4);
//! project.songs[0].patterns.push(pattern);
//! project.pattern_order = vec![0];
//!
//! let chip = require_chip(&project.songs[0].chip_type).unwrap();
//! let mut renderer = chip.create_renderer(&project, 0, RenderSettings::default()).unwrap();
//! let mut frames = FrameCollector::default();
//! renderer.run(&mut frames, &CancellationToken::new()).unwrap();
//! assert_eq!(frames.frames.len(), 16 * 6);
//! ```

#![warn(missing_docs)]

pub mod adapter;
pub mod chip;
pub mod error;
pub mod note;
pub mod pattern;
pub mod persist;
pub mod project;
pub mod render;
pub mod schema;
pub mod sim;
pub mod tuning;

// Re-export public API (explicit, no star exports)
pub use adapter::{
    AyPatternConverter, PatternConverter, SongPatterns, pattern_row_from_generic,
    pattern_row_to_generic, row_from_generic, row_to_generic,
};
pub use chip::{AyDescriptor, ChipDescriptor, get_chip_by_type, require_chip};
pub use error::{Result, SongError};
pub use note::{NOTE_COUNT, Note, NoteName};
pub use pattern::{
    Channel, DEFAULT_PATTERN_LENGTH, EFFECT_COLUMNS, ENVELOPE_SHAPE_OFF, Pattern, PatternRow, Row,
    TABLE_OFF,
};
pub use persist::{apply_defaults, load_project, read_project_file, save_project, write_project_file};
pub use project::{
    AY_CHIP_TYPE, DEFAULT_SPEED, HARDWARE_CHANNELS, Instrument, InstrumentRow, Project, Song,
    Table,
};
pub use render::{
    ChannelCollector, FrameCollector, RenderSettings, RenderSink, RenderStats, SongRenderer,
};
pub use schema::ay_schema;
pub use sim::{
    ChannelRegisters, MixerState, PlaybackPosition, RegisterFrame, RegisterState, SampleStep,
    SongSimulator,
};
pub use tuning::{equal_tempered_table, resolve_tuning_table};

pub use bitphase_chip::{ChipVariant, DEFAULT_CHIP_CLOCK};
