//! Chip-agnostic core of the bitphase tracker.
//!
//! This crate holds everything that does not depend on a particular sound
//! chip:
//!
//! - [`GenericPattern`] - the pattern exchange format keyed by schema fields
//! - [`ChipSchema`] - declarative field layout, templates and tuning defaults
//! - [`format_row`] / [`parse_row`] - tracker text rendering of rows
//! - [`find_horizon`] / [`build_catch_up_segments`] - catch-up planning for seeks
//! - [`CancellationToken`], [`ProgressSink`], [`ResourceLoader`] - host collaborators
//!
//! # Example
//!
//! ```
//! use bitphase_common::{
//!     BacktrackPolicy, ChipSchema, FieldSpec, FieldType, FieldValue, GenericPattern,
//!     PatternPosition, resolve_catch_up,
//! };
//!
//! let schema = ChipSchema::builder("demo")
//!     .template("{instrument}")
//!     .field(FieldSpec::new("instrument", FieldType::Symbol, 2).backtrack(BacktrackPolicy::NonZero))
//!     .build();
//!
//! let mut patterns: Vec<_> = (0..3).map(|id| GenericPattern::new(id, 64, 3)).collect();
//! patterns[2].channels[0].rows[5].insert("instrument", FieldValue::Int(1));
//!
//! let plan = resolve_catch_up(&[0, 1, 2], PatternPosition::new(2, 40), &schema, &patterns).unwrap();
//! assert_eq!(plan.horizon, PatternPosition::new(2, 5));
//! assert_eq!(plan.segments.iter().map(|s| s.num_rows).collect::<Vec<_>>(), [64, 64, 6]);
//! ```

#![warn(missing_docs)]

mod digits;

pub mod cache;
pub mod cancel;
pub mod effect;
pub mod error;
pub mod format;
pub mod horizon;
pub mod pattern;
pub mod progress;
pub mod resource;
pub mod schema;

// Re-export public API (explicit, no star exports)
pub use cache::{DEFAULT_CACHED_PATTERNS, FormattedRowCache};
pub use cancel::CancellationToken;
pub use effect::{
    Effect, MAX_TABLE_INDEX, format_effect, normalize_effect, parse_effect, table_index_char,
    table_index_from_char,
};
pub use error::{CommonError, Result};
pub use format::{
    FormatOptions, ParsedRow, RowNumberStyle, RowParser, format_fields, format_row, format_value,
    is_note_text, parse_row, parse_value,
};
pub use horizon::{
    CatchUp, CatchUpSegment, PatternPosition, PatternSource, build_catch_up_segments,
    find_horizon, resolve_catch_up,
};
pub use pattern::{FieldValue, GenericChannel, GenericPattern, GenericRow};
pub use progress::{NoProgress, ProgressSink, percent_of};
pub use resource::{FsResourceLoader, ModuleHandle, ResourceLoader};
pub use schema::{
    BacktrackPolicy, ChipSchema, ChipSchemaBuilder, ChipSetting, FieldScope, FieldSpec, FieldType,
    SettingOption, TemplatePart, TuningRequest, template_parts,
};

// ============================================================================
// Common Constants
// ============================================================================

/// Standard audio sample rate (44.1 kHz), also the internal render rate.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Output sample rates accepted by the exporters.
pub const SUPPORTED_SAMPLE_RATES: [u32; 4] = [22_050, 44_100, 48_000, 96_000];

/// PAL interrupt rate (50 Hz).
pub const FRAME_RATE_PAL: u32 = 50;

/// Longest allowed pattern, in rows.
pub const MAX_PATTERN_LENGTH: usize = 256;

/// Upper bound of a single render, in seconds of audio.
pub const MAX_RENDER_SECONDS: u32 = 300;
