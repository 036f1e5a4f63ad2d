//! AY pattern graph.
//!
//! This is the representation the editor and the simulation work on. The
//! generic pattern of `bitphase-common` only exists as an exchange format
//! built from it on demand (see [`crate::adapter`]).

use bitphase_common::Effect;
use serde::{Deserialize, Serialize};

use crate::note::Note;

/// Effect columns per channel row.
pub const EFFECT_COLUMNS: usize = 1;

/// Default pattern length for new patterns.
pub const DEFAULT_PATTERN_LENGTH: usize = 64;

/// Table field value that switches the channel's table off.
pub const TABLE_OFF: i32 = -1;

/// Envelope shape field value that switches the channel's envelope off.
pub const ENVELOPE_SHAPE_OFF: u8 = 15;

/// One channel row.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Row {
    /// Note cell.
    pub note: Note,
    /// Effect columns; empty effects are always `None`.
    pub effects: [Option<Effect>; EFFECT_COLUMNS],
    /// Instrument id, 0 = unchanged.
    pub instrument: u16,
    /// Envelope shape, 0 = unchanged, 1..=14 shape, 15 = envelope off.
    pub envelope_shape: u8,
    /// Table id, 0 = unchanged, -1 = table off.
    pub table: i32,
    /// Channel volume, 0 = unchanged.
    pub volume: u8,
}

impl Row {
    /// First effect column.
    pub fn effect(&self) -> Option<&Effect> {
        self.effects[0].as_ref()
    }

    /// Returns `true` when the row carries no data.
    pub fn is_empty(&self) -> bool {
        self == &Row::default()
    }
}

/// Per-row data shared by all channels.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatternRow {
    /// Envelope period, 0 = unchanged.
    pub envelope_value: u16,
    /// Noise period, 0 = unchanged.
    pub noise_value: u8,
    /// Envelope period effect.
    pub envelope_effect: Option<Effect>,
}

/// Rows of one pattern channel.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Channel {
    /// One entry per row.
    pub rows: Vec<Row>,
}

/// A pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pattern {
    /// Id referenced from the pattern order.
    pub id: usize,
    /// Row count.
    pub length: usize,
    /// Channels (hardware channels expanded by the virtual channel map).
    pub channels: Vec<Channel>,
    /// Global rows.
    #[serde(default)]
    pub pattern_rows: Vec<PatternRow>,
}

impl Pattern {
    /// Creates an empty pattern.
    pub fn new(id: usize, length: usize, channel_count: usize) -> Self {
        Self {
            id,
            length,
            channels: vec![
                Channel {
                    rows: vec![Row::default(); length],
                };
                channel_count
            ],
            pattern_rows: vec![PatternRow::default(); length],
        }
    }

    /// Copy with a different id.
    pub fn clone_with_id(&self, id: usize) -> Self {
        Self { id, ..self.clone() }
    }

    /// Changes the row count, padding with empty rows.
    pub fn resize(&mut self, length: usize) {
        self.length = length;
        self.pattern_rows.resize(length, PatternRow::default());
        for channel in &mut self.channels {
            channel.rows.resize(length, Row::default());
        }
    }

    /// Pads or trims row lists to `length` (used after deserialization).
    pub fn normalize(&mut self) {
        let length = self.length;
        self.resize(length);
    }

    /// Row of a channel.
    pub fn row(&self, channel: usize, row: usize) -> Option<&Row> {
        self.channels.get(channel)?.rows.get(row)
    }
}
