//! Structured effect cells and their 4-character text form.
//!
//! An effect cell is written as `[type][delay][paramHi][paramLo]`, or as
//! `[type][delay]T[table]` when the effect drives a table instead of a
//! numeric parameter. `....` is the empty cell.
//!
//! ```
//! use bitphase_common::{Effect, format_effect, parse_effect};
//!
//! let vibrato = Effect::new(bitphase_common::effect::codes::VIBRATO, 0, 0x42);
//! assert_eq!(format_effect(Some(&vibrato)), "V042");
//! assert_eq!(parse_effect("V042"), Some(vibrato));
//! assert_eq!(parse_effect("...."), None);
//! ```

use serde::{Deserialize, Deserializer, Serialize};

use crate::digits::{base36_char, base36_value, hex_value};

/// Effect type codes understood by the AY simulation.
///
/// Codes are single base-36 digits; `0` is the "no effect" type.
pub mod codes {
    /// Tone slide down (period increases every `delay` ticks).
    pub const SLIDE_DOWN: u8 = 0x01;
    /// Tone slide up (period decreases every `delay` ticks).
    pub const SLIDE_UP: u8 = 0x02;
    /// Portamento towards the row's note.
    pub const PORTAMENTO: u8 = 0x03;
    /// Jump to an instrument row.
    pub const INSTRUMENT_POSITION: u8 = 0x04;
    /// Jump to a table row.
    pub const TABLE_POSITION: u8 = 0x05;
    /// Gate the channel on/off (hi nibble on ticks, lo nibble off ticks).
    pub const ON_OFF: u8 = 0x06;
    /// Envelope period slide down (period increases).
    pub const ENVELOPE_SLIDE_DOWN: u8 = 0x09;
    /// Arpeggio (`xy` semitones, or a table).
    pub const ARPEGGIO: u8 = 10;
    /// Envelope period slide up (period decreases).
    pub const ENVELOPE_SLIDE_UP: u8 = 14;
    /// Signed pitch detune.
    pub const DETUNE: u8 = 25;
    /// Set song speed.
    pub const SPEED: u8 = 28;
    /// Vibrato (`x` speed, `y` depth, or a table).
    pub const VIBRATO: u8 = 31;
}

/// Highest table index that fits the one-character table charset (`V`).
pub const MAX_TABLE_INDEX: u8 = 31;

/// One effect cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Effect {
    /// Effect type code (base-36 digit value, 0..36).
    pub effect: u8,
    /// Ticks between effect steps (0..16).
    pub delay: u8,
    /// Numeric parameter.
    pub parameter: u8,
    /// Table driving the effect instead of `parameter`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_table_index"
    )]
    pub table_index: Option<u8>,
}

impl Effect {
    /// Creates an effect with a numeric parameter.
    pub fn new(effect: u8, delay: u8, parameter: u8) -> Self {
        Self {
            effect,
            delay: delay & 0x0F,
            parameter,
            table_index: None,
        }
    }

    /// Creates an effect that reads its values from a table.
    ///
    /// The index is clamped to `1..=MAX_TABLE_INDEX`, the range the cell text can hold.
    pub fn with_table(effect: u8, delay: u8, table_index: u8) -> Self {
        Self {
            effect,
            delay: delay & 0x0F,
            parameter: 0,
            table_index: Some(table_index.clamp(1, MAX_TABLE_INDEX)),
        }
    }

    /// An effect is empty when every component is zero and no table is attached.
    pub fn is_empty(&self) -> bool {
        self.effect == 0 && self.delay == 0 && self.parameter == 0 && self.table_index.is_none()
    }

    /// Signed view of the parameter, used by detune and slides.
    pub fn signed_parameter(&self) -> i8 {
        self.parameter as i8
    }

    /// High nibble of the parameter.
    pub fn param_hi(&self) -> u8 {
        self.parameter >> 4
    }

    /// Low nibble of the parameter.
    pub fn param_lo(&self) -> u8 {
        self.parameter & 0x0F
    }
}

/// Maps empty effects to `None` so equality checks never see zero objects.
pub fn normalize_effect(effect: Option<Effect>) -> Option<Effect> {
    effect.filter(|e| !e.is_empty())
}

fn deserialize_table_index<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<i64> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|v| u8::try_from(v).ok()).filter(|&v| v > 0))
}

/// Encodes a table index with the compact `1`-`9`, `A`-`V` charset.
pub fn table_index_char(index: u8) -> char {
    if index == 0 || index > MAX_TABLE_INDEX {
        return '.';
    }
    base36_char(index as u32).unwrap_or('.')
}

/// Decodes a table character; `.` and `0` mean "no table".
pub fn table_index_from_char(c: char) -> Option<u8> {
    match c {
        '.' | '0' => None,
        _ => c
            .to_digit(36)
            .map(|v| v as u8)
            .filter(|&v| v <= MAX_TABLE_INDEX),
    }
}

/// Formats an effect cell, `....` for `None` or empty effects.
pub fn format_effect(effect: Option<&Effect>) -> String {
    let Some(e) = effect.filter(|e| !e.is_empty()) else {
        return "....".to_string();
    };

    let type_char = if e.effect == 0 {
        '.'
    } else {
        base36_char(e.effect as u32).unwrap_or('.')
    };
    let delay_char = base36_char((e.delay & 0x0F) as u32).unwrap_or('0');

    match e.table_index {
        Some(table) => format!("{type_char}{delay_char}T{}", table_index_char(table)),
        None => format!("{type_char}{delay_char}{:02X}", e.parameter),
    }
}

/// Parses a 4-character effect cell.
///
/// Returns `None` for the empty cell and for text that is not a valid cell.
pub fn parse_effect(text: &str) -> Option<Effect> {
    let chars: Vec<char> = text.trim().chars().collect();
    if chars.len() != 4 {
        return None;
    }

    let effect = base36_value(chars[0])? as u8;
    let delay = hex_value(chars[1])? as u8;

    let parsed = if chars[2].eq_ignore_ascii_case(&'T') {
        match table_index_from_char(chars[3]) {
            Some(table) => Effect::with_table(effect, delay, table),
            None => Effect::new(effect, delay, 0),
        }
    } else {
        let hi = hex_value(chars[2])?;
        let lo = hex_value(chars[3])?;
        Effect::new(effect, delay, ((hi << 4) | lo) as u8)
    };

    normalize_effect(Some(parsed))
}
