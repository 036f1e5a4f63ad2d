//! Chip-agnostic pattern grid.
//!
//! A [`GenericPattern`] is the exchange format between chip-specific pattern
//! graphs, the row formatter and the catch-up resolver. Rows are typed maps
//! keyed by schema field names; the key set is validated against the active
//! [`ChipSchema`] through [`GenericRow::set`].

use std::collections::BTreeMap;

use crate::effect::Effect;
use crate::error::{CommonError, Result};
use crate::schema::{ChipSchema, FieldScope, FieldType};

/// Value stored under a schema field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldValue {
    /// No value (empty cell).
    #[default]
    Null,
    /// Numeric value (hex, symbol and decimal fields).
    Int(i64),
    /// Textual value (note and text fields).
    Text(String),
    /// Structured effect.
    Effect(Effect),
}

static NULL_VALUE: FieldValue = FieldValue::Null;

impl FieldValue {
    /// Returns `true` for [`FieldValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Integer payload, if any.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Text payload, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Effect payload, if any.
    pub fn as_effect(&self) -> Option<&Effect> {
        match self {
            FieldValue::Effect(e) => Some(e),
            _ => None,
        }
    }

    /// Whether this value may be stored in a field of the given type.
    pub fn fits(&self, kind: FieldType) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Int(_) => matches!(
                kind,
                FieldType::Hex | FieldType::Symbol | FieldType::Decimal
            ),
            FieldValue::Text(_) => matches!(kind, FieldType::Note | FieldType::Text),
            FieldValue::Effect(_) => kind == FieldType::Effect,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<Option<Effect>> for FieldValue {
    fn from(e: Option<Effect>) -> Self {
        match e {
            Some(e) => FieldValue::Effect(e),
            None => FieldValue::Null,
        }
    }
}

/// One row of one channel (or the global row), keyed by field name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenericRow {
    values: BTreeMap<String, FieldValue>,
}

impl GenericRow {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a field, `Null` when absent.
    pub fn get(&self, field: &str) -> &FieldValue {
        self.values.get(field).unwrap_or(&NULL_VALUE)
    }

    /// Integer value of a field.
    pub fn int(&self, field: &str) -> Option<i64> {
        self.get(field).as_int()
    }

    /// Text value of a field.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).as_text()
    }

    /// Effect value of a field.
    pub fn effect(&self, field: &str) -> Option<Effect> {
        self.get(field).as_effect().copied()
    }

    /// Stores a value without consulting a schema.
    ///
    /// Chip adapters use this while building rows from their own typed
    /// model; editing code should go through [`GenericRow::set`].
    pub fn insert(&mut self, field: impl Into<String>, value: FieldValue) {
        self.values.insert(field.into(), value);
    }

    /// Stores a value after checking it against the schema.
    pub fn set(
        &mut self,
        schema: &ChipSchema,
        scope: FieldScope,
        field: &str,
        value: FieldValue,
    ) -> Result<()> {
        schema.check_value(scope, field, &value)?;
        self.values.insert(field.to_string(), value);
        Ok(())
    }

    /// Iterates over stored fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns `true` when no field holds a value.
    pub fn is_empty(&self) -> bool {
        self.values.values().all(FieldValue::is_null)
    }
}

/// Rows of one channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenericChannel {
    /// One row per pattern row index.
    pub rows: Vec<GenericRow>,
}

/// Chip-agnostic pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericPattern {
    /// Pattern id, unique within a song.
    pub id: usize,
    /// Row count.
    pub length: usize,
    /// Channels in hardware/virtual order.
    pub channels: Vec<GenericChannel>,
    /// Per-row fields not tied to a channel.
    pub pattern_rows: Vec<GenericRow>,
}

impl GenericPattern {
    /// Creates a pattern filled with empty rows.
    pub fn new(id: usize, length: usize, channel_count: usize) -> Self {
        Self {
            id,
            length,
            channels: vec![
                GenericChannel {
                    rows: vec![GenericRow::new(); length],
                };
                channel_count
            ],
            pattern_rows: vec![GenericRow::new(); length],
        }
    }

    /// Checks that every row list matches `length`.
    pub fn check_consistency(&self) -> Result<()> {
        if self.pattern_rows.len() != self.length {
            return Err(CommonError::InconsistentPattern {
                id: self.id,
                msg: format!(
                    "{} pattern rows for length {}",
                    self.pattern_rows.len(),
                    self.length
                ),
            });
        }
        for (index, channel) in self.channels.iter().enumerate() {
            if channel.rows.len() != self.length {
                return Err(CommonError::InconsistentPattern {
                    id: self.id,
                    msg: format!(
                        "channel {index} has {} rows for length {}",
                        channel.rows.len(),
                        self.length
                    ),
                });
            }
        }
        Ok(())
    }

    /// Validates every stored value against the schema.
    pub fn validate(&self, schema: &ChipSchema) -> Result<()> {
        self.check_consistency()?;
        for row in &self.pattern_rows {
            for (field, value) in row.iter() {
                schema.check_value(FieldScope::Global, field, value)?;
            }
        }
        for channel in &self.channels {
            for row in &channel.rows {
                for (field, value) in row.iter() {
                    schema.check_value(FieldScope::Channel, field, value)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, FieldType};

    fn schema() -> ChipSchema {
        ChipSchema::builder("test")
            .template("{note} {volume}")
            .field(FieldSpec::new("note", FieldType::Note, 3))
            .field(FieldSpec::new("volume", FieldType::Hex, 1))
            .global_template("{noise}")
            .global_field(FieldSpec::new("noise", FieldType::Hex, 2))
            .build()
    }

    #[test]
    fn set_rejects_unknown_and_mistyped_fields() {
        let schema = schema();
        let mut row = GenericRow::new();
        assert!(
            row.set(&schema, FieldScope::Channel, "volume", FieldValue::Int(3))
                .is_ok()
        );
        assert!(matches!(
            row.set(&schema, FieldScope::Channel, "pan", FieldValue::Int(1)),
            Err(CommonError::UnknownField { .. })
        ));
        assert!(matches!(
            row.set(
                &schema,
                FieldScope::Channel,
                "volume",
                FieldValue::Text("x".into())
            ),
            Err(CommonError::TypeMismatch { .. })
        ));
        assert!(
            row.set(&schema, FieldScope::Global, "volume", FieldValue::Int(1))
                .is_err()
        );
        assert_eq!(row.int("volume"), Some(3));
    }

    #[test]
    fn new_pattern_is_consistent() {
        let pattern = GenericPattern::new(4, 16, 3);
        assert!(pattern.check_consistency().is_ok());
        assert!(pattern.validate(&schema()).is_ok());

        let mut broken = pattern.clone();
        broken.channels[1].rows.pop();
        assert!(broken.check_consistency().is_err());
    }

    #[test]
    fn missing_field_reads_as_null() {
        let row = GenericRow::new();
        assert!(row.get("note").is_null());
        assert!(row.is_empty());
    }
}
