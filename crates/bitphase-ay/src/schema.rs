//! AY field layout.

use std::sync::OnceLock;

use bitphase_chip::DEFAULT_CHIP_CLOCK;
use bitphase_common::{
    BacktrackPolicy, ChipSchema, ChipSetting, FieldSpec, FieldType, SettingOption,
};

use crate::pattern::TABLE_OFF;
use crate::tuning::{equal_tempered_table, resolve_tuning_table};

/// Field names shared by the schema, the adapter and the formatter.
pub mod fields {
    /// Note cell.
    pub const NOTE: &str = "note";
    /// Instrument id.
    pub const INSTRUMENT: &str = "instrument";
    /// Envelope shape.
    pub const ENVELOPE_SHAPE: &str = "envelopeShape";
    /// Table id.
    pub const TABLE: &str = "table";
    /// Channel volume.
    pub const VOLUME: &str = "volume";
    /// First effect column.
    pub const EFFECT: &str = "effect";
    /// Global envelope period.
    pub const ENVELOPE_VALUE: &str = "envelopeValue";
    /// Global envelope effect.
    pub const ENVELOPE_EFFECT: &str = "envelopeEffect";
    /// Global noise period.
    pub const NOISE_VALUE: &str = "noiseValue";
}

/// Channel row template.
pub const CHANNEL_TEMPLATE: &str = "{note} {instrument}{envelopeShape}{table}{volume} {effect}";

/// Global row template.
pub const GLOBAL_TEMPLATE: &str = "{envelopeValue} {envelopeEffect} {noiseValue}";

fn option(label: &str, value: f64) -> SettingOption {
    SettingOption {
        label: label.to_string(),
        value,
    }
}

fn build() -> ChipSchema {
    use BacktrackPolicy::{Any, NonZero};

    ChipSchema::builder(crate::project::AY_CHIP_TYPE)
        .template(CHANNEL_TEMPLATE)
        .field(FieldSpec::new(fields::NOTE, FieldType::Note, 3).color("note").backtrack(Any))
        .field(
            FieldSpec::new(fields::INSTRUMENT, FieldType::Symbol, 2)
                .color("instrument")
                .zero_marker(0)
                .backtrack(NonZero),
        )
        .field(
            FieldSpec::new(fields::ENVELOPE_SHAPE, FieldType::Hex, 1)
                .color("envelope")
                .zero_marker(0)
                .backtrack(NonZero),
        )
        .field(
            FieldSpec::new(fields::TABLE, FieldType::Symbol, 1)
                .color("table")
                .zero_marker(0)
                .off_marker(i64::from(TABLE_OFF))
                .backtrack(NonZero),
        )
        .field(
            FieldSpec::new(fields::VOLUME, FieldType::Hex, 1)
                .color("volume")
                .zero_marker(0)
                .backtrack(NonZero),
        )
        .field(
            FieldSpec::new(fields::EFFECT, FieldType::Effect, 4)
                .color("effect")
                .backtrack(NonZero),
        )
        .global_template(GLOBAL_TEMPLATE)
        .global_field(
            FieldSpec::new(fields::ENVELOPE_VALUE, FieldType::Hex, 4)
                .color("envelope")
                .zero_marker(0)
                .backtrack(NonZero),
        )
        .global_field(
            FieldSpec::new(fields::ENVELOPE_EFFECT, FieldType::Effect, 4)
                .color("effect")
                .backtrack(NonZero),
        )
        .global_field(
            FieldSpec::new(fields::NOISE_VALUE, FieldType::Hex, 2)
                .color("noise")
                .zero_marker(0)
                .backtrack(NonZero),
        )
        .channel_labels(["A", "B", "C"])
        .setting(ChipSetting {
            key: "chipVariant".to_string(),
            label: "Chip".to_string(),
            options: vec![option("AY-3-8910", 0.0), option("YM2149", 1.0)],
            default: 0.0,
        })
        .setting(ChipSetting {
            key: "chipFrequency".to_string(),
            label: "Chip frequency".to_string(),
            options: vec![
                option("1.7734 MHz (ZX Spectrum)", f64::from(DEFAULT_CHIP_CLOCK)),
                option("1.75 MHz (Pentagon)", 1_750_000.0),
                option("2 MHz (Atari ST)", 2_000_000.0),
                option("1 MHz (Amstrad CPC)", 1_000_000.0),
            ],
            default: f64::from(DEFAULT_CHIP_CLOCK),
        })
        .setting(ChipSetting {
            key: "interruptFrequency".to_string(),
            label: "Interrupt frequency".to_string(),
            options: vec![
                option("50 Hz", 50.0),
                option("48.828 Hz", 48.828),
                option("60 Hz", 60.0),
            ],
            default: 50.0,
        })
        .default_tuning_table(equal_tempered_table(DEFAULT_CHIP_CLOCK))
        .tuning_resolver(resolve_tuning_table)
        .build()
}

/// The AY schema (built once).
pub fn ay_schema() -> &'static ChipSchema {
    static SCHEMA: OnceLock<ChipSchema> = OnceLock::new();
    SCHEMA.get_or_init(build)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitphase_common::FieldScope;

    #[test]
    fn templates_resolve() {
        let schema = ay_schema();
        schema.validate().unwrap();
        assert_eq!(schema.row_width(FieldScope::Channel), 3 + 1 + 5 + 1 + 4);
        assert_eq!(schema.row_width(FieldScope::Global), 4 + 1 + 4 + 1 + 2);
        assert_eq!(schema.default_tuning_table.len(), crate::note::NOTE_COUNT);
    }

    #[test]
    fn column_hit_testing() {
        let schema = ay_schema();
        assert_eq!(schema.field_at_column(FieldScope::Channel, 0).as_deref(), Some("note"));
        assert_eq!(schema.field_at_column(FieldScope::Channel, 3), None);
        assert_eq!(
            schema.field_at_column(FieldScope::Channel, 6).as_deref(),
            Some("envelopeShape")
        );
        assert_eq!(schema.field_at_column(FieldScope::Channel, 13).as_deref(), Some("effect"));
    }
}
