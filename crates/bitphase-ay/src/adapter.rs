//! Conversion between AY patterns and generic patterns.
//!
//! `from_generic(to_generic(p)) == p` holds for every pattern whose empty
//! effects are stored as `None`. Lengths are carried over unchanged; row lists
//! shorter than `length` are padded with empty rows.

use bitphase_common::{
    FieldValue, GenericChannel, GenericPattern, GenericRow, PatternSource, normalize_effect,
};

use crate::note::Note;
use crate::pattern::{Channel, Pattern, PatternRow, Row};
use crate::project::Song;
use crate::schema::fields;

/// Two-way mapping between a chip pattern and the generic exchange format.
pub trait PatternConverter: Send + Sync {
    /// Builds the generic view of a pattern.
    fn to_generic(&self, pattern: &Pattern) -> GenericPattern;

    /// Rebuilds a chip pattern from its generic view.
    fn from_generic(&self, generic: &GenericPattern) -> Pattern;
}

/// Converter for AY patterns.
#[derive(Debug, Clone, Copy, Default)]
pub struct AyPatternConverter;

fn clamp_int<T>(value: Option<i64>) -> T
where
    T: TryFrom<i64> + Default + Bounded,
{
    let Some(value) = value else {
        return T::default();
    };
    T::try_from(value.clamp(T::MIN_I64, T::MAX_I64)).unwrap_or_default()
}

/// Integer range of a row field type.
trait Bounded {
    const MIN_I64: i64;
    const MAX_I64: i64;
}

macro_rules! bounded {
    ($($t:ty),*) => {
        $(impl Bounded for $t {
            const MIN_I64: i64 = <$t>::MIN as i64;
            const MAX_I64: i64 = <$t>::MAX as i64;
        })*
    };
}

bounded!(u8, u16, i32);

/// Generic view of one channel row.
pub fn row_to_generic(row: &Row) -> GenericRow {
    let mut out = GenericRow::new();
    let note = if row.note.is_none() {
        FieldValue::Null
    } else {
        FieldValue::Text(row.note.to_text())
    };
    out.insert(fields::NOTE, note);
    out.insert(fields::INSTRUMENT, i64::from(row.instrument).into());
    out.insert(fields::ENVELOPE_SHAPE, i64::from(row.envelope_shape).into());
    out.insert(fields::TABLE, i64::from(row.table).into());
    out.insert(fields::VOLUME, i64::from(row.volume).into());
    out.insert(fields::EFFECT, normalize_effect(row.effects[0]).into());
    out
}

/// Channel row rebuilt from its generic view.
pub fn row_from_generic(row: &GenericRow) -> Row {
    let note = row
        .text(fields::NOTE)
        .and_then(Note::from_text)
        .unwrap_or_default();
    Row {
        note,
        effects: [normalize_effect(row.effect(fields::EFFECT))],
        instrument: clamp_int(row.int(fields::INSTRUMENT)),
        envelope_shape: clamp_int(row.int(fields::ENVELOPE_SHAPE)),
        table: clamp_int(row.int(fields::TABLE)),
        volume: clamp_int(row.int(fields::VOLUME)),
    }
}

/// Generic view of one global row.
pub fn pattern_row_to_generic(row: &PatternRow) -> GenericRow {
    let mut out = GenericRow::new();
    out.insert(fields::ENVELOPE_VALUE, i64::from(row.envelope_value).into());
    out.insert(fields::NOISE_VALUE, i64::from(row.noise_value).into());
    out.insert(fields::ENVELOPE_EFFECT, normalize_effect(row.envelope_effect).into());
    out
}

/// Global row rebuilt from its generic view.
pub fn pattern_row_from_generic(row: &GenericRow) -> PatternRow {
    PatternRow {
        envelope_value: clamp_int(row.int(fields::ENVELOPE_VALUE)),
        noise_value: clamp_int(row.int(fields::NOISE_VALUE)),
        envelope_effect: normalize_effect(row.effect(fields::ENVELOPE_EFFECT)),
    }
}

impl PatternConverter for AyPatternConverter {
    fn to_generic(&self, pattern: &Pattern) -> GenericPattern {
        let length = pattern.length;
        let mut generic = GenericPattern::new(pattern.id, length, pattern.channels.len());

        for row in 0..length {
            if let Some(pattern_row) = pattern.pattern_rows.get(row) {
                generic.pattern_rows[row] = pattern_row_to_generic(pattern_row);
            } else {
                generic.pattern_rows[row] = pattern_row_to_generic(&PatternRow::default());
            }
            for (channel, out) in pattern.channels.iter().zip(&mut generic.channels) {
                out.rows[row] = match channel.rows.get(row) {
                    Some(r) => row_to_generic(r),
                    None => row_to_generic(&Row::default()),
                };
            }
        }
        generic
    }

    fn from_generic(&self, generic: &GenericPattern) -> Pattern {
        let length = generic.length;
        let pattern_rows = (0..length)
            .map(|row| {
                generic
                    .pattern_rows
                    .get(row)
                    .map(pattern_row_from_generic)
                    .unwrap_or_default()
            })
            .collect();
        let channels = generic
            .channels
            .iter()
            .map(|channel: &GenericChannel| Channel {
                rows: (0..length)
                    .map(|row| channel.rows.get(row).map(row_from_generic).unwrap_or_default())
                    .collect(),
            })
            .collect();

        Pattern {
            id: generic.id,
            length,
            channels,
            pattern_rows,
        }
    }
}

/// Generic view over the patterns of a song, for the catch-up resolver.
#[derive(Debug, Clone, Copy)]
pub struct SongPatterns<'a> {
    song: &'a Song,
}

impl<'a> SongPatterns<'a> {
    /// Wraps a song.
    pub fn new(song: &'a Song) -> Self {
        Self { song }
    }
}

impl PatternSource for SongPatterns<'_> {
    fn generic_pattern(&self, pattern_id: usize) -> Option<GenericPattern> {
        self.song
            .pattern(pattern_id)
            .map(|p| AyPatternConverter.to_generic(p))
    }

    fn pattern_length(&self, pattern_id: usize) -> Option<usize> {
        self.song.pattern(pattern_id).map(|p| p.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::NoteName;
    use crate::schema::ay_schema;
    use bitphase_common::Effect;
    use pretty_assertions::assert_eq;

    fn busy_pattern() -> Pattern {
        let mut pattern = Pattern::new(3, 4, 3);
        let row = &mut pattern.channels[0].rows[0];
        row.note = Note::new(NoteName::CSharp, 4);
        row.instrument = 1;
        row.envelope_shape = 15;
        row.table = -1;
        row.volume = 15;
        row.effects[0] = Some(Effect::new(1, 1, 2));

        let row = &mut pattern.channels[2].rows[3];
        row.note = Note::off();
        row.effects[0] = Some(Effect::with_table(0x0A, 0, 12));

        pattern.pattern_rows[1] = PatternRow {
            envelope_value: 0x1234,
            noise_value: 0x1F,
            envelope_effect: Some(Effect::new(0x0E, 2, 0x10)),
        };
        pattern
    }

    #[test]
    fn round_trip_preserves_every_field() {
        let pattern = busy_pattern();
        let generic = AyPatternConverter.to_generic(&pattern);
        generic.validate(ay_schema()).unwrap();
        assert_eq!(AyPatternConverter.from_generic(&generic), pattern);
    }

    #[test]
    fn empty_effects_become_null() {
        let mut pattern = Pattern::new(0, 1, 1);
        pattern.channels[0].rows[0].effects[0] = Some(Effect::default());
        let generic = AyPatternConverter.to_generic(&pattern);
        assert!(generic.channels[0].rows[0].get(fields::EFFECT).is_null());
        assert_eq!(
            AyPatternConverter.from_generic(&generic).channels[0].rows[0].effects[0],
            None
        );
    }

    #[test]
    fn missing_fields_default() {
        let generic = GenericPattern::new(9, 2, 2);
        let pattern = AyPatternConverter.from_generic(&generic);
        assert_eq!(pattern, Pattern::new(9, 2, 2));
    }

    #[test]
    fn short_row_lists_keep_length() {
        let mut generic = GenericPattern::new(1, 4, 1);
        generic.channels[0].rows.truncate(2);
        generic.pattern_rows.truncate(1);
        let pattern = AyPatternConverter.from_generic(&generic);
        assert_eq!(pattern.length, 4);
        assert_eq!(pattern.channels[0].rows.len(), 4);
        assert_eq!(pattern.pattern_rows.len(), 4);
    }
}
