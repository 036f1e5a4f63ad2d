//! Chip descriptors and the chip registry.
//!
//! A [`ChipDescriptor`] bundles everything the editor, the importers and the
//! exporters need to know about a chip type. New chips register a descriptor
//! here without touching the simulation or the catch-up resolver.

use std::sync::OnceLock;

use bitphase_common::{ChipSchema, FormatOptions, TuningRequest, format_row};

use crate::adapter::{AyPatternConverter, PatternConverter};
use crate::error::{Result, SongError};
use crate::pattern::Pattern;
use crate::project::{AY_CHIP_TYPE, Project, Song};
use crate::render::{RenderSettings, SongRenderer};
use crate::schema::ay_schema;

/// Capabilities of one chip type.
pub trait ChipDescriptor: Send + Sync {
    /// Registry key (`"ay"`).
    fn chip_type(&self) -> &'static str;

    /// Display name.
    fn name(&self) -> &'static str;

    /// Field layout.
    fn schema(&self) -> &'static ChipSchema;

    /// Pattern converter.
    fn converter(&self) -> &dyn PatternConverter;

    /// Tuning table for a song's settings.
    fn resolve_tuning_table(&self, song: &Song) -> Vec<u16> {
        let request = TuningRequest {
            chip_frequency: song.chip_frequency,
            note_table: song.note_table,
        };
        (self.schema().resolve_tuning_table)(&request)
    }

    /// Renderer for one song of a project.
    fn create_renderer<'a>(
        &self,
        project: &'a Project,
        song_index: usize,
        settings: RenderSettings,
    ) -> Result<SongRenderer<'a>>;

    /// Tracker text of one pattern row.
    fn format_row(&self, pattern: &Pattern, row: usize, options: &FormatOptions) -> String {
        let generic = self.converter().to_generic(pattern);
        let pattern_row = generic.pattern_rows.get(row).cloned().unwrap_or_default();
        let channels: Vec<_> = generic
            .channels
            .iter()
            .map(|c| c.rows.get(row).cloned().unwrap_or_default())
            .collect();
        format_row(&pattern_row, &channels, row, self.schema(), options)
    }
}

/// AY-3-8910 / YM2149.
#[derive(Debug, Default)]
pub struct AyDescriptor {
    converter: AyPatternConverter,
}

impl ChipDescriptor for AyDescriptor {
    fn chip_type(&self) -> &'static str {
        AY_CHIP_TYPE
    }

    fn name(&self) -> &'static str {
        "AY-3-8910 / YM2149"
    }

    fn schema(&self) -> &'static ChipSchema {
        ay_schema()
    }

    fn converter(&self) -> &dyn PatternConverter {
        &self.converter
    }

    fn create_renderer<'a>(
        &self,
        project: &'a Project,
        song_index: usize,
        settings: RenderSettings,
    ) -> Result<SongRenderer<'a>> {
        SongRenderer::new(project, song_index, settings)
    }
}

fn registry() -> &'static [Box<dyn ChipDescriptor>] {
    static REGISTRY: OnceLock<Vec<Box<dyn ChipDescriptor>>> = OnceLock::new();
    REGISTRY.get_or_init(|| vec![Box::new(AyDescriptor::default())])
}

/// Looks up a chip descriptor by type key (case-insensitive).
pub fn get_chip_by_type(chip_type: &str) -> Option<&'static dyn ChipDescriptor> {
    registry()
        .iter()
        .find(|d| d.chip_type().eq_ignore_ascii_case(chip_type))
        .map(|d| d.as_ref())
}

/// Like [`get_chip_by_type`], but a missing descriptor is an error.
pub fn require_chip(chip_type: &str) -> Result<&'static dyn ChipDescriptor> {
    get_chip_by_type(chip_type).ok_or_else(|| SongError::UnknownChip(chip_type.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::{Note, NoteName};
    use bitphase_common::Effect;

    #[test]
    fn registry_lookup() {
        assert_eq!(get_chip_by_type("ay").map(|c| c.chip_type()), Some("ay"));
        assert!(get_chip_by_type("AY").is_some());
        assert!(get_chip_by_type("sid").is_none());
        assert!(matches!(require_chip("sid"), Err(SongError::UnknownChip(_))));
    }

    #[test]
    fn formats_a_row() {
        let chip = require_chip("ay").unwrap();
        let mut pattern = Pattern::new(0, 2, 3);
        let row = &mut pattern.channels[0].rows[1];
        row.note = Note::new(NoteName::CSharp, 4);
        row.instrument = 1;
        row.envelope_shape = 15;
        row.table = -1;
        row.volume = 15;
        row.effects[0] = Some(Effect::new(1, 1, 2));
        pattern.pattern_rows[1].noise_value = 0x1F;

        assert_eq!(
            chip.format_row(&pattern, 1, &FormatOptions::default()),
            "01|.... .... 1F|C#4 01F0F 1102|--- ..... ....|--- ..... ...."
        );
    }

    #[test]
    fn tuning_follows_chip_frequency() {
        let chip = require_chip("ay").unwrap();
        let mut song = Song::default();
        let spectrum = chip.resolve_tuning_table(&song);
        song.chip_frequency = 2_000_000;
        let atari = chip.resolve_tuning_table(&song);
        assert!(atari[45] > spectrum[45]);
    }
}
