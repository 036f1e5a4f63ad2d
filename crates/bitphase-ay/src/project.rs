//! Project, song, instrument and table types.

use std::collections::BTreeMap;

use bitphase_chip::{ChipVariant, DEFAULT_CHIP_CLOCK};
use bitphase_common::FRAME_RATE_PAL;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SongError};
use crate::pattern::Pattern;

/// Hardware channels of one AY chip.
pub const HARDWARE_CHANNELS: usize = 3;

/// Default song speed (ticks per row).
pub const DEFAULT_SPEED: u8 = 6;

/// Chip type key of AY/YM songs.
pub const AY_CHIP_TYPE: &str = "ay";

/// One step of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstrumentRow {
    /// Tone enabled in the mixer.
    pub tone: bool,
    /// Noise enabled in the mixer.
    pub noise: bool,
    /// Hardware envelope enabled.
    pub envelope: bool,
    /// Tone period offset.
    pub tone_add: i16,
    /// Keep the tone offset as new base.
    pub tone_accumulation: bool,
    /// Noise period offset, or envelope period offset when noise is off.
    pub noise_envelope_add: i8,
    /// Keep the noise/envelope offset as new base.
    pub noise_envelope_accumulation: bool,
    /// Amplitude (0..=15).
    pub volume: u8,
    /// Amplitude slide per step (-1, 0, +1).
    pub volume_slide: i8,
}

impl Default for InstrumentRow {
    fn default() -> Self {
        Self {
            tone: true,
            noise: false,
            envelope: false,
            tone_add: 0,
            tone_accumulation: false,
            noise_envelope_add: 0,
            noise_envelope_accumulation: false,
            volume: 15,
            volume_slide: 0,
        }
    }
}

/// Instrument (sample): a looping list of per-tick steps.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Instrument {
    /// Id referenced from rows (1..).
    pub id: u16,
    /// Display name.
    pub name: String,
    /// Steps.
    pub rows: Vec<InstrumentRow>,
    /// Step the instrument jumps back to after the last one.
    pub loop_point: usize,
}

/// Table (ornament): a looping list of semitone offsets.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Table {
    /// Id referenced from rows (1..).
    pub id: i32,
    /// Display name.
    pub name: String,
    /// Offsets.
    pub rows: Vec<i32>,
    /// Row the table jumps back to after the last one.
    pub loop_point: usize,
}

/// Position after advancing through a looping list of `len` entries.
pub(crate) fn next_looped(position: usize, len: usize, loop_point: usize) -> usize {
    if position + 1 < len {
        position + 1
    } else {
        loop_point.min(len.saturating_sub(1))
    }
}

fn default_chip_type() -> String {
    AY_CHIP_TYPE.to_string()
}

fn default_chip_frequency() -> u32 {
    DEFAULT_CHIP_CLOCK
}

fn default_interrupt_frequency() -> f64 {
    f64::from(FRAME_RATE_PAL)
}

fn default_speed() -> u8 {
    DEFAULT_SPEED
}

/// One chip's worth of patterns and settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    /// Patterns referenced by the project order.
    #[serde(default)]
    pub patterns: Vec<Pattern>,
    /// Tone periods indexed by note (C-1 = 0).
    #[serde(default)]
    pub tuning_table: Vec<u16>,
    /// Chip type key.
    #[serde(default = "default_chip_type")]
    pub chip_type: String,
    /// AY or YM amplitude curve.
    #[serde(default)]
    pub chip_variant: ChipVariant,
    /// Chip master clock in Hz.
    #[serde(default = "default_chip_frequency")]
    pub chip_frequency: u32,
    /// Player interrupt rate in Hz (ticks per second).
    #[serde(default = "default_interrupt_frequency")]
    pub interrupt_frequency: f64,
    /// Ticks per row at song start.
    #[serde(default = "default_speed")]
    pub initial_speed: u8,
    /// Note table selector carried over from imported modules.
    #[serde(default)]
    pub note_table: u8,
    /// Hardware channel index to virtual channel count (default 1).
    #[serde(default)]
    pub virtual_channel_map: BTreeMap<usize, usize>,
}

impl Default for Song {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            tuning_table: Vec::new(),
            chip_type: default_chip_type(),
            chip_variant: ChipVariant::default(),
            chip_frequency: DEFAULT_CHIP_CLOCK,
            interrupt_frequency: default_interrupt_frequency(),
            initial_speed: DEFAULT_SPEED,
            note_table: 0,
            virtual_channel_map: BTreeMap::new(),
        }
    }
}

impl Song {
    /// Virtual channel count of a hardware channel.
    pub fn virtual_channels(&self, hardware_channel: usize) -> usize {
        self.virtual_channel_map
            .get(&hardware_channel)
            .copied()
            .unwrap_or(1)
            .max(1)
    }

    /// Pattern channel count after virtual channel expansion.
    pub fn channel_count(&self) -> usize {
        (0..HARDWARE_CHANNELS)
            .map(|hw| self.virtual_channels(hw))
            .sum()
    }

    /// Hardware channel of every pattern channel.
    pub fn hardware_channel_of(&self) -> Vec<usize> {
        (0..HARDWARE_CHANNELS)
            .flat_map(|hw| std::iter::repeat_n(hw, self.virtual_channels(hw)))
            .collect()
    }

    /// Pattern by id.
    pub fn pattern(&self, id: usize) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.id == id)
    }

    /// Mutable pattern by id.
    pub fn pattern_mut(&mut self, id: usize) -> Option<&mut Pattern> {
        self.patterns.iter_mut().find(|p| p.id == id)
    }

    /// Replaces the pattern with the same id, or appends it.
    pub fn put_pattern(&mut self, pattern: Pattern) {
        match self.pattern_mut(pattern.id) {
            Some(slot) => *slot = pattern,
            None => self.patterns.push(pattern),
        }
    }
}

/// A complete project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Title.
    #[serde(default)]
    pub name: String,
    /// Author.
    #[serde(default)]
    pub author: String,
    /// One song per chip.
    #[serde(default)]
    pub songs: Vec<Song>,
    /// Pattern ids in playback order; ids may repeat.
    #[serde(default)]
    pub pattern_order: Vec<usize>,
    /// Tables shared by all songs.
    #[serde(default)]
    pub tables: Vec<Table>,
    /// Instruments shared by all songs.
    #[serde(default)]
    pub instruments: Vec<Instrument>,
    /// Display colors per order slot.
    #[serde(default)]
    pub pattern_order_colors: BTreeMap<usize, String>,
    /// Order slot playback loops back to.
    #[serde(default)]
    pub loop_point_id: usize,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            name: String::new(),
            author: String::new(),
            songs: vec![Song::default()],
            pattern_order: Vec::new(),
            tables: Vec::new(),
            instruments: Vec::new(),
            pattern_order_colors: BTreeMap::new(),
            loop_point_id: 0,
        }
    }
}

impl Project {
    /// Song by index.
    pub fn song(&self, index: usize) -> Result<&Song> {
        if self.songs.is_empty() {
            return Err(SongError::NoSongs);
        }
        self.songs.get(index).ok_or(SongError::InvalidSong {
            index,
            available: self.songs.len(),
        })
    }

    /// Instrument by id.
    pub fn instrument(&self, id: u16) -> Option<&Instrument> {
        self.instruments.iter().find(|i| i.id == id)
    }

    /// Table by id.
    pub fn table(&self, id: i32) -> Option<&Table> {
        self.tables.iter().find(|t| t.id == id)
    }

    /// Checks that every order entry resolves in every song.
    pub fn validate(&self) -> Result<()> {
        if self.songs.is_empty() {
            return Err(SongError::NoSongs);
        }
        for (song_index, song) in self.songs.iter().enumerate() {
            for (order_index, &pattern_id) in self.pattern_order.iter().enumerate() {
                if song.pattern(pattern_id).is_none() {
                    return Err(SongError::MissingPattern {
                        pattern_id,
                        order_index,
                        song_index,
                    });
                }
            }
            for pattern in &song.patterns {
                if pattern.pattern_rows.len() != pattern.length
                    || pattern.channels.iter().any(|c| c.rows.len() != pattern.length)
                {
                    return Err(SongError::InvalidPattern {
                        id: pattern.id,
                        msg: format!("row lists do not match length {}", pattern.length),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_channels_expand_channel_count() {
        let mut song = Song::default();
        assert_eq!(song.channel_count(), 3);
        song.virtual_channel_map.insert(1, 3);
        assert_eq!(song.channel_count(), 5);
        assert_eq!(song.hardware_channel_of(), vec![0, 1, 1, 1, 2]);
    }

    #[test]
    fn validate_reports_missing_patterns() {
        let mut project = Project::default();
        project.songs[0].patterns.push(Pattern::new(0, 4, 3));
        project.pattern_order = vec![0, 1];
        assert!(matches!(
            project.validate(),
            Err(SongError::MissingPattern { pattern_id: 1, order_index: 1, .. })
        ));
        project.pattern_order = vec![0, 0];
        assert!(project.validate().is_ok());
    }

    #[test]
    fn looping_positions() {
        assert_eq!(next_looped(0, 3, 1), 1);
        assert_eq!(next_looped(2, 3, 1), 1);
        assert_eq!(next_looped(0, 1, 0), 0);
        assert_eq!(next_looped(4, 5, 9), 4);
    }
}
