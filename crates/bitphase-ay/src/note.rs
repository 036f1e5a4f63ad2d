//! Note values.

use serde::{Deserialize, Serialize};

/// Number of playable notes (C-1 .. B-8).
pub const NOTE_COUNT: usize = 96;

/// Highest octave the one-digit note text can carry.
pub const MAX_OCTAVE: u8 = 9;

/// Pitch class or one of the two sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NoteName {
    /// Empty cell.
    #[default]
    None,
    /// Key off.
    Off,
    /// C
    C,
    /// C#
    CSharp,
    /// D
    D,
    /// D#
    DSharp,
    /// E
    E,
    /// F
    F,
    /// F#
    FSharp,
    /// G
    G,
    /// G#
    GSharp,
    /// A
    A,
    /// A#
    ASharp,
    /// B
    B,
}

const PITCH_CLASSES: [NoteName; 12] = [
    NoteName::C,
    NoteName::CSharp,
    NoteName::D,
    NoteName::DSharp,
    NoteName::E,
    NoteName::F,
    NoteName::FSharp,
    NoteName::G,
    NoteName::GSharp,
    NoteName::A,
    NoteName::ASharp,
    NoteName::B,
];

const PITCH_TEXT: [&str; 12] = [
    "C-", "C#", "D-", "D#", "E-", "F-", "F#", "G-", "G#", "A-", "A#", "B-",
];

impl NoteName {
    /// Semitone within the octave, `None` for the sentinels.
    pub fn semitone(self) -> Option<usize> {
        PITCH_CLASSES.iter().position(|&n| n == self)
    }
}

/// A note cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Pitch class or sentinel.
    pub name: NoteName,
    /// Octave (1..=8 for playable notes).
    #[serde(default)]
    pub octave: u8,
}

impl Note {
    /// Empty note cell.
    pub fn none() -> Self {
        Self::default()
    }

    /// Key-off cell.
    pub fn off() -> Self {
        Self {
            name: NoteName::Off,
            octave: 0,
        }
    }

    /// Creates a note; the octave is clamped to [`MAX_OCTAVE`].
    pub fn new(name: NoteName, octave: u8) -> Self {
        Self {
            name,
            octave: octave.min(MAX_OCTAVE),
        }
    }

    /// Note from an index into the tuning table (0 = C-1).
    pub fn from_index(index: usize) -> Option<Self> {
        if index >= NOTE_COUNT {
            return None;
        }
        Some(Self::new(PITCH_CLASSES[index % 12], (index / 12 + 1) as u8))
    }

    /// Index into the tuning table, `None` for sentinels and out-of-range notes.
    pub fn index(&self) -> Option<usize> {
        let semitone = self.name.semitone()?;
        let octave = (self.octave as usize).checked_sub(1)?;
        let index = octave * 12 + semitone;
        (index < NOTE_COUNT).then_some(index)
    }

    /// Returns `true` for the empty cell.
    pub fn is_none(&self) -> bool {
        self.name == NoteName::None
    }

    /// Returns `true` for key off.
    pub fn is_off(&self) -> bool {
        self.name == NoteName::Off
    }

    /// Tracker text (`C-4`, `C#4`, `OFF`, `---`).
    pub fn to_text(&self) -> String {
        match self.name {
            NoteName::None => "---".to_string(),
            NoteName::Off => "OFF".to_string(),
            name => {
                let semitone = name.semitone().unwrap_or(0);
                format!("{}{}", PITCH_TEXT[semitone], self.octave.min(MAX_OCTAVE))
            }
        }
    }

    /// Parses tracker text; unknown text yields `None`.
    pub fn from_text(text: &str) -> Option<Self> {
        let text = text.trim().to_ascii_uppercase();
        match text.as_str() {
            "" | "---" => return Some(Self::none()),
            "OFF" | "R--" => return Some(Self::off()),
            _ => {}
        }
        if text.len() != 3 {
            return None;
        }
        let semitone = PITCH_TEXT.iter().position(|p| text.starts_with(p))?;
        let octave = text[2..].parse::<u8>().ok()?;
        Some(Self::new(PITCH_CLASSES[semitone], octave))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_round_trip() {
        for index in 0..NOTE_COUNT {
            let note = Note::from_index(index).unwrap();
            assert_eq!(note.index(), Some(index));
            assert_eq!(Note::from_text(&note.to_text()), Some(note));
        }
        assert_eq!(Note::from_index(96), None);
    }

    #[test]
    fn text_forms() {
        assert_eq!(Note::new(NoteName::CSharp, 4).to_text(), "C#4");
        assert_eq!(Note::from_text("a-4").unwrap().index(), Some(45));
        assert_eq!(Note::from_text("---"), Some(Note::none()));
        assert_eq!(Note::from_text("R--"), Some(Note::off()));
        assert_eq!(Note::from_text("H-4"), None);
        assert_eq!(Note::off().to_text(), "OFF");
        assert_eq!(Note::none().index(), None);
    }

    #[test]
    fn octave_is_clamped_not_wrapped() {
        let note = Note::new(NoteName::D, 12);
        assert_eq!(note.octave, MAX_OCTAVE);
        assert_eq!(note.to_text(), "D-9");
        assert_eq!(Note::from_text(&note.to_text()), Some(note));
    }
}
