//! PT3 and Vortex Tracker II import for the bitphase tracker.
//!
//! The import pipeline runs in three steps:
//! - binary PT3 modules are decoded by [`parse_pt3`]
//! - decoded modules pass through VT2 text ([`write_vt2`] / [`parse_vt2`]),
//!   the same path `.vt2`/`.txt` modules take
//! - [`modules_to_project`] builds a [`Project`](bitphase_ay::Project),
//!   merging TurboSound files into a two-song project
//!
//! Malformed input fails as a whole; nothing is partially imported.
//!
//! # Example
//!
//! ```
//! use bitphase_formats::import_vt2;
//!
//! let text = "[Module]\nTitle=demo\nSpeed=4\nPlayOrder=L0\n\n[Pattern0]\n....|..|C-4 .... ....|--- .... ....|--- .... ....\n";
//! let project = import_vt2(text).unwrap();
//! assert_eq!(project.name, "demo");
//! assert_eq!(project.songs[0].initial_speed, 4);
//! assert_eq!(project.pattern_order, vec![0]);
//! ```

#![warn(missing_docs)]

pub mod convert;
pub mod error;
pub mod pt3;
pub mod vt2;

use std::path::Path;

use bitphase_ay::Project;
use tracing::debug;

// Re-export public API (explicit, no star exports)
pub use convert::modules_to_project;
pub use error::{FormatError, Result};
pub use pt3::{is_pt3, parse_pt3};
pub use vt2::{Vt2Module, parse_vt2, write_module, write_vt2};

/// Module file types the importer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleFormat {
    /// ProTracker 3 binary.
    Pt3,
    /// Vortex Tracker II text.
    Vt2,
}

impl ModuleFormat {
    /// Detects the format from content, falling back to the file extension.
    pub fn detect(data: &[u8], extension: Option<&str>) -> Option<Self> {
        if is_pt3(data) {
            return Some(Self::Pt3);
        }
        let text = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
        if text.trim_ascii_start().starts_with(b"[Module]") {
            return Some(Self::Vt2);
        }
        match extension.map(str::to_ascii_lowercase).as_deref() {
            Some("pt3") => Some(Self::Pt3),
            Some("vt2") | Some("txt") => Some(Self::Vt2),
            _ => None,
        }
    }
}

/// Imports a PT3 module (TurboSound files become two songs).
pub fn import_pt3(data: &[u8]) -> Result<Project> {
    let decoded = parse_pt3(data)?;
    let text = write_vt2(&decoded);
    debug!(bytes = text.len(), "PT3 converted to VT2 text");
    modules_to_project(&parse_vt2(&text)?)
}

/// Imports Vortex Tracker II text.
pub fn import_vt2(text: &str) -> Result<Project> {
    modules_to_project(&parse_vt2(text)?)
}

/// Imports a module of either format.
pub fn import_module(data: &[u8], extension: Option<&str>) -> Result<Project> {
    match ModuleFormat::detect(data, extension).ok_or(FormatError::UnknownFormat)? {
        ModuleFormat::Pt3 => import_pt3(data),
        ModuleFormat::Vt2 => import_vt2(&String::from_utf8_lossy(data)),
    }
}

/// Reads and imports a module file.
pub fn import_file(path: impl AsRef<Path>) -> Result<Project> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(bitphase_ay::SongError::from)?;
    let extension = path.extension().and_then(|e| e.to_str());
    import_module(&data, extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pt3::tests::build_module;

    #[test]
    fn detects_formats() {
        assert_eq!(ModuleFormat::detect(b"ProTracker 3.5 compilation", None), Some(ModuleFormat::Pt3));
        assert_eq!(ModuleFormat::detect(b"\n[Module]\nTitle=x", None), Some(ModuleFormat::Vt2));
        assert_eq!(ModuleFormat::detect(b"garbage", Some("PT3")), Some(ModuleFormat::Pt3));
        assert_eq!(ModuleFormat::detect(b"garbage", None), None);
        assert!(matches!(
            import_module(b"garbage", None),
            Err(FormatError::UnknownFormat)
        ));
    }

    #[test]
    fn pt3_extension_with_bad_magic_reports_header() {
        assert!(matches!(
            import_module(b"MThd\x00\x00\x00\x06", Some("pt3")),
            Err(FormatError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn pt3_imports_through_text() {
        let a: &[u8] = &[0xF0, 0x02, 0xCC, 0x50 + 36, 0xC0, 0x00];
        let data = build_module("Through text", &[0, 0], [a, &[0xD0, 0xD0], &[0xD0, 0xD0]]);
        let project = import_pt3(&data).unwrap();
        assert_eq!(project.name, "Through text");
        assert_eq!(project.pattern_order, vec![0, 0]);
        let pattern = project.songs[0].pattern(0).unwrap();
        assert_eq!(pattern.length, 2);
        let row = &pattern.channels[0].rows[0];
        assert_eq!(row.note.index(), Some(36));
        assert_eq!(row.instrument, 1);
        assert_eq!(row.table, bitphase_ay::TABLE_OFF);
        assert_eq!(row.volume, 12);
        assert_eq!(row.envelope_shape, 15);
        assert!(pattern.channels[0].rows[1].note.is_off());
        assert_eq!(project.instruments.len(), 1);
        assert!(project.tables.is_empty());
    }
}
