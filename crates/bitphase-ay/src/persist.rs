//! `.btp` project files.
//!
//! A `.btp` file is gzip-compressed project JSON. Plain JSON is accepted on
//! load. Songs without a tuning table receive the schema default.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tracing::debug;

use crate::chip::require_chip;
use crate::error::Result;
use crate::project::Project;

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Serializes a project to compressed `.btp` bytes.
pub fn save_project(project: &Project) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(project)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    Ok(encoder.finish()?)
}

/// Parses `.btp` bytes (or plain JSON) into a project.
pub fn load_project(data: &[u8]) -> Result<Project> {
    let mut project: Project = if data.starts_with(&GZIP_MAGIC) {
        let mut json = Vec::new();
        GzDecoder::new(data).read_to_end(&mut json)?;
        serde_json::from_slice(&json)?
    } else {
        serde_json::from_slice(data)?
    };
    apply_defaults(&mut project)?;
    Ok(project)
}

/// Fills values older files omit and pads row lists to their lengths.
pub fn apply_defaults(project: &mut Project) -> Result<()> {
    for (index, song) in project.songs.iter_mut().enumerate() {
        if song.tuning_table.is_empty() {
            let chip = require_chip(&song.chip_type)?;
            song.tuning_table = chip.schema().default_tuning_table.clone();
            debug!(song = index, "filled missing tuning table");
        }
        for pattern in &mut song.patterns {
            pattern.normalize();
        }
    }
    Ok(())
}

/// Reads a project file.
pub fn read_project_file(path: impl AsRef<Path>) -> Result<Project> {
    let data = fs::read(path)?;
    load_project(&data)
}

/// Writes a project file atomically next to its destination.
pub fn write_project_file(path: impl AsRef<Path>, project: &Project) -> Result<()> {
    let path = path.as_ref();
    let bytes = save_project(project)?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(&bytes)?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Pattern;
    use crate::tuning::equal_tempered_table;

    fn project() -> Project {
        let mut project = Project::default();
        project.name = "demo".into();
        project.songs[0].patterns.push(Pattern::new(0, 8, 3));
        project.pattern_order = vec![0];
        project
    }

    #[test]
    fn gzip_round_trip_fills_tuning_table() {
        let bytes = save_project(&project()).unwrap();
        assert_eq!(&bytes[..2], &GZIP_MAGIC);
        let loaded = load_project(&bytes).unwrap();
        assert_eq!(loaded.name, "demo");
        assert_eq!(loaded.songs[0].tuning_table, equal_tempered_table(1_773_400));
        assert_eq!(loaded.songs[0].patterns[0], Pattern::new(0, 8, 3));
    }

    #[test]
    fn plain_json_with_missing_fields() {
        let json = br#"{
            "name": "old",
            "songs": [{ "patterns": [{ "id": 0, "length": 2, "channels": [{ "rows": [] }] }] }],
            "patternOrder": [0]
        }"#;
        let project = load_project(json).unwrap();
        let song = &project.songs[0];
        assert_eq!(song.chip_type, "ay");
        assert_eq!(song.initial_speed, 6);
        assert_eq!(song.patterns[0].channels[0].rows.len(), 2);
        assert_eq!(song.patterns[0].pattern_rows.len(), 2);
    }

    #[test]
    fn unknown_chip_type_is_rejected() {
        let json = br#"{ "songs": [{ "chipType": "sid" }] }"#;
        assert!(matches!(
            load_project(json),
            Err(crate::SongError::UnknownChip(t)) if t == "sid"
        ));
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.btp");
        write_project_file(&path, &project()).unwrap();
        assert_eq!(read_project_file(&path).unwrap().pattern_order, vec![0]);
    }
}
