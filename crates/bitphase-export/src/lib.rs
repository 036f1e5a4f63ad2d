//! WAV and PSG export for bitphase tracker projects.
//!
//! Songs are simulated tick by tick and clocked through the AY emulator at
//! 44.1 kHz, then resampled to the requested rate. Multi-song (TurboSound)
//! projects are mixed into one stereo stream, or split into one mono WAV
//! per song and hardware channel inside a zip archive. PSG export dumps the
//! register frames of a single song.
//!
//! Exports report progress through a [`ProgressSink`](bitphase_common::ProgressSink)
//! and stop at the next safe point once their
//! [`CancellationToken`](bitphase_common::CancellationToken) is triggered.
//!
//! # Example
//!
//! ```
//! use bitphase_ay::{Note, NoteName, Pattern, Project, equal_tempered_table};
//! use bitphase_common::{CancellationToken, NoProgress};
//! use bitphase_export::{ArtifactKind, WavExportOptions, export_wav};
//!
//! let mut project = Project::default();
//! let mut pattern = Pattern::new(0, 4, 3);
//! pattern.channels[0].rows[0].note = Note::new(NoteName::C, 4);
//! project.songs[0].patterns.push(pattern);
//! project.songs[0].tuning_table = equal_tempered_table(1_773_400);
//! project.pattern_order = vec![0];
//!
//! let options = WavExportOptions::default().with_sample_rate(22_050);
//! let artifact = export_wav(&project, &options, &mut NoProgress, &CancellationToken::new()).unwrap();
//! assert_eq!(artifact.kind, ArtifactKind::Wav);
//! assert_eq!(&artifact.bytes[..4], b"RIFF");
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod pipeline;
pub mod psg;
pub mod resample;
pub mod wav;

// Re-export public API (explicit, no star exports)
pub use error::{ExportError, Result};
pub use pipeline::{
    ArtifactKind, ChannelMode, ExportArtifact, PsgExportOptions, WavExportOptions, export_psg,
    export_wav, write_artifact,
};
pub use psg::{PsgEncoder, encode_psg};
pub use resample::resample_linear;
pub use wav::{BitDepth, WavMetadata, WavSpec, encode_wav, write_wav};
