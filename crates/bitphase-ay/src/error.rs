//! Error types for AY projects, persistence and simulation.

use bitphase_common::CommonError;
use thiserror::Error;

/// Result type for AY operations.
pub type Result<T> = std::result::Result<T, SongError>;

/// Errors that can occur when loading, validating or simulating a project.
#[derive(Error, Debug)]
pub enum SongError {
    /// The project has no songs.
    #[error("Project has no songs")]
    NoSongs,

    /// The song has no patterns or an empty pattern order.
    #[error("Song is empty")]
    EmptySong,

    /// Song index out of range.
    #[error("Song {index} out of range (0..{available})")]
    InvalidSong {
        /// Requested index.
        index: usize,
        /// Available songs.
        available: usize,
    },

    /// No chip descriptor is registered for this chip type.
    #[error("Unknown chip type '{0}'")]
    UnknownChip(String),

    /// A pattern-order entry does not resolve in a song.
    #[error("Pattern {pattern_id} (order slot {order_index}) missing from song {song_index}")]
    MissingPattern {
        /// Pattern id.
        pattern_id: usize,
        /// Order slot.
        order_index: usize,
        /// Song index.
        song_index: usize,
    },

    /// Structurally invalid pattern.
    #[error("Invalid pattern {id}: {msg}")]
    InvalidPattern {
        /// Pattern id.
        id: usize,
        /// Explanation.
        msg: String,
    },

    /// Work was cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,

    /// Error from the chip-agnostic layer.
    #[error(transparent)]
    Common(CommonError),

    /// Project JSON could not be read or written.
    #[error("Project JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SongError {
    /// Returns `true` when this error only signals cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SongError::Cancelled)
    }
}

impl From<CommonError> for SongError {
    fn from(err: CommonError) -> Self {
        match err {
            CommonError::Cancelled => SongError::Cancelled,
            other => SongError::Common(other),
        }
    }
}
