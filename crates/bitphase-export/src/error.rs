//! Error types for export.

use bitphase_ay::SongError;
use thiserror::Error;

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Errors that can occur while rendering or writing an export.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The caller cancelled the export.
    #[error("Export cancelled")]
    Cancelled,

    /// The requested sample rate is not one of the supported rates.
    #[error("Unsupported sample rate {0} Hz")]
    UnsupportedSampleRate(u32),

    /// The requested bit depth is not 16, 24 or 32.
    #[error("Unsupported bit depth {0}")]
    UnsupportedBitDepth(u16),

    /// The project could not be simulated.
    #[error(transparent)]
    Song(SongError),

    /// Output could not be written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The per-channel archive could not be built.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl ExportError {
    /// Returns `true` when this error only signals cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExportError::Cancelled)
    }
}

impl From<SongError> for ExportError {
    fn from(err: SongError) -> Self {
        if err.is_cancelled() {
            ExportError::Cancelled
        } else {
            ExportError::Song(err)
        }
    }
}

impl From<bitphase_common::CommonError> for ExportError {
    fn from(err: bitphase_common::CommonError) -> Self {
        SongError::from(err).into()
    }
}
