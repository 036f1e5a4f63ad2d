//! Error types for module import.

use bitphase_ay::SongError;
use thiserror::Error;

/// Result type for import operations.
pub type Result<T> = std::result::Result<T, FormatError>;

/// Errors that can occur while importing PT3 or VT2 modules.
#[derive(Error, Debug)]
pub enum FormatError {
    /// The buffer does not start with a known module signature.
    #[error("Invalid module header: '{preview}'")]
    InvalidHeader {
        /// First bytes of the buffer, non-printable bytes replaced by `.`.
        preview: String,
    },

    /// The buffer ended inside a structure.
    #[error("Unexpected end of data at offset 0x{offset:04X}")]
    UnexpectedEof {
        /// Offset of the first missing byte.
        offset: usize,
    },

    /// A pointer table entry points outside the buffer.
    #[error("Pointer at offset 0x{offset:04X} points outside the module (0x{pointer:04X})")]
    PointerOutOfRange {
        /// Offset of the pointer field.
        offset: usize,
        /// Pointer value.
        pointer: usize,
    },

    /// An unknown or malformed `[Section]` header.
    #[error("Invalid section '{name}' at line {line}")]
    InvalidSection {
        /// 1-based line number.
        line: usize,
        /// Section text.
        name: String,
    },

    /// A value inside a section could not be parsed.
    #[error("Invalid value at line {line}: {message}")]
    InvalidValue {
        /// 1-based line number.
        line: usize,
        /// Explanation.
        message: String,
    },

    /// The module has no playable content.
    #[error("Module has no patterns or an empty play order")]
    EmptyModule,

    /// The file type could not be determined.
    #[error("Unrecognized module format")]
    UnknownFormat,

    /// The imported project failed validation.
    #[error(transparent)]
    Project(#[from] SongError),
}

/// Printable-ASCII rendering of untrusted header bytes.
pub(crate) fn sanitize_preview(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if (0x20..0x7F).contains(&b) { b as char } else { '.' })
        .collect()
}
