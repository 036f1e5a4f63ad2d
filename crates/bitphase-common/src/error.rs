//! Error types shared by the chip-agnostic layer.

use thiserror::Error;

/// Result type for pattern model operations.
pub type Result<T> = std::result::Result<T, CommonError>;

/// Errors raised by schema validation, cancellation and resource loading.
#[derive(Error, Debug)]
pub enum CommonError {
    /// A row referenced a field the active schema does not declare.
    #[error("unknown field '{field}' for chip schema '{chip}'")]
    UnknownField {
        /// Field name that was rejected.
        field: String,
        /// Chip type of the schema.
        chip: String,
    },

    /// A value does not fit the declared field type.
    #[error("field '{field}' expects {expected} value")]
    TypeMismatch {
        /// Field name.
        field: String,
        /// Expected kind.
        expected: &'static str,
    },

    /// A template placeholder does not resolve to a declared field.
    #[error("template placeholder '{{{placeholder}}}' has no matching field")]
    InvalidTemplate {
        /// Placeholder name.
        placeholder: String,
    },

    /// Generic pattern row counts disagree with its length.
    #[error("pattern {id}: {msg}")]
    InconsistentPattern {
        /// Pattern id.
        id: usize,
        /// Explanation.
        msg: String,
    },

    /// Work was abandoned because the caller cancelled it.
    #[error("operation cancelled")]
    Cancelled,

    /// A resource could not be loaded.
    #[error("failed to load resource '{url}': {source}")]
    Resource {
        /// Requested location.
        url: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

impl CommonError {
    /// Returns `true` when this error only signals cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CommonError::Cancelled)
    }
}
