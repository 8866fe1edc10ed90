//! Error types for designer operations.

use thiserror::Error;

/// Result type for designer operations.
pub type DesignerResult<T> = Result<T, DesignerError>;

/// Errors that can occur in designer operations.
#[derive(Debug, Error)]
pub enum DesignerError {
    /// Component not found in the design.
    #[error("Component not found: {0}")]
    ComponentNotFound(String),

    /// Invalid structural edit.
    #[error("Invalid operation on component: {0}")]
    InvalidOperation(String),

    /// Design serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from a [`crate::storage::HistoryStorage`] backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying I/O failure.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from importing or restoring history.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The document is not valid JSON or has the wrong shape.
    #[error("Invalid history document: {0}")]
    Parse(#[from] serde_json::Error),

    /// The cursor does not point into the imported entries.
    #[error("History cursor {index} out of range for {len} entries")]
    CursorOutOfRange {
        /// Cursor found in the document.
        index: i64,
        /// Number of entries in the document.
        len: usize,
    },

    /// The document was written by an incompatible version.
    #[error("Unsupported history version: {0}")]
    UnsupportedVersion(String),
}
