//! Error types for the cfdmesh library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for cfdmesh operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Malformed header line or numeric token
    #[error("Malformed input: {0}")]
    Format(String),

    /// Keyword, cell kind or attribute shape that is not implemented
    #[error("Unsupported section: {0}")]
    Unsupported(String),

    /// Unsupported container version tag
    #[error("Unsupported container version: {0}")]
    UnsupportedVersion(u32),

    /// End of input before a declared count was satisfied
    #[error("Truncated input at offset {offset}")]
    Truncated { offset: u64 },

    /// Cell or vertex reference outside the valid range
    #[error("Index {index} out of range (count: {count})")]
    IndexOutOfRange { index: usize, count: usize },

    /// Snapshot meshes disagree during a time-series combine
    #[error("Snapshot mismatch: {0}")]
    SnapshotMismatch(String),

    /// Submesh attribute dictionaries disagree at write time
    #[error("Attribute mismatch: {0}")]
    AttributeMismatch(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl Error {
    /// Create a malformed-input error from a message.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Create an unsupported-section error from a keyword or kind name.
    pub fn unsupported(what: impl Into<String>) -> Self {
        Self::Unsupported(what.into())
    }
}

/// Result type alias for cfdmesh operations.
pub type Result<T> = std::result::Result<T, Error>;
