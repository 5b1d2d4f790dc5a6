//! Error types for SVX conversion

use thiserror::Error;

/// Main error type for conversion operations
#[derive(Error, Debug)]
pub enum SvxError {
    #[error("Cannot open archive {path}: {reason}")]
    ArchiveOpen { path: String, reason: String },

    #[error("Manifest not found in archive")]
    ManifestNotFound,

    #[error("Error reading manifest XML: {0}")]
    ManifestParse(String),

    #[error("Slice not found in archive: {0}")]
    SliceNotFound(String),

    #[error("Not a PNG file: {0}")]
    NotAnImage(String),

    #[error("Error decoding slice {name}: {reason}")]
    Decode { name: String, reason: String },

    #[error("Error writing grid file {path}: {reason}")]
    Write { path: String, reason: String },

    #[error("Invalid slice name pattern {pattern:?}: {reason}")]
    InvalidSlicePattern { pattern: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Decompression error: {0}")]
    Decompression(String),

    #[error("Invalid grid file: {0}")]
    InvalidFormat(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl SvxError {
    pub(crate) fn write(path: &std::path::Path, reason: impl ToString) -> Self {
        SvxError::Write {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Specialized Result type for conversion operations
pub type Result<T> = std::result::Result<T, SvxError>;

impl From<bincode::Error> for SvxError {
    fn from(err: bincode::Error) -> Self {
        SvxError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for SvxError {
    fn from(err: serde_json::Error) -> Self {
        SvxError::Serialization(err.to_string())
    }
}
