//! Error types for archive export and import.

use std::io;

use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur while building or applying a configuration archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// An I/O error occurred while reading or writing archive data.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The zip container is damaged or not a zip file at all.
    #[error("archive container error: {0}")]
    Container(#[from] zip::result::ZipError),

    /// A serialization error occurred while writing the manifest.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The manifest could not be parsed.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// The archive is structurally invalid (missing manifest, inconsistent
    /// summary, ...).
    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    /// The package was produced by a newer schema than this importer
    /// understands.
    #[error("unsupported schema version {found} (this importer understands up to {supported})")]
    UnsupportedVersion {
        /// Version stamped in the manifest.
        found: u32,
        /// Newest version this importer accepts.
        supported: u32,
    },

    /// A record references another record that is not in the package.
    #[error("missing reference: {0}")]
    MissingReference(String),

    /// The backing store failed during export or import.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ArchiveError {
    /// Create a serialization error from a serde_json error.
    pub fn serialization(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }

    /// Create a deserialization error from a serde_json error.
    pub fn deserialization(err: serde_json::Error) -> Self {
        Self::Deserialization(err.to_string())
    }

    /// Create an invalid-archive error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArchive(msg.into())
    }

    /// Create a missing-reference error.
    pub fn missing_reference(msg: impl Into<String>) -> Self {
        Self::MissingReference(msg.into())
    }
}

/// A specialized `Result` type for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;
