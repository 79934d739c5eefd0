//! Error types for the archive file catalog.
//!
//! Errors are organized by stage so that callers can decide per file whether to
//! skip it (unsupported input), mark it unreadable (I/O), or stop (catalog
//! integrity violations coming from their own bookkeeping).

use std::path::PathBuf;
use thiserror::Error;

use crate::model::{ContentDigest, FileId, ObjectId, RootId};

/// Top-level error type for catalog operations.
#[derive(Error, Debug)]
pub enum FiledbError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Format identification and extraction errors
    #[error("Identification error: {0}")]
    Identify(#[from] IdentifyError),

    /// Identity and dedup model violations
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Per-file failures of the digest engine and the format reader chain.
#[derive(Error, Debug)]
pub enum IdentifyError {
    /// No reader in the chain could open the file.
    #[error("Unsupported file {path}: {last_error}")]
    Unsupported { path: PathBuf, last_error: String },

    /// The file could not be read (permissions, truncation, device failure).
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl IdentifyError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The path the failure refers to.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Unsupported { path, .. } | Self::Io { path, .. } => path,
        }
    }

    /// True when the caller should record the file as `cannot_read` rather than skip it.
    pub fn is_unreadable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

/// Integrity violations of the Files/Objects/Paths/Roots graph.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Root not found: {0}")]
    RootNotFound(RootId),

    #[error("Root {0} still has objects")]
    RootInUse(RootId),

    #[error("Object not found: {0}")]
    ObjectNotFound(ObjectId),

    #[error("Object {bdrc_id} already exists in root {root}")]
    DuplicateObject { bdrc_id: String, root: RootId },

    #[error("File not found: {0}")]
    FileNotFound(FileId),

    #[error("File {0} is still referenced by {1} path(s)")]
    FileInUse(FileId, usize),

    #[error("File {file} already has a {existing} info record")]
    InfoConflict { file: FileId, existing: &'static str },

    #[error("Persistent id {0} is already assigned")]
    DuplicatePersistentId(ContentDigest),

    #[error("Invalid {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
}

/// Convenience type alias for catalog results.
pub type Result<T> = std::result::Result<T, FiledbError>;

/// Convenience type alias for per-file identification results.
pub type IdentifyResult<T> = std::result::Result<T, IdentifyError>;
