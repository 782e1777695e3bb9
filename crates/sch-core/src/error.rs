//! Error types for sch-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sch-core
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to open or read an input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to open the schema store
    #[error("failed to open schema store '{path}': {source}")]
    StoreOpen {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A bulk load was rejected and rolled back; the store keeps its prior contents
    #[error("failed to write schema store: {reason}")]
    StoreWrite {
        reason: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    /// Snapshot metadata that cannot be interpreted
    #[error("unreadable snapshot metadata '{key}': {value:?}")]
    SnapshotMeta { key: String, value: String },

    /// A loaded report breaks the record invariants
    #[error("invalid report record {index}: {reason}")]
    InvalidReport { index: usize, reason: String },

    /// Store query error
    #[error("schema store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Unsupported export format
    #[error("unknown format '{0}', supported formats: json, csv")]
    UnknownFormat(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writer error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub(crate) fn store_write(reason: impl Into<String>, source: rusqlite::Error) -> Self {
        Error::StoreWrite {
            reason: reason.into(),
            source: Some(source),
        }
    }
}
