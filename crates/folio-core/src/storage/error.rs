//! Storage error handling
//!
//! SQLite failures are classified once, at the boundary, so callers can
//! match on a kind instead of inspecting message text.

use std::io;
use std::path::PathBuf;

use rusqlite::ffi;
use thiserror::Error;

use crate::models::ValidationError;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Input rejected before touching the database
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The full-text index reported corruption
    #[error("search index is corrupted: {0}")]
    SearchIndexCorrupt(#[source] rusqlite::Error),

    /// Any other SQLite failure, reported verbatim
    #[error("{0}")]
    Database(#[source] rusqlite::Error),

    /// The store failed to initialize for this worker
    #[error("database is not available")]
    Unavailable,

    /// Failed to create data directory
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to open the database file
    #[error("Failed to open database at '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
}

impl StoreError {
    /// Classify a SQLite error by its extended result code
    pub fn from_sqlite(error: rusqlite::Error) -> Self {
        match &error {
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.extended_code == ffi::SQLITE_CORRUPT_VTAB =>
            {
                StoreError::SearchIndexCorrupt(error)
            }
            _ => StoreError::Database(error),
        }
    }

    /// Whether a search index rebuild could clear this error
    pub fn is_index_corruption(&self) -> bool {
        matches!(self, StoreError::SearchIndexCorrupt(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        StoreError::from_sqlite(error)
    }
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;
