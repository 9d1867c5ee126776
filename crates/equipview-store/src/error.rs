//! Error types for equipview-store.

use std::path::PathBuf;

/// Result type for equipview-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in equipview-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Timestamp outside the range the store can represent.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Serialization error for stored rows or stats.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The dataset's statistics had a NaN or infinite average; nothing was written.
    #[error("Statistics for {0} are not finite")]
    NonFiniteStats(String),

    /// A thread panicked while holding the store lock.
    #[error("Store lock poisoned")]
    LockPoisoned,

    /// The caller's deadline passed before the insert began; nothing was written.
    #[error("Deadline exceeded before insert")]
    DeadlineExceeded,
}
