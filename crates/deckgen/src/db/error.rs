use std::path::PathBuf;
use thiserror::Error;

/// Failures of the SQLite store behind jobs, slides, logs and the cache.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Creating the database directory failed.
    #[error("Cannot prepare database location '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Migration {version} failed: {reason}")]
    Migration { version: u32, reason: String },

    /// Details, branding or cached payloads that do not (de)serialize.
    #[error("JSON column error: {0}")]
    Json(#[from] serde_json::Error),

    /// A writer panicked while holding the connection.
    #[error("Database connection lock poisoned")]
    LockPoisoned,
}
