//! SQLite persistence for jobs, slides, citations, logs, narration and the
//! lookup cache.
//!
//! One `Database` handle wraps one rusqlite connection behind a mutex;
//! repositories are free functions over it.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, Transaction};

use crate::sanitize::redact_path;

pub mod audio_repo;
pub mod cache_repo;
pub mod citation_repo;
pub mod error;
pub mod log_repo;
pub mod migrations;
pub mod presentation_repo;
pub mod slide_repo;

pub use error::DatabaseError;

/// Shared handle to the store. Clones share the connection.
///
/// File databases run in WAL mode so status readers never see a
/// half-written stage.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens or creates the database file, creating its directory, and
    /// applies pending migrations.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let db = Self::prepare(conn)?;
        log::info!("Database ready: {}", redact_path(path));
        Ok(db)
    }

    /// Private in-memory store with the full schema.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> Result<Self, DatabaseError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::run_all(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Provides locked access to the underlying connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        f(&conn)
    }

    /// Runs `f` inside a single transaction. Commits when `f` returns `Ok`,
    /// rolls back (on drop) otherwise.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, DatabaseError>,
    {
        let mut conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}


/// Formats a timestamp as fixed-width RFC 3339 (microseconds, `Z` suffix).
///
/// Fixed width keeps lexical ordering in SQL identical to chronological order.
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current time in the stored timestamp format.
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}
