//! Generation log repository: append-only audit trail per presentation.

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use serde::Serialize;

use super::{format_timestamp, Database, DatabaseError};

/// A single generation log row.
#[derive(Debug, Clone, Serialize)]
pub struct LogRow {
    pub id: i64,
    pub presentation_id: String,
    pub step_name: String,
    pub status: String,
    pub start_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: String,
}

impl LogRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            presentation_id: row.get("presentation_id")?,
            step_name: row.get("step_name")?,
            status: row.get("status")?,
            start_time: row.get("start_time")?,
            end_time: row.get("end_time")?,
            duration_ms: row.get("duration_ms")?,
            details: row.get("details")?,
            error_message: row.get("error_message")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// A log event about to be appended.
#[derive(Debug, Clone)]
pub struct NewLogEntry<'a> {
    pub presentation_id: &'a str,
    pub step_name: &'a str,
    pub status: &'a str,
    /// When the step began. Terminal entries record end time and duration from it.
    pub started_at: DateTime<Utc>,
    pub details: Option<&'a serde_json::Value>,
    pub error_message: Option<&'a str>,
}

/// Appends a log row. Rows are never updated afterwards.
pub fn append(db: &Database, entry: &NewLogEntry<'_>) -> Result<i64, DatabaseError> {
    let now = Utc::now();
    let terminal = matches!(entry.status, "completed" | "failed");
    let (end_time, duration_ms) = if terminal {
        let elapsed = (now - entry.started_at).num_milliseconds().max(0);
        (Some(format_timestamp(now)), Some(elapsed))
    } else {
        (None, None)
    };
    let details = entry.details.map(serde_json::to_string).transpose()?;

    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO generation_logs (presentation_id, step_name, status, start_time,
             end_time, duration_ms, details, error_message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entry.presentation_id,
                entry.step_name,
                entry.status,
                format_timestamp(entry.started_at),
                end_time,
                duration_ms,
                details,
                entry.error_message,
                format_timestamp(now),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// Returns the most recent log rows for a presentation, newest first.
pub fn recent(
    db: &Database,
    presentation_id: &str,
    limit: u32,
) -> Result<Vec<LogRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM generation_logs WHERE presentation_id = ?1
             ORDER BY created_at DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![presentation_id, limit], LogRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Counts log rows of a presentation with the given step name.
pub fn count_step(
    db: &Database,
    presentation_id: &str,
    step_name: &str,
) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM generation_logs WHERE presentation_id = ?1 AND step_name = ?2",
            params![presentation_id, step_name],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}
