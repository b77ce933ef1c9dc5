//! Narration audio repository for the `narration_audio` table.

use rusqlite::{params, Row};
use serde::Serialize;

use super::{now_timestamp, Database, DatabaseError};

/// One narrated slide.
#[derive(Debug, Clone, Serialize)]
pub struct AudioRow {
    pub id: i64,
    pub presentation_id: String,
    pub slide_number: i64,
    pub voice_type: String,
    pub audio_path: String,
    pub duration_secs: f64,
    pub file_size: i64,
    pub created_at: String,
}

impl AudioRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            presentation_id: row.get("presentation_id")?,
            slide_number: row.get("slide_number")?,
            voice_type: row.get("voice_type")?,
            audio_path: row.get("audio_path")?,
            duration_secs: row.get("duration_secs")?,
            file_size: row.get("file_size")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub fn insert(
    db: &Database,
    presentation_id: &str,
    slide_number: i64,
    voice_type: &str,
    audio_path: &str,
    duration_secs: f64,
    file_size: i64,
) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO narration_audio (presentation_id, slide_number, voice_type, audio_path,
             duration_secs, file_size, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                presentation_id,
                slide_number,
                voice_type,
                audio_path,
                duration_secs,
                file_size,
                now_timestamp(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

pub fn list_for(db: &Database, presentation_id: &str) -> Result<Vec<AudioRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM narration_audio WHERE presentation_id = ?1 ORDER BY slide_number ASC",
        )?;
        let rows = stmt
            .query_map(params![presentation_id], AudioRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
