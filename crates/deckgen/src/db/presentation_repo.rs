//! Presentation repository: CRUD and stage transitions for the `presentations` table.
//!
//! Stage updates issued by a running generation are conditional on the row not
//! being `failed`: a cancellation that lands between two stages is never
//! overwritten, and the caller learns about it from the returned `bool`.

use rusqlite::{params, Connection, Row};

use super::{now_timestamp, Database, DatabaseError};

/// A raw presentation row from the database.
#[derive(Debug, Clone)]
pub struct PresentationRow {
    pub id: String,
    pub title: String,
    pub original_prompt: String,
    pub status: String,
    pub progress: i64,
    pub current_step: Option<String>,
    pub slide_count: i64,
    pub theme: String,
    pub language: String,
    pub include_tts: bool,
    pub file_path: Option<String>,
    pub file_size: Option<i64>,
    pub generation_time: Option<i64>,
    pub error_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,
    pub branding_json: Option<String>,
}

impl PresentationRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            original_prompt: row.get("original_prompt")?,
            status: row.get("status")?,
            progress: row.get("progress")?,
            current_step: row.get("current_step")?,
            slide_count: row.get("slide_count")?,
            theme: row.get("theme")?,
            language: row.get("language")?,
            include_tts: row.get("include_tts")?,
            file_path: row.get("file_path")?,
            file_size: row.get("file_size")?,
            generation_time: row.get("generation_time")?,
            error_message: row.get("error_message")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            completed_at: row.get("completed_at")?,
            branding_json: row.get("branding_json")?,
        })
    }
}

/// Query filter parameters for presentation listing.
#[derive(Debug, Default, Clone)]
pub struct PresentationFilter {
    pub status: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Inserts a new presentation row.
pub fn insert(db: &Database, p: &PresentationRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO presentations (id, title, original_prompt, status, progress, current_step,
             slide_count, theme, language, include_tts, file_path, file_size, generation_time,
             error_message, created_at, updated_at, completed_at, branding_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            params![
                p.id,
                p.title,
                p.original_prompt,
                p.status,
                p.progress,
                p.current_step,
                p.slide_count,
                p.theme,
                p.language,
                p.include_tts,
                p.file_path,
                p.file_size,
                p.generation_time,
                p.error_message,
                p.created_at,
                p.updated_at,
                p.completed_at,
                p.branding_json,
            ],
        )?;
        Ok(())
    })
}

/// Finds a presentation by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<PresentationRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM presentations WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], PresentationRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Queries presentations newest-first, returning (rows, total_count).
pub fn query(
    db: &Database,
    filter: &PresentationFilter,
) -> Result<(Vec<PresentationRow>, u64), DatabaseError> {
    db.with_conn(|conn| {
        let mut conditions = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(ref status) = filter.status {
            conditions.push(format!("status = ?{}", param_values.len() + 1));
            param_values.push(Box::new(status.clone()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM presentations {}", where_clause);
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let total: u64 = conn.query_row(&count_sql, params_ref.as_slice(), |r| r.get(0))?;

        let limit = filter.limit.unwrap_or(50) as i64;
        let offset = filter.offset.unwrap_or(0) as i64;
        param_values.push(Box::new(limit));
        param_values.push(Box::new(offset));
        let query_sql = format!(
            "SELECT * FROM presentations {} ORDER BY created_at DESC, id LIMIT ?{} OFFSET ?{}",
            where_clause,
            param_values.len() - 1,
            param_values.len()
        );

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&query_sql)?;
        let rows: Vec<PresentationRow> = stmt
            .query_map(params_ref.as_slice(), PresentationRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((rows, total))
    })
}

/// Resets a presentation for a fresh run and moves it to `researching`.
///
/// Only `queued` and `failed` presentations can start a run. Clears the
/// previous artifact, error and timings, and deletes the slides, citations
/// and narration rows of any earlier run, all in one transaction. Returns
/// `false` if the row does not exist or is not startable.
pub fn begin_run(
    db: &Database,
    id: &str,
    progress: i64,
    step: &str,
) -> Result<bool, DatabaseError> {
    db.with_tx(|tx| {
        let changed = tx.execute(
            "UPDATE presentations SET status = 'researching', progress = ?2, current_step = ?3,
             error_message = NULL, completed_at = NULL, file_path = NULL, file_size = NULL,
             generation_time = NULL, updated_at = ?4
             WHERE id = ?1 AND status IN ('queued', 'failed')",
            params![id, progress, step, now_timestamp()],
        )?;
        if changed == 0 {
            return Ok(false);
        }
        tx.execute("DELETE FROM slides WHERE presentation_id = ?1", params![id])?;
        tx.execute("DELETE FROM citations WHERE presentation_id = ?1", params![id])?;
        tx.execute(
            "DELETE FROM narration_audio WHERE presentation_id = ?1",
            params![id],
        )?;
        Ok(true)
    })
}

/// Moves a presentation to a new stage unless it has been marked failed.
pub fn advance(
    db: &Database,
    id: &str,
    status: &str,
    progress: i64,
    step: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE presentations SET status = ?2, progress = ?3, current_step = ?4, updated_at = ?5
             WHERE id = ?1 AND status != 'failed'",
            params![id, status, progress, step, now_timestamp()],
        )?;
        Ok(changed > 0)
    })
}

/// Updates progress and step label within the current stage.
///
/// Takes a bare connection so it can share a transaction with the rows
/// written for the same slide.
pub fn update_progress_on(
    conn: &Connection,
    id: &str,
    progress: i64,
    step: &str,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE presentations SET progress = ?2, current_step = ?3, updated_at = ?4
         WHERE id = ?1 AND status != 'failed'",
        params![id, progress, step, now_timestamp()],
    )?;
    Ok(changed > 0)
}

/// Records the finished artifact and marks the presentation completed.
pub fn complete(
    db: &Database,
    id: &str,
    file_path: &str,
    file_size: i64,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let now = now_timestamp();
        let changed = conn.execute(
            "UPDATE presentations SET status = 'completed', progress = 100,
             current_step = 'Completed', file_path = ?2, file_size = ?3,
             completed_at = ?4, updated_at = ?4
             WHERE id = ?1 AND status != 'failed'",
            params![id, file_path, file_size, now],
        )?;
        Ok(changed > 0)
    })
}

/// Marks a presentation failed with the given message.
///
/// A completed presentation is left alone. Returns `false` if the row does
/// not exist or is already completed.
pub fn mark_failed(db: &Database, id: &str, message: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE presentations SET status = 'failed', error_message = ?2,
             completed_at = NULL, updated_at = ?3
             WHERE id = ?1 AND status != 'completed'",
            params![id, message, now_timestamp()],
        )?;
        Ok(changed > 0)
    })
}

/// Persists the wall-clock duration of the last run, in whole seconds.
pub fn set_generation_time(db: &Database, id: &str, seconds: i64) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE presentations SET generation_time = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, seconds, now_timestamp()],
        )?;
        Ok(())
    })
}

pub fn set_title(db: &Database, id: &str, title: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| set_title_on(conn, id, title))
}

pub fn set_title_on(conn: &Connection, id: &str, title: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE presentations SET title = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, title, now_timestamp()],
    )?;
    Ok(())
}

pub fn set_language_on(conn: &Connection, id: &str, language: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE presentations SET language = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, language, now_timestamp()],
    )?;
    Ok(())
}

/// Stores (or clears) the branding overrides applied at render time.
pub fn set_branding(
    db: &Database,
    id: &str,
    branding_json: Option<&str>,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE presentations SET branding_json = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, branding_json, now_timestamp()],
        )?;
        Ok(changed > 0)
    })
}
