//! Citation repository for the `citations` table.

use rusqlite::{params, Connection, Row};

use super::{Database, DatabaseError};

/// A raw citation row from the database.
#[derive(Debug, Clone)]
pub struct CitationRow {
    pub id: i64,
    pub presentation_id: String,
    pub citation_number: i64,
    pub slide_number: Option<i64>,
    pub source_type: String,
    pub title: String,
    pub url: String,
    pub author: Option<String>,
    pub publication_date: Option<String>,
    pub accessed_date: String,
    pub description: Option<String>,
}

impl CitationRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            presentation_id: row.get("presentation_id")?,
            citation_number: row.get("citation_number")?,
            slide_number: row.get("slide_number")?,
            source_type: row.get("source_type")?,
            title: row.get("title")?,
            url: row.get("url")?,
            author: row.get("author")?,
            publication_date: row.get("publication_date")?,
            accessed_date: row.get("accessed_date")?,
            description: row.get("description")?,
        })
    }
}

/// Fields for a citation about to be inserted.
#[derive(Debug, Clone)]
pub struct NewCitation<'a> {
    pub presentation_id: &'a str,
    pub citation_number: i64,
    pub slide_number: i64,
    pub source_type: &'a str,
    pub title: &'a str,
    pub url: &'a str,
    pub accessed_date: &'a str,
    pub description: Option<&'a str>,
}

/// Inserts a citation on the given connection (or open transaction).
pub fn insert_on(conn: &Connection, c: &NewCitation<'_>) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO citations (presentation_id, citation_number, slide_number, source_type,
         title, url, accessed_date, description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            c.presentation_id,
            c.citation_number,
            c.slide_number,
            c.source_type,
            c.title,
            c.url,
            c.accessed_date,
            c.description,
        ],
    )?;
    Ok(())
}

/// Lists the citations of a presentation ordered by citation number.
pub fn list_for(db: &Database, presentation_id: &str) -> Result<Vec<CitationRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM citations WHERE presentation_id = ?1 ORDER BY citation_number ASC",
        )?;
        let rows = stmt
            .query_map(params![presentation_id], CitationRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
