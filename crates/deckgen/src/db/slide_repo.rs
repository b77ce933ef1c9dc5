//! Slide repository for the `slides` table.

use rusqlite::{params, Connection, Row};

use super::{now_timestamp, Database, DatabaseError};

/// A raw slide row from the database.
#[derive(Debug, Clone)]
pub struct SlideRow {
    pub id: i64,
    pub presentation_id: String,
    pub slide_number: i64,
    pub title: String,
    pub slide_type: String,
    /// Serialized body (bullets, visual suggestions, citation indices).
    pub content_json: String,
    pub speaker_notes: Option<String>,
    /// JSON array of image URLs.
    pub image_urls: String,
    pub chart_data: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl SlideRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            presentation_id: row.get("presentation_id")?,
            slide_number: row.get("slide_number")?,
            title: row.get("title")?,
            slide_type: row.get("slide_type")?,
            content_json: row.get("content_json")?,
            speaker_notes: row.get("speaker_notes")?,
            image_urls: row.get("image_urls")?,
            chart_data: row.get("chart_data")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Fields for a slide about to be inserted.
#[derive(Debug, Clone)]
pub struct NewSlide<'a> {
    pub presentation_id: &'a str,
    pub slide_number: i64,
    pub title: &'a str,
    pub slide_type: &'a str,
    pub content_json: &'a str,
    pub speaker_notes: Option<&'a str>,
    pub image_urls: &'a str,
}

/// Inserts a slide on the given connection (or open transaction).
pub fn insert_on(conn: &Connection, slide: &NewSlide<'_>) -> Result<i64, DatabaseError> {
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO slides (presentation_id, slide_number, title, slide_type, content_json,
         speaker_notes, image_urls, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            slide.presentation_id,
            slide.slide_number,
            slide.title,
            slide.slide_type,
            slide.content_json,
            slide.speaker_notes,
            slide.image_urls,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Lists the slides of a presentation in slide order.
pub fn list_for(db: &Database, presentation_id: &str) -> Result<Vec<SlideRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM slides WHERE presentation_id = ?1 ORDER BY slide_number ASC",
        )?;
        let rows = stmt
            .query_map(params![presentation_id], SlideRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Rewrites the text of a slide in place. Numbering and type are untouched.
pub fn update_text_on(
    conn: &Connection,
    id: i64,
    title: &str,
    content_json: &str,
    speaker_notes: Option<&str>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE slides SET title = ?2, content_json = ?3, speaker_notes = ?4, updated_at = ?5
         WHERE id = ?1",
        params![id, title, content_json, speaker_notes, now_timestamp()],
    )?;
    Ok(())
}

pub fn count_for(db: &Database, presentation_id: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM slides WHERE presentation_id = ?1",
            params![presentation_id],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_presentation() -> Database {
        let db = Database::open_in_memory().expect("Failed to create test database");
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO presentations (id, title, original_prompt, slide_count, created_at, updated_at)
                 VALUES ('p', 'T', 'T', 3, 'x', 'x')",
                [],
            )?;
            Ok(())
        })
        .unwrap();
        db
    }

    fn slide(number: i64, title: &str) -> NewSlide<'_> {
        NewSlide {
            presentation_id: "p",
            slide_number: number,
            title,
            slide_type: "content",
            content_json: r#"{"bullets":["a"]}"#,
            speaker_notes: Some("notes"),
            image_urls: "[]",
        }
    }

    #[test]
    fn test_list_is_ordered_by_number() {
        let db = db_with_presentation();
        db.with_tx(|tx| {
            insert_on(tx, &slide(2, "Second"))?;
            insert_on(tx, &slide(1, "First"))?;
            Ok(())
        })
        .unwrap();

        let slides = list_for(&db, "p").unwrap();
        let titles: Vec<&str> = slides.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second"]);
        assert_eq!(count_for(&db, "p").unwrap(), 2);
    }

    #[test]
    fn test_update_text_keeps_number() {
        let db = db_with_presentation();
        let id = db.with_conn(|conn| insert_on(conn, &slide(1, "Hello"))).unwrap();
        db.with_conn(|conn| update_text_on(conn, id, "Hola", r#"{"bullets":["b"]}"#, None))
            .unwrap();

        let slides = list_for(&db, "p").unwrap();
        assert_eq!(slides[0].title, "Hola");
        assert_eq!(slides[0].slide_number, 1);
        assert!(slides[0].speaker_notes.is_none());
    }

    #[test]
    fn test_duplicate_number_rejected() {
        let db = db_with_presentation();
        db.with_conn(|conn| insert_on(conn, &slide(1, "A"))).unwrap();
        assert!(db.with_conn(|conn| insert_on(conn, &slide(1, "B"))).is_err());
    }
}
