//! Search cache repository: hashed, expiring lookup results.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw cache row.
#[derive(Debug, Clone)]
pub struct CacheRow {
    pub query_hash: String,
    pub query_text: String,
    pub source_type: String,
    pub results_json: String,
    pub created_at: String,
    pub expires_at: String,
    pub hit_count: i64,
}

impl CacheRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            query_hash: row.get("query_hash")?,
            query_text: row.get("query_text")?,
            source_type: row.get("source_type")?,
            results_json: row.get("results_json")?,
            created_at: row.get("created_at")?,
            expires_at: row.get("expires_at")?,
            hit_count: row.get("hit_count")?,
        })
    }
}

/// Returns the entry for `query_hash` if it has not expired at `now`,
/// bumping its hit counter in the same transaction.
pub fn get_live(
    db: &Database,
    query_hash: &str,
    now: &str,
) -> Result<Option<CacheRow>, DatabaseError> {
    db.with_tx(|tx| {
        let mut stmt =
            tx.prepare("SELECT * FROM search_cache WHERE query_hash = ?1 AND expires_at > ?2")?;
        let mut rows = stmt.query_map(params![query_hash, now], CacheRow::from_row)?;
        let row = match rows.next() {
            Some(Ok(row)) => row,
            Some(Err(e)) => return Err(DatabaseError::Sqlite(e)),
            None => return Ok(None),
        };
        drop(rows);
        drop(stmt);

        tx.execute(
            "UPDATE search_cache SET hit_count = hit_count + 1 WHERE query_hash = ?1",
            params![query_hash],
        )?;
        Ok(Some(CacheRow {
            hit_count: row.hit_count + 1,
            ..row
        }))
    })
}

/// Inserts an entry, or overwrites payload and expiry of an existing one
/// and bumps its hit counter.
pub fn upsert(db: &Database, row: &CacheRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO search_cache (query_hash, query_text, source_type, results_json,
             created_at, expires_at, hit_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)
             ON CONFLICT(query_hash) DO UPDATE SET
               results_json = excluded.results_json,
               expires_at = excluded.expires_at,
               hit_count = hit_count + 1",
            params![
                row.query_hash,
                row.query_text,
                row.source_type,
                row.results_json,
                row.created_at,
                row.expires_at,
            ],
        )?;
        Ok(())
    })
}

/// Deletes entries of `source_type` whose expiry is before `cutoff`.
pub fn delete_expired_before(
    db: &Database,
    source_type: &str,
    cutoff: &str,
) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let deleted = conn.execute(
            "DELETE FROM search_cache WHERE source_type = ?1 AND expires_at < ?2",
            params![source_type, cutoff],
        )?;
        Ok(deleted as u64)
    })
}

/// Reads an entry regardless of expiry. Does not touch the hit counter.
pub fn peek(db: &Database, query_hash: &str) -> Result<Option<CacheRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM search_cache WHERE query_hash = ?1")?;
        let mut rows = stmt.query_map(params![query_hash], CacheRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(hash: &str, expires_at: &str) -> CacheRow {
        CacheRow {
            query_hash: hash.to_string(),
            query_text: "solar power".to_string(),
            source_type: "web".to_string(),
            results_json: "[]".to_string(),
            created_at: "2026-01-01T00:00:00.000000Z".to_string(),
            expires_at: expires_at.to_string(),
            hit_count: 1,
        }
    }

    #[test]
    fn test_live_hit_bumps_counter() {
        let db = Database::open_in_memory().unwrap();
        upsert(&db, &row("h", "2026-01-02T00:00:00.000000Z")).unwrap();

        let hit = get_live(&db, "h", "2026-01-01T12:00:00.000000Z")
            .unwrap()
            .unwrap();
        assert_eq!(hit.hit_count, 2);
        assert_eq!(peek(&db, "h").unwrap().unwrap().hit_count, 2);
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let db = Database::open_in_memory().unwrap();
        upsert(&db, &row("h", "2026-01-02T00:00:00.000000Z")).unwrap();

        assert!(get_live(&db, "h", "2026-01-03T00:00:00.000000Z")
            .unwrap()
            .is_none());
        assert_eq!(peek(&db, "h").unwrap().unwrap().hit_count, 1);
    }

    #[test]
    fn test_upsert_overwrites_payload() {
        let db = Database::open_in_memory().unwrap();
        upsert(&db, &row("h", "2026-01-02T00:00:00.000000Z")).unwrap();
        let mut newer = row("h", "2026-02-01T00:00:00.000000Z");
        newer.results_json = r#"[{"t":1}]"#.to_string();
        upsert(&db, &newer).unwrap();

        let stored = peek(&db, "h").unwrap().unwrap();
        assert_eq!(stored.results_json, r#"[{"t":1}]"#);
        assert_eq!(stored.expires_at, "2026-02-01T00:00:00.000000Z");
        assert_eq!(stored.hit_count, 2);
    }

    #[test]
    fn test_delete_expired_respects_namespace() {
        let db = Database::open_in_memory().unwrap();
        upsert(&db, &row("a", "2026-01-01T00:00:00.000000Z")).unwrap();
        let mut image = row("b", "2026-01-01T00:00:00.000000Z");
        image.source_type = "images".to_string();
        upsert(&db, &image).unwrap();

        let deleted = delete_expired_before(&db, "web", "2026-01-05T00:00:00.000000Z").unwrap();
        assert_eq!(deleted, 1);
        assert!(peek(&db, "a").unwrap().is_none());
        assert!(peek(&db, "b").unwrap().is_some());
    }
}
