//! Versioned schema migrations, embedded from `sql/`.
//!
//! Applied versions are recorded in `_migrations`. `ADD COLUMN` migrations
//! are skipped when the column is already present.

use rusqlite::Connection;

use super::error::DatabaseError;

struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
    kind: MigrationKind,
}

enum MigrationKind {
    Standard,
    /// `ALTER TABLE .. ADD COLUMN`, skipped when the column exists.
    AddColumn {
        table: &'static str,
        column: &'static str,
    },
}

/// In version order.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create_presentations_table",
        sql: include_str!("sql/001_create_presentations.sql"),
        kind: MigrationKind::Standard,
    },
    Migration {
        version: 2,
        description: "create_slides_table",
        sql: include_str!("sql/002_create_slides.sql"),
        kind: MigrationKind::Standard,
    },
    Migration {
        version: 3,
        description: "create_citations_table",
        sql: include_str!("sql/003_create_citations.sql"),
        kind: MigrationKind::Standard,
    },
    Migration {
        version: 4,
        description: "create_generation_logs_table",
        sql: include_str!("sql/004_create_generation_logs.sql"),
        kind: MigrationKind::Standard,
    },
    Migration {
        version: 5,
        description: "create_search_cache_table",
        sql: include_str!("sql/005_create_search_cache.sql"),
        kind: MigrationKind::Standard,
    },
    Migration {
        version: 6,
        description: "create_narration_audio_table",
        sql: include_str!("sql/006_create_narration_audio.sql"),
        kind: MigrationKind::Standard,
    },
    Migration {
        version: 7,
        description: "add_branding_to_presentations",
        sql: include_str!("sql/007_add_branding_to_presentations.sql"),
        kind: MigrationKind::AddColumn {
            table: "presentations",
            column: "branding_json",
        },
    },
];

/// Applies every migration newer than the recorded version.
///
/// Each migration commits together with its `_migrations` row.
pub fn run_all(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let applied: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |r| r.get(0),
    )?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > applied) {
        let needed = match &migration.kind {
            MigrationKind::Standard => true,
            MigrationKind::AddColumn { table, column } => !column_exists(conn, table, column)?,
        };

        let tx = conn.unchecked_transaction()?;
        if needed {
            log::info!("Applying migration v{} ({})", migration.version, migration.description);
            tx.execute_batch(migration.sql)
                .map_err(|e| DatabaseError::Migration {
                    version: migration.version,
                    reason: e.to_string(),
                })?;
        } else {
            log::info!("Migration v{} already reflected in schema", migration.version);
        }
        tx.execute(
            "INSERT INTO _migrations (version, description) VALUES (?1, ?2)",
            rusqlite::params![migration.version, migration.description],
        )?;
        tx.commit()?;
    }

    Ok(())
}

/// Checks whether a column exists on a table using `PRAGMA table_info`.
fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool, DatabaseError> {
    if !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(DatabaseError::Migration {
            version: 0,
            reason: format!("Invalid table name: {}", table),
        });
    }
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let exists = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .any(|r| r.map(|name| name == column).unwrap_or(false));
    Ok(exists)
}
