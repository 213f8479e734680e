//! SQLite schema definition, migrations and integrity checks.

use rusqlite::Connection;
use thiserror::Error;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

const REQUIRED_TABLES: &[&str] = &["files", "headings", "heading_tags", "links", "metadata"];

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Schema version {found} is newer than supported {supported}")]
    VersionTooNew { found: i32, supported: i32 },

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

/// Initialize or migrate the database schema.
pub fn init_schema(conn: &Connection) -> Result<(), SchemaError> {
    let version = get_schema_version(conn)?;

    if version == 0 {
        // Fresh database - create all tables
        create_schema_v1(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if version < SCHEMA_VERSION {
        // Run migrations
        migrate(conn, version)?;
    } else if version > SCHEMA_VERSION {
        return Err(SchemaError::VersionTooNew {
            found: version,
            supported: SCHEMA_VERSION,
        });
    }

    Ok(())
}

/// Read the recorded schema version, 0 when the metadata table is
/// missing or carries no entry.
pub fn get_schema_version(conn: &Connection) -> Result<i32, SchemaError> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='metadata'",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;

    Ok(version.and_then(|v| v.parse().ok()).unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), SchemaError> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value, updated_at)
         VALUES ('schema_version', ?1, strftime('%s', 'now'))",
        [version.to_string()],
    )?;
    Ok(())
}

fn create_schema_v1(conn: &Connection) -> Result<(), SchemaError> {
    conn.execute_batch(
        r#"
        -- Key/value bookkeeping, including schema_version
        CREATE TABLE metadata (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );

        -- Files table: one row per indexed document
        CREATE TABLE files (
            uri TEXT PRIMARY KEY,
            title TEXT,
            properties TEXT NOT NULL DEFAULT '{}',
            tags TEXT NOT NULL DEFAULT '[]',
            hash TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE INDEX idx_files_hash ON files(hash);
        CREATE INDEX idx_files_updated ON files(updated_at);

        -- Headings: replaced wholesale per file on reindex.
        -- id holds only explicit :ID:/:CUSTOM_ID: values; synthesized
        -- keys are computed, never stored.
        CREATE TABLE headings (
            file_uri TEXT NOT NULL REFERENCES files(uri) ON DELETE CASCADE,
            start_line INTEGER NOT NULL,
            end_line INTEGER NOT NULL,
            id TEXT UNIQUE,
            level INTEGER NOT NULL,
            title TEXT NOT NULL,
            todo_state TEXT,
            todo_category TEXT,
            priority TEXT,
            tags TEXT NOT NULL DEFAULT '[]',
            properties TEXT NOT NULL DEFAULT '{}',
            scheduled INTEGER,
            deadline INTEGER,
            closed INTEGER,
            parent_id TEXT,
            content TEXT NOT NULL DEFAULT '',
            title_phonetic TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (file_uri, start_line)
        );

        CREATE INDEX idx_headings_todo ON headings(todo_state);
        CREATE INDEX idx_headings_priority ON headings(priority);
        CREATE INDEX idx_headings_scheduled ON headings(scheduled);
        CREATE INDEX idx_headings_deadline ON headings(deadline);
        CREATE INDEX idx_headings_parent ON headings(parent_id);

        -- Tag membership rows, written and removed with their heading
        CREATE TABLE heading_tags (
            file_uri TEXT NOT NULL,
            heading_line INTEGER NOT NULL,
            tag TEXT NOT NULL,
            PRIMARY KEY (file_uri, heading_line, tag),
            FOREIGN KEY (file_uri, heading_line)
                REFERENCES headings(file_uri, start_line) ON DELETE CASCADE
        );

        CREATE INDEX idx_heading_tags_tag ON heading_tags(tag);

        -- Links table: outgoing references per source file
        CREATE TABLE links (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source_uri TEXT NOT NULL REFERENCES files(uri) ON DELETE CASCADE,
            source_heading TEXT,
            target_uri TEXT,
            target_heading TEXT,
            target_id TEXT,
            link_type TEXT NOT NULL,
            link_text TEXT,
            line_number INTEGER NOT NULL
        );

        CREATE INDEX idx_links_source ON links(source_uri);
        CREATE INDEX idx_links_target_uri ON links(target_uri);
        CREATE INDEX idx_links_target_id ON links(target_id);

        -- Read-only aggregations
        CREATE VIEW todo_counts AS
            SELECT file_uri, todo_state, COUNT(*) AS n
            FROM headings
            WHERE todo_state IS NOT NULL
            GROUP BY file_uri, todo_state;

        CREATE VIEW agenda_items AS
            SELECT file_uri, start_line, title, todo_state, scheduled, deadline
            FROM headings
            WHERE scheduled IS NOT NULL OR deadline IS NOT NULL;

        CREATE VIEW tag_counts AS
            SELECT tag, COUNT(*) AS n
            FROM heading_tags
            GROUP BY tag;
        "#,
    )?;

    Ok(())
}

fn migrate(_conn: &Connection, from_version: i32) -> Result<(), SchemaError> {
    // Add migration steps here as schema evolves
    // Example:
    // match from_version {
    //     1 => migrate_v1_to_v2(conn)?,
    //     _ => {}
    // }

    // For now, no migrations exist - we only have v1
    Err(SchemaError::MigrationFailed(format!(
        "No migration path from version {} to {}",
        from_version, SCHEMA_VERSION
    )))
}

/// Structural health check: integrity, foreign keys, required tables.
/// Problems are logged and reported as `false`, not as errors.
pub fn verify_schema(conn: &Connection) -> Result<bool, SchemaError> {
    let mut ok = true;

    let integrity: String =
        conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
    if integrity != "ok" {
        tracing::warn!("integrity_check failed: {integrity}");
        ok = false;
    }

    let mut stmt = conn.prepare("PRAGMA foreign_key_check")?;
    let violations = stmt.query_map([], |row| row.get::<_, String>(0))?.count();
    if violations > 0 {
        tracing::warn!("foreign_key_check reported {violations} violating rows");
        ok = false;
    }

    for table in REQUIRED_TABLES {
        let exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name=?1",
            [table],
            |row| row.get(0),
        )?;
        if !exists {
            tracing::warn!("required table '{table}' is missing");
            ok = false;
        }
    }

    Ok(ok)
}

/// Drop everything and reinitialize. Destructive; meant for recovery
/// and tests only.
pub fn reset_schema(conn: &Connection) -> Result<(), SchemaError> {
    conn.execute_batch(
        "PRAGMA foreign_keys = OFF;
         DROP VIEW IF EXISTS todo_counts;
         DROP VIEW IF EXISTS agenda_items;
         DROP VIEW IF EXISTS tag_counts;
         DROP TABLE IF EXISTS links;
         DROP TABLE IF EXISTS heading_tags;
         DROP TABLE IF EXISTS headings;
         DROP TABLE IF EXISTS files;
         DROP TABLE IF EXISTS metadata;
         PRAGMA foreign_keys = ON;",
    )?;
    init_schema(conn)
}

/// Refresh planner statistics and compact the database file.
pub fn optimize(conn: &Connection) -> Result<(), SchemaError> {
    conn.execute_batch("ANALYZE; VACUUM;")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_init_fresh_database() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);

        // Verify tables exist
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"files".to_string()));
        assert!(tables.contains(&"headings".to_string()));
        assert!(tables.contains(&"heading_tags".to_string()));
        assert!(tables.contains(&"links".to_string()));
        assert!(tables.contains(&"metadata".to_string()));
    }

    #[test]
    fn test_init_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap(); // Should not fail on second call
    }

    #[test]
    fn test_views_exist() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let views: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='view' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert_eq!(views, vec!["agenda_items", "tag_counts", "todo_counts"]);
    }

    #[test]
    fn test_verify_fresh_schema() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        assert!(verify_schema(&conn).unwrap());
    }

    #[test]
    fn test_verify_detects_missing_table() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn.execute_batch("DROP TABLE links;").unwrap();
        assert!(!verify_schema(&conn).unwrap());
    }

    #[test]
    fn test_reset_recreates_schema() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO files (uri, hash, created_at, updated_at) VALUES ('a.org', 'h', 0, 0)",
            [],
        )
        .unwrap();

        reset_schema(&conn).unwrap();

        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0)).unwrap();
        assert_eq!(count, 0);
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_version_too_new() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn.execute(
            "UPDATE metadata SET value = '99' WHERE key = 'schema_version'",
            [],
        )
        .unwrap();

        let err = init_schema(&conn).unwrap_err();
        assert!(matches!(err, SchemaError::VersionTooNew { found: 99, .. }));
    }
}
