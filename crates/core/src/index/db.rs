//! Database handle and maintenance operations.

use std::path::Path;

use rusqlite::Connection;
use thiserror::Error;

use super::schema::{
    SchemaError, get_schema_version, init_schema, optimize, reset_schema, verify_schema,
};
use super::types::{AgendaItem, TagCount, TodoCount, opt_epoch_to_datetime};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Index database handle. Owns the single connection; all reads and
/// writes go through the repository types in this module.
pub struct IndexDb {
    conn: Connection,
}

impl IndexDb {
    /// Open or create an index database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// The underlying connection, for repository internals and
    /// transaction composition. Not exposed outside the crate.
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Recorded schema version.
    pub fn schema_version(&self) -> Result<i32, StoreError> {
        Ok(get_schema_version(&self.conn)?)
    }

    /// Structural health check; details are logged.
    pub fn verify(&self) -> Result<bool, StoreError> {
        Ok(verify_schema(&self.conn)?)
    }

    /// Drop all data and reinitialize the schema. Destructive.
    pub fn reset(&self) -> Result<(), StoreError> {
        Ok(reset_schema(&self.conn)?)
    }

    /// ANALYZE + VACUUM. Affects throughput only.
    pub fn optimize(&self) -> Result<(), StoreError> {
        Ok(optimize(&self.conn)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Aggregation views
    // ─────────────────────────────────────────────────────────────────────────

    /// Workflow-state counts per file, from the `todo_counts` view.
    pub fn todo_counts(&self) -> Result<Vec<TodoCount>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT file_uri, todo_state, n FROM todo_counts
             ORDER BY file_uri, todo_state",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(TodoCount {
                    file_uri: row.get(0)?,
                    todo_state: row.get(1)?,
                    n: row.get(2)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// Tag frequencies, most used first, from the `tag_counts` view.
    pub fn tag_counts(&self) -> Result<Vec<TagCount>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT tag, n FROM tag_counts ORDER BY n DESC, tag")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(TagCount { tag: row.get(0)?, n: row.get(1)? })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// Dated headings from the `agenda_items` view, soonest first.
    pub fn agenda_items(&self) -> Result<Vec<AgendaItem>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT file_uri, start_line, title, todo_state, scheduled, deadline
             FROM agenda_items
             ORDER BY COALESCE(scheduled, deadline), file_uri, start_line",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(AgendaItem {
                    file_uri: row.get(0)?,
                    start_line: row.get(1)?,
                    title: row.get(2)?,
                    todo_state: row.get(3)?,
                    scheduled: opt_epoch_to_datetime(row.get(4)?),
                    deadline: opt_epoch_to_datetime(row.get(5)?),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }
}
