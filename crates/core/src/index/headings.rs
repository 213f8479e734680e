//! Heading repository.
//!
//! Headings are keyed by `(file_uri, start_line)`. An explicit id, when
//! present, is globally unique; inserting a heading whose id already
//! exists replaces the older owner of that id.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use super::db::{IndexDb, StoreError};
use super::types::{
    Heading, HeadingFilter, TodoCategory, datetime_to_epoch, epoch_to_datetime,
    json_to_list, json_to_map, list_to_json, map_to_json, normalize_priority,
    opt_datetime_to_epoch, opt_epoch_to_datetime,
};
use crate::query::CompiledQuery;

const HEADING_COLS: &str = "file_uri, start_line, end_line, id, level, title, \
     todo_state, todo_category, priority, tags, properties, \
     scheduled, deadline, closed, parent_id, content, title_phonetic, \
     created_at, updated_at";

/// Access to the `headings` and `heading_tags` tables.
pub struct HeadingStore<'a> {
    db: &'a IndexDb,
}

impl<'a> HeadingStore<'a> {
    pub fn new(db: &'a IndexDb) -> Self {
        Self { db }
    }

    pub fn insert(&self, heading: &Heading) -> Result<(), StoreError> {
        Self::insert_with(self.db.connection(), heading)
    }

    pub(crate) fn insert_with(
        conn: &Connection,
        heading: &Heading,
    ) -> Result<(), StoreError> {
        // OR REPLACE covers both the (file_uri, start_line) key and an
        // explicit id reappearing elsewhere; the displaced row's tag
        // rows go with it via CASCADE.
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO headings ({HEADING_COLS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                         ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)"
            ),
            params![
                heading.file_uri,
                heading.start_line,
                heading.end_line,
                heading.id,
                heading.level,
                heading.title,
                heading.todo_state,
                heading.todo_category.map(|c| c.as_str()),
                heading.priority,
                list_to_json(&heading.tags),
                map_to_json(&heading.properties),
                opt_datetime_to_epoch(heading.scheduled.as_ref()),
                opt_datetime_to_epoch(heading.deadline.as_ref()),
                opt_datetime_to_epoch(heading.closed.as_ref()),
                heading.parent_id,
                heading.content,
                heading.title_phonetic,
                datetime_to_epoch(&heading.created_at),
                datetime_to_epoch(&heading.updated_at),
            ],
        )?;

        for tag in &heading.tags {
            conn.execute(
                "INSERT OR IGNORE INTO heading_tags (file_uri, heading_line, tag)
                 VALUES (?1, ?2, ?3)",
                params![heading.file_uri, heading.start_line, tag],
            )?;
        }
        Ok(())
    }

    pub fn insert_batch(&self, headings: &[Heading]) -> Result<(), StoreError> {
        let tx = self.db.connection().unchecked_transaction()?;
        Self::insert_batch_with(&tx, headings)?;
        tx.commit()?;
        Ok(())
    }

    pub(crate) fn insert_batch_with(
        conn: &Connection,
        headings: &[Heading],
    ) -> Result<(), StoreError> {
        for heading in headings {
            Self::insert_with(conn, heading)?;
        }
        Ok(())
    }

    /// Look up a heading by its explicit id. Synthetic
    /// `uri:line` keys are not stored in the id column.
    pub fn find_by_id(&self, id: &str) -> Result<Option<Heading>, StoreError> {
        self.db
            .connection()
            .query_row(
                &format!("SELECT {HEADING_COLS} FROM headings WHERE id = ?1"),
                [id],
                row_to_heading,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn find_by_file_uri(&self, uri: &str) -> Result<Vec<Heading>, StoreError> {
        let mut stmt = self.db.connection().prepare(&format!(
            "SELECT {HEADING_COLS} FROM headings
             WHERE file_uri = ?1 ORDER BY start_line ASC"
        ))?;
        let headings =
            stmt.query_map([uri], row_to_heading)?.filter_map(|r| r.ok()).collect();
        Ok(headings)
    }

    pub fn find_by_todo_state(&self, state: &str) -> Result<Vec<Heading>, StoreError> {
        let mut stmt = self.db.connection().prepare(&format!(
            "SELECT {HEADING_COLS} FROM headings
             WHERE todo_state = ?1 ORDER BY file_uri, start_line"
        ))?;
        let headings =
            stmt.query_map([state], row_to_heading)?.filter_map(|r| r.ok()).collect();
        Ok(headings)
    }

    pub fn find_by_tag(&self, tag: &str) -> Result<Vec<Heading>, StoreError> {
        let mut stmt = self.db.connection().prepare(&format!(
            "SELECT {HEADING_COLS} FROM headings h
             WHERE EXISTS (SELECT 1 FROM heading_tags t
                            WHERE t.file_uri = h.file_uri
                              AND t.heading_line = h.start_line
                              AND t.tag = ?1)
             ORDER BY h.file_uri, h.start_line"
        ))?;
        let headings =
            stmt.query_map([tag], row_to_heading)?.filter_map(|r| r.ok()).collect();
        Ok(headings)
    }

    pub fn find_scheduled_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Heading>, StoreError> {
        self.find_planned_between("scheduled", from, to)
    }

    pub fn find_deadline_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Heading>, StoreError> {
        self.find_planned_between("deadline", from, to)
    }

    fn find_planned_between(
        &self,
        column: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Heading>, StoreError> {
        let mut stmt = self.db.connection().prepare(&format!(
            "SELECT {HEADING_COLS} FROM headings
             WHERE {column} BETWEEN ?1 AND ?2
             ORDER BY {column} ASC, file_uri, start_line"
        ))?;
        let headings = stmt
            .query_map(
                params![datetime_to_epoch(&from), datetime_to_epoch(&to)],
                row_to_heading,
            )?
            .filter_map(|r| r.ok())
            .collect();
        Ok(headings)
    }

    /// Structured search. Every set filter narrows the result; a tag
    /// list matches headings carrying any of the tags.
    pub fn find_by_criteria(
        &self,
        filter: &HeadingFilter,
    ) -> Result<Vec<Heading>, StoreError> {
        let mut sql = format!("SELECT {HEADING_COLS} FROM headings h WHERE 1=1");
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if !filter.todo_states.is_empty() {
            let marks = vec!["?"; filter.todo_states.len()].join(", ");
            sql.push_str(&format!(" AND todo_state IN ({marks})"));
            for state in &filter.todo_states {
                values.push(Box::new(state.clone()));
            }
        }
        if let Some(priority) = &filter.priority {
            sql.push_str(" AND priority = ?");
            values.push(Box::new(normalize_priority(priority)));
        }
        if !filter.tags.is_empty() {
            let marks = vec!["?"; filter.tags.len()].join(", ");
            sql.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM heading_tags t
                   WHERE t.file_uri = h.file_uri
                     AND t.heading_line = h.start_line
                     AND t.tag IN ({marks}))"
            ));
            for tag in &filter.tags {
                values.push(Box::new(tag.clone()));
            }
        }
        if let Some(level) = filter.level {
            sql.push_str(" AND level = ?");
            values.push(Box::new(level));
        }
        if let Some(min) = filter.min_level {
            sql.push_str(" AND level >= ?");
            values.push(Box::new(min));
        }
        if let Some(max) = filter.max_level {
            sql.push_str(" AND level <= ?");
            values.push(Box::new(max));
        }
        if let Some(uri) = &filter.file_uri {
            sql.push_str(" AND file_uri = ?");
            values.push(Box::new(uri.clone()));
        }
        if let Some(text) = &filter.text {
            sql.push_str(
                " AND (LOWER(title) LIKE ?
                   OR LOWER(COALESCE(title_phonetic, '')) LIKE ?)",
            );
            let needle = format!("%{}%", text.to_lowercase());
            values.push(Box::new(needle.clone()));
            values.push(Box::new(needle));
        }

        sql.push_str(" ORDER BY ");
        match filter.sort {
            Some(sort) => sql.push_str(sort.order_clause()),
            None => sql.push_str("h.file_uri, h.start_line"),
        }

        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            values.push(Box::new(limit));
        }

        let mut stmt = self.db.connection().prepare(&sql)?;
        let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(AsRef::as_ref).collect();
        let headings = stmt
            .query_map(refs.as_slice(), row_to_heading)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(headings)
    }

    /// Run a compiled query-language expression. The clause references
    /// the `headings` table under alias `h`.
    pub fn find_by_ql(&self, query: &CompiledQuery) -> Result<Vec<Heading>, StoreError> {
        let sql = format!(
            "SELECT {HEADING_COLS} FROM headings h WHERE {}
             ORDER BY h.file_uri, h.start_line",
            query.where_clause
        );
        let mut stmt = self.db.connection().prepare(&sql)?;
        let bindings: Vec<(&str, &dyn rusqlite::ToSql)> = query
            .params
            .iter()
            .map(|(name, value)| (name.as_str(), value as &dyn rusqlite::ToSql))
            .collect();
        let headings = stmt
            .query_map(bindings.as_slice(), row_to_heading)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(headings)
    }

    pub fn delete_by_file(&self, uri: &str) -> Result<usize, StoreError> {
        Self::delete_by_file_with(self.db.connection(), uri)
    }

    pub(crate) fn delete_by_file_with(
        conn: &Connection,
        uri: &str,
    ) -> Result<usize, StoreError> {
        let rows = conn.execute("DELETE FROM headings WHERE file_uri = ?1", [uri])?;
        Ok(rows)
    }

    pub fn count(&self) -> Result<i64, StoreError> {
        let count: i64 = self.db.connection().query_row(
            "SELECT COUNT(*) FROM headings",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn row_to_heading(row: &rusqlite::Row) -> Result<Heading, rusqlite::Error> {
    let category: Option<String> = row.get(7)?;
    let tags: String = row.get(9)?;
    let properties: String = row.get(10)?;
    Ok(Heading {
        file_uri: row.get(0)?,
        start_line: row.get(1)?,
        end_line: row.get(2)?,
        id: row.get(3)?,
        level: row.get(4)?,
        title: row.get(5)?,
        todo_state: row.get(6)?,
        todo_category: category.as_deref().and_then(TodoCategory::from_str),
        priority: row.get(8)?,
        tags: json_to_list(&tags),
        properties: json_to_map(&properties),
        scheduled: opt_epoch_to_datetime(row.get(11)?),
        deadline: opt_epoch_to_datetime(row.get(12)?),
        closed: opt_epoch_to_datetime(row.get(13)?),
        parent_id: row.get(14)?,
        content: row.get(15)?,
        title_phonetic: row.get(16)?,
        created_at: epoch_to_datetime(row.get(17)?),
        updated_at: epoch_to_datetime(row.get(18)?),
    })
}
