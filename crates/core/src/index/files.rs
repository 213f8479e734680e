//! File repository.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use super::db::{IndexDb, StoreError};
use super::types::{
    FileRecord, datetime_to_epoch, epoch_to_datetime, json_to_list, json_to_map,
    list_to_json, map_to_json,
};

const FILE_COLS: &str = "uri, title, properties, tags, hash, created_at, updated_at";

/// Partial update for a file row. Unset fields are left untouched;
/// an all-unset patch is a no-op.
#[derive(Debug, Clone, Default)]
pub struct FileUpdate {
    pub title: Option<String>,
    pub properties: Option<std::collections::BTreeMap<String, String>>,
    pub tags: Option<Vec<String>>,
    pub hash: Option<String>,
}

/// Access to the `files` table.
pub struct FileStore<'a> {
    db: &'a IndexDb,
}

impl<'a> FileStore<'a> {
    pub fn new(db: &'a IndexDb) -> Self {
        Self { db }
    }

    pub fn insert(&self, file: &FileRecord) -> Result<(), StoreError> {
        Self::insert_with(self.db.connection(), file)
    }

    pub(crate) fn insert_with(
        conn: &Connection,
        file: &FileRecord,
    ) -> Result<(), StoreError> {
        conn.execute(
            "INSERT INTO files (uri, title, properties, tags, hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                file.uri,
                file.title,
                map_to_json(&file.properties),
                list_to_json(&file.tags),
                file.hash,
                datetime_to_epoch(&file.created_at),
                datetime_to_epoch(&file.updated_at),
            ],
        )?;
        Ok(())
    }

    /// Apply a partial update. `updated_at` is bumped whenever any
    /// field is set.
    pub fn update(&self, uri: &str, patch: &FileUpdate) -> Result<(), StoreError> {
        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(title) = &patch.title {
            sets.push("title = ?");
            values.push(Box::new(title.clone()));
        }
        if let Some(properties) = &patch.properties {
            sets.push("properties = ?");
            values.push(Box::new(map_to_json(properties)));
        }
        if let Some(tags) = &patch.tags {
            sets.push("tags = ?");
            values.push(Box::new(list_to_json(tags)));
        }
        if let Some(hash) = &patch.hash {
            sets.push("hash = ?");
            values.push(Box::new(hash.clone()));
        }

        if sets.is_empty() {
            return Ok(());
        }

        sets.push("updated_at = ?");
        values.push(Box::new(datetime_to_epoch(&Utc::now())));
        values.push(Box::new(uri.to_string()));

        let sql = format!("UPDATE files SET {} WHERE uri = ?", sets.join(", "));
        let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(AsRef::as_ref).collect();
        let rows = self.db.connection().execute(&sql, refs.as_slice())?;

        if rows == 0 {
            return Err(StoreError::FileNotFound(uri.to_string()));
        }
        Ok(())
    }

    /// Insert or update by uri. An existing row keeps its original
    /// `created_at`.
    pub fn upsert(&self, file: &FileRecord) -> Result<(), StoreError> {
        Self::upsert_with(self.db.connection(), file)
    }

    pub(crate) fn upsert_with(
        conn: &Connection,
        file: &FileRecord,
    ) -> Result<(), StoreError> {
        let existing: Option<i64> = conn
            .query_row(
                "SELECT created_at FROM files WHERE uri = ?1",
                [&file.uri],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(created_at) => {
                conn.execute(
                    "UPDATE files SET
                        title = ?1, properties = ?2, tags = ?3,
                        hash = ?4, created_at = ?5, updated_at = ?6
                     WHERE uri = ?7",
                    params![
                        file.title,
                        map_to_json(&file.properties),
                        list_to_json(&file.tags),
                        file.hash,
                        created_at,
                        datetime_to_epoch(&file.updated_at),
                        file.uri,
                    ],
                )?;
                Ok(())
            }
            None => Self::insert_with(conn, file),
        }
    }

    pub fn find_by_uri(&self, uri: &str) -> Result<Option<FileRecord>, StoreError> {
        self.db
            .connection()
            .query_row(
                &format!("SELECT {FILE_COLS} FROM files WHERE uri = ?1"),
                [uri],
                row_to_file,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn find_all(&self) -> Result<Vec<FileRecord>, StoreError> {
        let mut stmt = self
            .db
            .connection()
            .prepare(&format!("SELECT {FILE_COLS} FROM files ORDER BY uri"))?;
        let files = stmt.query_map([], row_to_file)?.filter_map(|r| r.ok()).collect();
        Ok(files)
    }

    pub fn find_by_hash(&self, hash: &str) -> Result<Vec<FileRecord>, StoreError> {
        let mut stmt = self.db.connection().prepare(&format!(
            "SELECT {FILE_COLS} FROM files WHERE hash = ?1 ORDER BY uri"
        ))?;
        let files =
            stmt.query_map([hash], row_to_file)?.filter_map(|r| r.ok()).collect();
        Ok(files)
    }

    pub fn find_updated_after(
        &self,
        after: chrono::DateTime<Utc>,
    ) -> Result<Vec<FileRecord>, StoreError> {
        let mut stmt = self.db.connection().prepare(&format!(
            "SELECT {FILE_COLS} FROM files WHERE updated_at >= ?1 ORDER BY uri"
        ))?;
        let files = stmt
            .query_map([datetime_to_epoch(&after)], row_to_file)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(files)
    }

    /// Delete a file row; headings, tag rows and links go with it via
    /// CASCADE.
    pub fn delete(&self, uri: &str) -> Result<bool, StoreError> {
        Self::delete_with(self.db.connection(), uri)
    }

    pub(crate) fn delete_with(conn: &Connection, uri: &str) -> Result<bool, StoreError> {
        let rows = conn.execute("DELETE FROM files WHERE uri = ?1", [uri])?;
        Ok(rows > 0)
    }

    pub fn count(&self) -> Result<i64, StoreError> {
        let count: i64 = self.db.connection().query_row(
            "SELECT COUNT(*) FROM files",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn exists(&self, uri: &str) -> Result<bool, StoreError> {
        let found: bool = self.db.connection().query_row(
            "SELECT COUNT(*) > 0 FROM files WHERE uri = ?1",
            [uri],
            |row| row.get(0),
        )?;
        Ok(found)
    }
}

fn row_to_file(row: &rusqlite::Row) -> Result<FileRecord, rusqlite::Error> {
    let properties: String = row.get(2)?;
    let tags: String = row.get(3)?;
    Ok(FileRecord {
        uri: row.get(0)?,
        title: row.get(1)?,
        properties: json_to_map(&properties),
        tags: json_to_list(&tags),
        hash: row.get(4)?,
        created_at: epoch_to_datetime(row.get(5)?),
        updated_at: epoch_to_datetime(row.get(6)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::BTreeMap;

    fn sample_file(uri: &str) -> FileRecord {
        let mut properties = BTreeMap::new();
        properties.insert("owner".to_string(), "sam".to_string());
        FileRecord {
            uri: uri.to_string(),
            title: Some("Projects".to_string()),
            properties,
            tags: vec!["work".to_string()],
            hash: "abc123".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_insert_and_find() {
        let db = IndexDb::open_in_memory().unwrap();
        let files = FileStore::new(&db);

        files.insert(&sample_file("projects.org")).unwrap();

        let found = files.find_by_uri("projects.org").unwrap().unwrap();
        assert_eq!(found.title.as_deref(), Some("Projects"));
        assert_eq!(found.tags, vec!["work"]);
        assert_eq!(found.properties.get("owner").map(String::as_str), Some("sam"));
        assert!(files.exists("projects.org").unwrap());
        assert_eq!(files.count().unwrap(), 1);
    }

    #[test]
    fn test_upsert_preserves_created_at() {
        let db = IndexDb::open_in_memory().unwrap();
        let files = FileStore::new(&db);

        let mut file = sample_file("a.org");
        file.created_at = Utc::now() - Duration::days(10);
        files.insert(&file).unwrap();
        let original = files.find_by_uri("a.org").unwrap().unwrap();

        file.hash = "changed".to_string();
        file.created_at = Utc::now();
        files.upsert(&file).unwrap();

        let after = files.find_by_uri("a.org").unwrap().unwrap();
        assert_eq!(after.hash, "changed");
        assert_eq!(after.created_at, original.created_at);
    }

    #[test]
    fn test_upsert_inserts_when_missing() {
        let db = IndexDb::open_in_memory().unwrap();
        let files = FileStore::new(&db);

        files.upsert(&sample_file("new.org")).unwrap();
        assert!(files.exists("new.org").unwrap());
    }

    #[test]
    fn test_update_patch() {
        let db = IndexDb::open_in_memory().unwrap();
        let files = FileStore::new(&db);
        files.insert(&sample_file("a.org")).unwrap();

        let patch =
            FileUpdate { hash: Some("new-hash".to_string()), ..FileUpdate::default() };
        files.update("a.org", &patch).unwrap();

        let found = files.find_by_uri("a.org").unwrap().unwrap();
        assert_eq!(found.hash, "new-hash");
        assert_eq!(found.title.as_deref(), Some("Projects")); // untouched
    }

    #[test]
    fn test_update_empty_patch_is_noop() {
        let db = IndexDb::open_in_memory().unwrap();
        let files = FileStore::new(&db);

        // No row exists, but an empty patch must not fail
        files.update("missing.org", &FileUpdate::default()).unwrap();
    }

    #[test]
    fn test_update_missing_file_errors() {
        let db = IndexDb::open_in_memory().unwrap();
        let files = FileStore::new(&db);

        let patch = FileUpdate { hash: Some("x".to_string()), ..FileUpdate::default() };
        let err = files.update("missing.org", &patch).unwrap_err();
        assert!(matches!(err, StoreError::FileNotFound(_)));
    }

    #[test]
    fn test_find_by_hash_and_updated_after() {
        let db = IndexDb::open_in_memory().unwrap();
        let files = FileStore::new(&db);

        let mut old = sample_file("old.org");
        old.hash = "h-old".to_string();
        old.updated_at = Utc::now() - Duration::days(5);
        files.insert(&old).unwrap();

        let mut new = sample_file("new.org");
        new.hash = "h-new".to_string();
        files.insert(&new).unwrap();

        assert_eq!(files.find_by_hash("h-old").unwrap().len(), 1);

        let recent = files.find_updated_after(Utc::now() - Duration::days(1)).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].uri, "new.org");
    }

    #[test]
    fn test_delete() {
        let db = IndexDb::open_in_memory().unwrap();
        let files = FileStore::new(&db);
        files.insert(&sample_file("a.org")).unwrap();

        assert!(files.delete("a.org").unwrap());
        assert!(!files.delete("a.org").unwrap());
        assert!(!files.exists("a.org").unwrap());
    }
}
