//! Link repository.

use rusqlite::{Connection, params};

use super::db::{IndexDb, StoreError};
use super::types::{Link, LinkKind};

const LINK_COLS: &str = "id, source_uri, source_heading, target_uri, \
     target_heading, target_id, link_type, link_text, line_number";

/// Access to the `links` table.
pub struct LinkStore<'a> {
    db: &'a IndexDb,
}

impl<'a> LinkStore<'a> {
    pub fn new(db: &'a IndexDb) -> Self {
        Self { db }
    }

    pub fn insert(&self, link: &Link) -> Result<(), StoreError> {
        Self::insert_with(self.db.connection(), link)
    }

    pub(crate) fn insert_with(conn: &Connection, link: &Link) -> Result<(), StoreError> {
        conn.execute(
            "INSERT INTO links (source_uri, source_heading, target_uri,
                 target_heading, target_id, link_type, link_text, line_number)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                link.source_uri,
                link.source_heading,
                link.target_uri,
                link.target_heading,
                link.target_id,
                link.kind.as_str(),
                link.text,
                link.line,
            ],
        )?;
        Ok(())
    }

    pub fn insert_batch(&self, links: &[Link]) -> Result<(), StoreError> {
        let tx = self.db.connection().unchecked_transaction()?;
        Self::insert_batch_with(&tx, links)?;
        tx.commit()?;
        Ok(())
    }

    pub(crate) fn insert_batch_with(
        conn: &Connection,
        links: &[Link],
    ) -> Result<(), StoreError> {
        for link in links {
            Self::insert_with(conn, link)?;
        }
        Ok(())
    }

    pub fn find_by_source_uri(&self, uri: &str) -> Result<Vec<Link>, StoreError> {
        self.query_links("source_uri = ?1", uri)
    }

    pub fn find_by_target_uri(&self, uri: &str) -> Result<Vec<Link>, StoreError> {
        self.query_links("target_uri = ?1", uri)
    }

    /// Backlinks onto a heading with an explicit id.
    pub fn find_by_target_id(&self, id: &str) -> Result<Vec<Link>, StoreError> {
        self.query_links("target_id = ?1", id)
    }

    /// Links written under a given heading, by heading key.
    pub fn find_by_source_heading(&self, key: &str) -> Result<Vec<Link>, StoreError> {
        self.query_links("source_heading = ?1", key)
    }

    fn query_links(&self, clause: &str, value: &str) -> Result<Vec<Link>, StoreError> {
        let mut stmt = self.db.connection().prepare(&format!(
            "SELECT {LINK_COLS} FROM links WHERE {clause}
             ORDER BY source_uri, line_number, id"
        ))?;
        let links =
            stmt.query_map([value], row_to_link)?.filter_map(|r| r.ok()).collect();
        Ok(links)
    }

    pub fn delete_by_source_uri(&self, uri: &str) -> Result<usize, StoreError> {
        Self::delete_by_source_with(self.db.connection(), uri)
    }

    pub(crate) fn delete_by_source_with(
        conn: &Connection,
        uri: &str,
    ) -> Result<usize, StoreError> {
        let rows = conn.execute("DELETE FROM links WHERE source_uri = ?1", [uri])?;
        Ok(rows)
    }

    pub fn count(&self) -> Result<i64, StoreError> {
        let count: i64 = self.db.connection().query_row(
            "SELECT COUNT(*) FROM links",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn row_to_link(row: &rusqlite::Row) -> Result<Link, rusqlite::Error> {
    let kind: String = row.get(6)?;
    Ok(Link {
        id: row.get(0)?,
        source_uri: row.get(1)?,
        source_heading: row.get(2)?,
        target_uri: row.get(3)?,
        target_heading: row.get(4)?,
        target_id: row.get(5)?,
        kind: LinkKind::from_str(&kind).unwrap_or(LinkKind::File),
        text: row.get(7)?,
        line: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn seed_file(db: &IndexDb, uri: &str) {
        let record = crate::index::types::FileRecord {
            uri: uri.to_string(),
            title: None,
            properties: BTreeMap::new(),
            tags: Vec::new(),
            hash: format!("h-{uri}"),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        crate::index::files::FileStore::new(db).insert(&record).unwrap();
    }

    fn link_at(source: &str, line: u32, kind: LinkKind) -> Link {
        Link {
            id: None,
            source_uri: source.to_string(),
            source_heading: None,
            target_uri: None,
            target_heading: None,
            target_id: None,
            kind,
            text: None,
            line,
        }
    }

    #[test]
    fn test_insert_and_find_by_source() {
        let db = IndexDb::open_in_memory().unwrap();
        seed_file(&db, "a.org");

        let store = LinkStore::new(&db);
        store.insert(&link_at("a.org", 9, LinkKind::Https)).unwrap();
        store.insert(&link_at("a.org", 2, LinkKind::File)).unwrap();

        let found = store.find_by_source_uri("a.org").unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].line, 2);
        assert_eq!(found[1].line, 9);
        assert!(found[0].id.is_some());
    }

    #[test]
    fn test_find_backlinks() {
        let db = IndexDb::open_in_memory().unwrap();
        seed_file(&db, "a.org");
        seed_file(&db, "b.org");

        let store = LinkStore::new(&db);
        let mut by_id = link_at("a.org", 1, LinkKind::Id);
        by_id.target_id = Some("node-1".to_string());
        store.insert(&by_id).unwrap();

        let mut by_file = link_at("b.org", 4, LinkKind::File);
        by_file.target_uri = Some("notes.org".to_string());
        store.insert(&by_file).unwrap();

        assert_eq!(store.find_by_target_id("node-1").unwrap().len(), 1);
        assert_eq!(store.find_by_target_uri("notes.org").unwrap().len(), 1);
        assert!(store.find_by_target_id("other").unwrap().is_empty());
    }

    #[test]
    fn test_find_by_source_heading() {
        let db = IndexDb::open_in_memory().unwrap();
        seed_file(&db, "a.org");

        let store = LinkStore::new(&db);
        let mut link = link_at("a.org", 3, LinkKind::Http);
        link.source_heading = Some("a.org:1".to_string());
        store.insert(&link).unwrap();

        let found = store.find_by_source_heading("a.org:1").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, LinkKind::Http);
    }

    #[test]
    fn test_delete_by_source() {
        let db = IndexDb::open_in_memory().unwrap();
        seed_file(&db, "a.org");

        let store = LinkStore::new(&db);
        store
            .insert_batch(&[
                link_at("a.org", 1, LinkKind::File),
                link_at("a.org", 2, LinkKind::File),
            ])
            .unwrap();
        assert_eq!(store.count().unwrap(), 2);

        assert_eq!(store.delete_by_source_uri("a.org").unwrap(), 2);
        assert_eq!(store.count().unwrap(), 0);
    }
}
