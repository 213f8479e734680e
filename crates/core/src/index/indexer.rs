//! Indexing orchestration.
//!
//! `FileIndexer` rebuilds the rows of a single file inside one
//! transaction. `WorkspaceIndexer` drives a full pass over a provider:
//! hash-gated per-file indexing plus pruning of rows whose files have
//! disappeared.

use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::extract::extract_document;
use crate::org::TodoVocabulary;
use crate::workspace::{FileProvider, ProviderError, content_hash};

use super::db::{IndexDb, StoreError};
use super::files::FileStore;
use super::headings::HeadingStore;
use super::links::LinkStore;
use super::types::{FileRecord, Heading};

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("file provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// What happened to a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    Indexed { headings: usize, links: usize },
    /// Content hash unchanged, rows left alone.
    Skipped,
}

/// Counters for one workspace pass.
#[derive(Debug, Default, Clone, Serialize)]
pub struct IndexStats {
    pub files_found: usize,
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    pub headings_indexed: usize,
    pub links_indexed: usize,
    pub duration_ms: u64,
}

/// Indexes one file at a time against a shared database handle.
pub struct FileIndexer<'a> {
    db: &'a IndexDb,
    vocabulary: TodoVocabulary,
}

impl<'a> FileIndexer<'a> {
    pub fn new(db: &'a IndexDb, vocabulary: TodoVocabulary) -> Self {
        Self { db, vocabulary }
    }

    /// Replace everything indexed for `uri` with rows extracted from
    /// `content`. Unless `force` is set, a file whose content hash is
    /// unchanged is skipped without touching any rows.
    pub fn index_file(
        &self,
        uri: &str,
        content: &str,
        force: bool,
    ) -> Result<IndexOutcome, IndexerError> {
        let hash = content_hash(content);
        let files = FileStore::new(self.db);

        if !force {
            if let Some(existing) = files.find_by_uri(uri)? {
                if existing.hash == hash {
                    return Ok(IndexOutcome::Skipped);
                }
            }
        }

        let doc = extract_document(uri, content, &self.vocabulary);
        self.warn_duplicate_ids(uri, &doc.headings)?;

        let now = Utc::now();
        let record = FileRecord {
            uri: uri.to_string(),
            title: doc.title,
            properties: doc.properties,
            tags: doc.file_tags,
            hash,
            created_at: now,
            updated_at: now,
        };

        // One transaction per file: either all rows flip to the new
        // content or none do.
        let tx = self
            .db
            .connection()
            .unchecked_transaction()
            .map_err(StoreError::from)?;
        FileStore::upsert_with(&tx, &record)?;
        HeadingStore::delete_by_file_with(&tx, uri)?;
        LinkStore::delete_by_source_with(&tx, uri)?;
        HeadingStore::insert_batch_with(&tx, &doc.headings)?;
        LinkStore::insert_batch_with(&tx, &doc.links)?;
        tx.commit().map_err(StoreError::from)?;

        Ok(IndexOutcome::Indexed {
            headings: doc.headings.len(),
            links: doc.links.len(),
        })
    }

    /// Drop a file and everything hanging off it.
    pub fn remove_file(&self, uri: &str) -> Result<bool, IndexerError> {
        let removed = FileStore::new(self.db).delete(uri)?;
        if removed {
            info!(%uri, "removed from index");
        }
        Ok(removed)
    }

    /// An explicit id reappearing in another file (or twice in this
    /// one) silently transfers ownership on insert; surface that in the
    /// log before it happens.
    fn warn_duplicate_ids(
        &self,
        uri: &str,
        headings: &[Heading],
    ) -> Result<(), IndexerError> {
        let store = HeadingStore::new(self.db);
        let mut seen: HashSet<&str> = HashSet::new();

        for heading in headings {
            let Some(id) = heading.id.as_deref() else { continue };
            if !seen.insert(id) {
                warn!(%id, %uri, "explicit id appears twice in one file, last heading wins");
                continue;
            }
            if let Some(existing) = store.find_by_id(id)? {
                if existing.file_uri != uri {
                    warn!(
                        %id,
                        previous = %existing.file_uri,
                        %uri,
                        "explicit id moves between files, newest indexing wins"
                    );
                }
            }
        }
        Ok(())
    }
}

/// Full-workspace indexing over a file provider.
pub struct WorkspaceIndexer<'a, P: FileProvider> {
    indexer: FileIndexer<'a>,
    provider: P,
    pattern: String,
}

impl<'a, P: FileProvider> WorkspaceIndexer<'a, P> {
    pub fn new(
        db: &'a IndexDb,
        provider: P,
        pattern: impl Into<String>,
        vocabulary: TodoVocabulary,
    ) -> Self {
        Self {
            indexer: FileIndexer::new(db, vocabulary),
            provider,
            pattern: pattern.into(),
        }
    }

    /// Index every matching file, then prune rows whose files are gone.
    /// Per-file failures are logged and counted, not fatal.
    pub fn index_workspace(&self, force: bool) -> Result<IndexStats, IndexerError> {
        let started = Instant::now();
        let mut stats = IndexStats::default();

        let paths = self.provider.find_files(&self.pattern)?;
        stats.files_found = paths.len();

        let mut seen: HashSet<String> = HashSet::with_capacity(paths.len());
        for path in &paths {
            let uri = uri_for(path);
            seen.insert(uri.clone());

            let content = match self.provider.read_file(path) {
                Ok(content) => content,
                Err(err) => {
                    warn!(%uri, error = %err, "skipping unreadable file");
                    stats.files_failed += 1;
                    continue;
                }
            };

            match self.indexer.index_file(&uri, &content, force) {
                Ok(IndexOutcome::Indexed { headings, links }) => {
                    debug!(%uri, headings, links, "indexed");
                    stats.files_indexed += 1;
                    stats.headings_indexed += headings;
                    stats.links_indexed += links;
                }
                Ok(IndexOutcome::Skipped) => {
                    debug!(%uri, "unchanged");
                    stats.files_skipped += 1;
                }
                Err(err) => {
                    warn!(%uri, error = %err, "indexing failed");
                    stats.files_failed += 1;
                }
            }
        }

        let files = FileStore::new(self.indexer.db);
        for record in files.find_all()? {
            if !seen.contains(&record.uri) {
                files.delete(&record.uri)?;
                info!(uri = %record.uri, "pruned vanished file");
            }
        }

        stats.duration_ms =
            u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            found = stats.files_found,
            indexed = stats.files_indexed,
            skipped = stats.files_skipped,
            failed = stats.files_failed,
            "workspace pass complete"
        );
        Ok(stats)
    }
}

/// Stable uri for a workspace-relative path.
pub fn uri_for(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
