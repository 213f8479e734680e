//! The update service: keeps the index in step with the workspace.
//!
//! A full `scan` walks every matching file; `run` blocks on the change
//! stream and reindexes individual files after debouncing. Scans are
//! guarded by a busy flag so an overlapping request becomes a logged
//! skip rather than a queued second pass.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};

use globset::{Glob, GlobMatcher};
use thiserror::Error;
use tracing::{info, warn};

use crate::index::{
    FileIndexer, IndexDb, IndexStats, IndexerError, WorkspaceIndexer, uri_for,
};
use crate::org::TodoVocabulary;
use crate::workspace::{FileProvider, WalkdirProvider};

use super::debounce::Debouncer;
use super::watcher::{ChangeEvent, ChangeKind, ChangeWatcher};

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("watch backend error: {0}")]
    Notify(#[from] notify::Error),

    #[error("invalid file pattern '{0}': {1}")]
    Pattern(String, #[source] globset::Error),

    #[error("indexing error: {0}")]
    Indexer(#[from] IndexerError),
}

/// Debounced incremental reindexing over one workspace.
pub struct UpdateService<'a> {
    db: &'a IndexDb,
    provider: WalkdirProvider,
    pattern: String,
    matcher: GlobMatcher,
    vocabulary: TodoVocabulary,
    debounce: Duration,
    busy: AtomicBool,
}

impl<'a> UpdateService<'a> {
    pub fn new(
        db: &'a IndexDb,
        root: &Path,
        pattern: &str,
        vocabulary: TodoVocabulary,
        debounce: Duration,
    ) -> Result<Self, WatchError> {
        let provider = WalkdirProvider::new(root).map_err(IndexerError::from)?;
        let matcher = Glob::new(pattern)
            .map_err(|e| WatchError::Pattern(pattern.to_string(), e))?
            .compile_matcher();
        Ok(Self {
            db,
            provider,
            pattern: pattern.to_string(),
            matcher,
            vocabulary,
            debounce,
            busy: AtomicBool::new(false),
        })
    }

    /// Full workspace pass. Returns `None` when a scan is already
    /// running; overlapping requests are skipped, not queued.
    pub fn scan(&self, force: bool) -> Result<Option<IndexStats>, WatchError> {
        if self.busy.swap(true, Ordering::SeqCst) {
            info!("scan already in progress, skipping");
            return Ok(None);
        }

        let result = self.run_scan(force);
        self.busy.store(false, Ordering::SeqCst);
        result.map(Some)
    }

    fn run_scan(&self, force: bool) -> Result<IndexStats, WatchError> {
        let provider = WalkdirProvider::new(self.provider.root())
            .map_err(IndexerError::from)?;
        let workspace = WorkspaceIndexer::new(
            self.db,
            provider,
            self.pattern.as_str(),
            self.vocabulary.clone(),
        );
        Ok(workspace.index_workspace(force)?)
    }

    /// Apply one debounced change. Paths outside the workspace or not
    /// matching the file pattern are ignored.
    pub fn handle_event(&self, event: &ChangeEvent) -> Result<(), WatchError> {
        let Ok(relative) = event.path.strip_prefix(self.provider.root()) else {
            return Ok(());
        };
        if !self.matcher.is_match(relative) {
            return Ok(());
        }

        let uri = uri_for(relative);
        let indexer = FileIndexer::new(self.db, self.vocabulary.clone());

        match event.kind {
            ChangeKind::Created | ChangeKind::Changed => {
                match self.provider.read_file(relative) {
                    Ok(content) => {
                        indexer
                            .index_file(&uri, &content, false)
                            .map_err(WatchError::from)?;
                        info!(%uri, "reindexed after change");
                    }
                    // The file may already be gone again; keep the old
                    // rows until a delete event or the next scan.
                    Err(err) => {
                        warn!(%uri, error = %err, "changed file unreadable");
                    }
                }
            }
            ChangeKind::Deleted => {
                indexer.remove_file(&uri)?;
            }
        }
        Ok(())
    }

    /// Block on filesystem events until the watch backend goes away.
    pub fn run(&self) -> Result<(), WatchError> {
        let watcher = ChangeWatcher::new(self.provider.root())?;
        let mut debouncer = Debouncer::new(self.debounce);
        info!(
            root = %self.provider.root().display(),
            pattern = %self.pattern,
            "watching for changes"
        );

        loop {
            let timeout = debouncer.next_deadline().map_or(
                Duration::from_secs(1),
                |deadline| deadline.saturating_duration_since(Instant::now()),
            );

            match watcher.events().recv_timeout(timeout) {
                Ok(event) => debouncer.record(event, Instant::now()),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Ok(()),
            }

            for event in debouncer.drain_ready(Instant::now()) {
                if let Err(err) = self.handle_event(&event) {
                    warn!(
                        path = %event.path.display(),
                        error = %err,
                        "failed to apply change"
                    );
                }
            }
        }
    }
}
