//! Filesystem change stream.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::warn;

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Changed,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// Recursive watcher over a workspace root. Backend events fan out to
/// one `ChangeEvent` per affected path; kinds outside
/// create/modify/remove are dropped.
pub struct ChangeWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<ChangeEvent>,
}

impl ChangeWatcher {
    pub fn new(root: &Path) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(
            move |result: Result<Event, notify::Error>| match result {
                Ok(event) => {
                    let Some(kind) = map_kind(&event.kind) else { return };
                    for path in event.paths {
                        let _ = tx.send(ChangeEvent { path, kind });
                    }
                }
                Err(err) => warn!(error = %err, "watch backend error"),
            },
        )?;
        watcher.watch(root, RecursiveMode::Recursive)?;
        Ok(Self { _watcher: watcher, rx })
    }

    pub fn events(&self) -> &Receiver<ChangeEvent> {
        &self.rx
    }
}

fn map_kind(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Modify(_) => Some(ChangeKind::Changed),
        EventKind::Remove(_) => Some(ChangeKind::Deleted),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind, RemoveKind};

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            map_kind(&EventKind::Create(CreateKind::File)),
            Some(ChangeKind::Created)
        );
        assert_eq!(
            map_kind(&EventKind::Modify(ModifyKind::Any)),
            Some(ChangeKind::Changed)
        );
        assert_eq!(
            map_kind(&EventKind::Remove(RemoveKind::File)),
            Some(ChangeKind::Deleted)
        );
        assert_eq!(map_kind(&EventKind::Access(AccessKind::Any)), None);
    }

    #[test]
    fn test_watches_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = ChangeWatcher::new(dir.path()).unwrap();
        assert!(watcher.events().try_recv().is_err()); // nothing yet
    }
}
