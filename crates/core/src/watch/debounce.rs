//! Event debouncing.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use super::watcher::{ChangeEvent, ChangeKind};

/// Collapses bursts of identical events. Each `(path, kind)` pair holds
/// a deadline that every repeat pushes out; the event is released once
/// its quiet window elapses.
pub struct Debouncer {
    window: Duration,
    pending: HashMap<(PathBuf, ChangeKind), Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self { window, pending: HashMap::new() }
    }

    pub fn record(&mut self, event: ChangeEvent, now: Instant) {
        self.pending.insert((event.path, event.kind), now + self.window);
    }

    /// Take every event whose quiet window has elapsed.
    pub fn drain_ready(&mut self, now: Instant) -> Vec<ChangeEvent> {
        let ready: Vec<(PathBuf, ChangeKind)> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();

        let mut events = Vec::with_capacity(ready.len());
        for key in ready {
            self.pending.remove(&key);
            let (path, kind) = key;
            events.push(ChangeEvent { path, kind });
        }
        events
    }

    /// Earliest pending deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().min().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
