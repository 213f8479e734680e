//! Change watching and debounced reindexing.

pub mod debounce;
pub mod service;
pub mod watcher;

pub use debounce::Debouncer;
pub use service::{UpdateService, WatchError};
pub use watcher::{ChangeEvent, ChangeKind, ChangeWatcher};
