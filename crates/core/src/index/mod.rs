//! SQLite-backed index over outline files.
//!
//! This module provides:
//! - Repositories for files, headings and links (the sole persistence path)
//! - Schema management with versioning and integrity checks
//! - Orchestration for single-file and whole-workspace indexing
//!
//! # Example
//!
//! ```no_run
//! use orgdex_core::index::{HeadingFilter, HeadingStore, IndexDb};
//! use std::path::Path;
//!
//! let db = IndexDb::open(Path::new(".orgdex/index.db")).unwrap();
//!
//! // All open TODO headings
//! let headings = HeadingStore::new(&db);
//! let open = headings
//!     .find_by_criteria(&HeadingFilter {
//!         todo_states: vec!["TODO".to_string()],
//!         ..HeadingFilter::default()
//!     })
//!     .unwrap();
//! ```

pub mod db;
pub mod files;
pub mod headings;
pub mod indexer;
pub mod links;
pub mod schema;
pub mod types;

pub use db::{IndexDb, StoreError};
pub use files::{FileStore, FileUpdate};
pub use headings::HeadingStore;
pub use indexer::{
    FileIndexer, IndexOutcome, IndexStats, IndexerError, WorkspaceIndexer, uri_for,
};
pub use links::LinkStore;
pub use schema::{SCHEMA_VERSION, SchemaError};
pub use types::{
    AgendaItem, FileRecord, Heading, HeadingFilter, Link, LinkKind, SortKey, TagCount,
    TodoCategory, TodoCount,
};
