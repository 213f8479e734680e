//! Workspace file discovery and content hashing.
//!
//! The indexer never touches the filesystem directly; it goes through
//! the [`FileProvider`] trait so scans can be driven by a real
//! directory tree or by an in-memory stand-in.

pub mod hasher;
pub mod provider;

pub use hasher::content_hash;
pub use provider::{FileProvider, ProviderError, WalkdirProvider};
