//! Content hashing for change detection.

use std::hash::{DefaultHasher, Hash, Hasher};

/// Compute a hash of document content for change detection.
/// Uses DefaultHasher for speed (non-cryptographic, fast).
/// Returns hex-encoded hash string.
pub fn content_hash(content: &str) -> String {
    let mut hasher = DefaultHasher::new();

    for line in content.lines() {
        line.hash(&mut hasher);
    }

    format!("{:016x}", hasher.finish())
}
