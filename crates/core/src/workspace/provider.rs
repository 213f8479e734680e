//! File access abstraction for workspace scans.

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("workspace root does not exist: {0}")]
    MissingRoot(String),

    #[error("invalid file pattern '{0}': {1}")]
    BadPattern(String, #[source] globset::Error),

    #[error("failed to walk workspace directory {0}: {1}")]
    WalkError(String, #[source] walkdir::Error),

    #[error("failed to read file {0}: {1}")]
    ReadError(String, #[source] std::io::Error),
}

/// Source of document paths and contents for the indexer. Paths are
/// relative to the workspace root.
pub trait FileProvider {
    /// All files whose workspace-relative path matches the glob,
    /// sorted.
    fn find_files(&self, pattern: &str) -> Result<Vec<PathBuf>, ProviderError>;

    /// Full text of one file.
    fn read_file(&self, path: &Path) -> Result<String, ProviderError>;
}

/// Directory-backed provider used in production.
#[derive(Debug)]
pub struct WalkdirProvider {
    root: PathBuf,
}

impl WalkdirProvider {
    pub fn new(root: &Path) -> Result<Self, ProviderError> {
        let root = root
            .canonicalize()
            .map_err(|_| ProviderError::MissingRoot(root.display().to_string()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check if an entry should be excluded from walking.
    fn is_excluded(entry: &walkdir::DirEntry) -> bool {
        // Never filter the root directory (depth 0)
        if entry.depth() == 0 {
            return false;
        }

        let name = entry.file_name().to_string_lossy();

        // Skip hidden files and directories
        if name.starts_with('.') {
            return true;
        }

        // Skip common non-workspace directories
        matches!(name.as_ref(), "node_modules" | "target" | "__pycache__" | "venv")
    }
}

impl FileProvider for WalkdirProvider {
    fn find_files(&self, pattern: &str) -> Result<Vec<PathBuf>, ProviderError> {
        let matcher: GlobMatcher = Glob::new(pattern)
            .map_err(|e| ProviderError::BadPattern(pattern.to_string(), e))?
            .compile_matcher();

        let mut files = Vec::new();

        for entry in WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !Self::is_excluded(e))
        {
            let entry = entry.map_err(|e| {
                ProviderError::WalkError(self.root.display().to_string(), e)
            })?;

            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(&self.root).unwrap_or(path);
            if matcher.is_match(relative) {
                files.push(relative.to_path_buf());
            }
        }

        files.sort();
        Ok(files)
    }

    fn read_file(&self, path: &Path) -> Result<String, ProviderError> {
        let full = self.root.join(path);
        fs::read_to_string(&full)
            .map_err(|e| ProviderError::ReadError(full.display().to_string(), e))
    }
}
