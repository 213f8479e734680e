use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ConfigFile {
    pub version: u32,
    pub profile: Option<String>,
    pub profiles: HashMap<String, Profile>,
    #[serde(default)]
    pub todo: TodoConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct Profile {
    pub workspace_root: String,
    /// Glob matched against workspace-relative paths during scans.
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,
    /// Optional override for the index directory (defaults to
    /// `{{workspace_root}}/.orgdex`).
    pub index_dir: Option<String>,
}

fn default_file_pattern() -> String {
    "**/*.org".to_string()
}

/// TODO keyword vocabulary. Headline keywords outside this set are
/// treated as plain title text.
#[derive(Debug, Deserialize, Clone)]
pub struct TodoConfig {
    #[serde(default = "default_todo_keywords")]
    pub keywords: Vec<String>,
    #[serde(default = "default_done_keywords")]
    pub done: Vec<String>,
}

impl Default for TodoConfig {
    fn default() -> Self {
        Self { keywords: default_todo_keywords(), done: default_done_keywords() }
    }
}

fn default_todo_keywords() -> Vec<String> {
    vec!["TODO".to_string(), "NEXT".to_string(), "WAIT".to_string()]
}

fn default_done_keywords() -> Vec<String> {
    vec!["DONE".to_string(), "CANCELLED".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct WatchConfig {
    /// Quiet period for collapsing change-notification bursts.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms() }
    }
}

fn default_debounce_ms() -> u64 {
    400
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file_level: Option<String>,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), file_level: None, file: None }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub active_profile: String,
    pub workspace_root: PathBuf,
    pub file_pattern: String,
    pub index_dir: PathBuf,
    pub todo: TodoConfig,
    pub watch: WatchConfig,
    pub logging: LoggingConfig,
}

impl ResolvedConfig {
    /// Path of the SQLite index file under the index directory.
    pub fn index_path(&self) -> PathBuf {
        self.index_dir.join("index.db")
    }
}
