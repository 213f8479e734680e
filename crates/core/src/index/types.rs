//! Index data types for files, headings and links.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a recognized workflow keyword counts as open or finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoCategory {
    Todo,
    Done,
}

impl TodoCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::Done => "done",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "todo" => Some(Self::Todo),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

/// Classification of a bracket link by its target form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// Points at another file, optionally with an anchor.
    File,
    /// `id:` link to an explicit heading id.
    Id,
    /// In-file heading reference (`*Title` or `#custom-id`).
    Heading,
    Http,
    Https,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Id => "id",
            Self::Heading => "heading",
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "file" => Some(Self::File),
            "id" => Some(Self::Id),
            "heading" => Some(Self::Heading),
            "http" => Some(Self::Http),
            "https" => Some(Self::Https),
            _ => None,
        }
    }
}

/// One indexed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Workspace-relative path, the primary key.
    pub uri: String,
    /// `#+TITLE` directive, if present.
    pub title: Option<String>,
    /// File-level `#+PROPERTY` entries.
    pub properties: BTreeMap<String, String>,
    /// Union of `#+FILETAGS` and the first heading's tags.
    pub tags: Vec<String>,
    /// Content hash for change detection.
    pub hash: String,
    /// First successful index of this uri. Preserved across reindexes.
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One indexed heading. Rows are replaced wholesale on reindex, never
/// patched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heading {
    pub file_uri: String,
    /// Explicit `:ID:`/`:CUSTOM_ID:` value only; `None` otherwise.
    pub id: Option<String>,
    /// Outline depth, 1 for a top-level heading.
    pub level: u32,
    pub title: String,
    /// Recognized workflow keyword (`TODO`, `DONE`, ...).
    pub todo_state: Option<String>,
    pub todo_category: Option<TodoCategory>,
    /// Stored in cookie form, e.g. `[#A]`.
    pub priority: Option<String>,
    pub tags: Vec<String>,
    /// Property drawer entries, keys uppercased.
    pub properties: BTreeMap<String, String>,
    pub scheduled: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub closed: Option<DateTime<Utc>>,
    /// Effective identifier of the nearest enclosing heading.
    pub parent_id: Option<String>,
    /// 1-based headline line.
    pub start_line: u32,
    /// 1-based inclusive end of the subtree.
    pub end_line: u32,
    /// Direct body text under the headline.
    pub content: String,
    /// Cached transliteration for non-Latin titles.
    pub title_phonetic: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Heading {
    /// Effective identifier: the explicit id when present, otherwise
    /// `uri:start_line`. Parent references use this form.
    pub fn key(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("{}:{}", self.file_uri, self.start_line))
    }
}

/// A cross-reference extracted from a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    /// Database ID (None if not yet inserted).
    pub id: Option<i64>,
    pub source_uri: String,
    /// Effective identifier of the enclosing heading, if any.
    pub source_heading: Option<String>,
    /// Target file uri for file links.
    pub target_uri: Option<String>,
    /// Heading-title anchor (`*Title` form).
    pub target_heading: Option<String>,
    /// Explicit id target (`id:` links and `#custom-id` anchors).
    pub target_id: Option<String>,
    pub kind: LinkKind,
    /// Display text, when the link carried one.
    pub text: Option<String>,
    /// 1-based line number in the source file.
    pub line: u32,
}

/// Sort order for criteria queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    File,
    Priority,
    Scheduled,
    Deadline,
    Level,
}

impl SortKey {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "file" => Some(Self::File),
            "priority" => Some(Self::Priority),
            "scheduled" => Some(Self::Scheduled),
            "deadline" => Some(Self::Deadline),
            "level" => Some(Self::Level),
            _ => None,
        }
    }

    pub(crate) fn order_clause(self) -> &'static str {
        match self {
            Self::File => "h.file_uri, h.start_line",
            Self::Priority => "h.priority IS NULL, h.priority, h.file_uri, h.start_line",
            Self::Scheduled => "h.scheduled IS NULL, h.scheduled, h.file_uri, h.start_line",
            Self::Deadline => "h.deadline IS NULL, h.deadline, h.file_uri, h.start_line",
            Self::Level => "h.level, h.file_uri, h.start_line",
        }
    }
}

/// Structured filter for heading lookups.
#[derive(Debug, Clone, Default)]
pub struct HeadingFilter {
    /// Match any of these workflow keywords.
    pub todo_states: Vec<String>,
    /// Priority in either bare (`A`) or cookie (`[#A]`) form.
    pub priority: Option<String>,
    /// Match headings carrying any of these tags.
    pub tags: Vec<String>,
    pub level: Option<u32>,
    pub min_level: Option<u32>,
    pub max_level: Option<u32>,
    /// Restrict to one file.
    pub file_uri: Option<String>,
    /// Case-insensitive substring over title and phonetic index.
    pub text: Option<String>,
    pub sort: Option<SortKey>,
    pub limit: Option<u32>,
}

/// Row of the `todo_counts` view.
#[derive(Debug, Clone, Serialize)]
pub struct TodoCount {
    pub file_uri: String,
    pub todo_state: String,
    pub n: i64,
}

/// Row of the `tag_counts` view.
#[derive(Debug, Clone, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub n: i64,
}

/// Row of the `agenda_items` view.
#[derive(Debug, Clone, Serialize)]
pub struct AgendaItem {
    pub file_uri: String,
    pub start_line: u32,
    pub title: String,
    pub todo_state: Option<String>,
    pub scheduled: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
}

// ─────────────────────────────────────────────────────────────────────────
// Row conversion helpers
// ─────────────────────────────────────────────────────────────────────────
//
// Timestamps are persisted as epoch seconds, property maps and tag
// lists as JSON text. All repositories decode through these.

pub(crate) fn datetime_to_epoch(dt: &DateTime<Utc>) -> i64 {
    dt.timestamp()
}

pub(crate) fn epoch_to_datetime(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
}

pub(crate) fn opt_datetime_to_epoch(dt: Option<&DateTime<Utc>>) -> Option<i64> {
    dt.map(datetime_to_epoch)
}

pub(crate) fn opt_epoch_to_datetime(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.map(epoch_to_datetime)
}

pub(crate) fn map_to_json(map: &BTreeMap<String, String>) -> String {
    serde_json::to_string(map).unwrap_or_else(|_| "{}".to_string())
}

pub(crate) fn json_to_map(s: &str) -> BTreeMap<String, String> {
    serde_json::from_str(s).unwrap_or_default()
}

pub(crate) fn list_to_json(list: &[String]) -> String {
    serde_json::to_string(list).unwrap_or_else(|_| "[]".to_string())
}

pub(crate) fn json_to_list(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}

/// Priorities are stored in cookie form (`[#A]`). Accept the bare
/// letter from callers and normalize.
pub(crate) fn normalize_priority(p: &str) -> String {
    let trimmed = p.trim();
    if trimmed.starts_with("[#") {
        trimmed.to_string()
    } else {
        format!("[#{}]", trimmed.to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_key_prefers_explicit_id() {
        let mut h = sample_heading();
        assert_eq!(h.key(), "notes.org:7");
        h.id = Some("abc-123".to_string());
        assert_eq!(h.key(), "abc-123");
    }

    #[test]
    fn epoch_roundtrip() {
        let now = Utc::now();
        let back = epoch_to_datetime(datetime_to_epoch(&now));
        assert_eq!(back.timestamp(), now.timestamp());
    }

    #[test]
    fn json_map_roundtrip() {
        let mut map = BTreeMap::new();
        map.insert("ID".to_string(), "x".to_string());
        assert_eq!(json_to_map(&map_to_json(&map)), map);
        assert!(json_to_map("not json").is_empty());
    }

    #[test]
    fn priority_normalization() {
        assert_eq!(normalize_priority("A"), "[#A]");
        assert_eq!(normalize_priority("b"), "[#B]");
        assert_eq!(normalize_priority("[#C]"), "[#C]");
    }

    fn sample_heading() -> Heading {
        Heading {
            file_uri: "notes.org".to_string(),
            id: None,
            level: 1,
            title: "Sample".to_string(),
            todo_state: None,
            todo_category: None,
            priority: None,
            tags: Vec::new(),
            properties: BTreeMap::new(),
            scheduled: None,
            deadline: None,
            closed: None,
            parent_id: None,
            start_line: 7,
            end_line: 7,
            content: String::new(),
            title_phonetic: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
