//! Shared output formatting for query commands.

use chrono::{DateTime, Utc};
use orgdex_core::index::Heading;
use serde::Serialize;

/// Formatted heading for JSON output.
#[derive(Debug, Serialize)]
pub struct HeadingOutput {
    pub location: String,
    pub level: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub todo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
}

impl From<&Heading> for HeadingOutput {
    fn from(heading: &Heading) -> Self {
        Self {
            location: location(heading),
            level: heading.level,
            todo: heading.todo_state.clone(),
            priority: heading.priority.clone(),
            title: heading.title.clone(),
            tags: heading.tags.clone(),
            scheduled: heading.scheduled.as_ref().map(format_stamp),
            deadline: heading.deadline.as_ref().map(format_stamp),
        }
    }
}

/// `file:line` pointer into the workspace.
pub fn location(heading: &Heading) -> String {
    format!("{}:{}", heading.file_uri, heading.start_line)
}

fn format_stamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

fn format_tags(tags: &[String]) -> String {
    if tags.is_empty() {
        String::new()
    } else {
        format!(":{}:", tags.join(":"))
    }
}

/// Print headings as a table.
pub fn print_headings_table(headings: &[Heading]) {
    if headings.is_empty() {
        println!("(no headings found)");
        return;
    }

    // Calculate column widths
    let loc_width = headings
        .iter()
        .map(|h| location(h).len())
        .max()
        .unwrap_or(8)
        .clamp(8, 40);
    let state_width = headings
        .iter()
        .filter_map(|h| h.todo_state.as_ref().map(String::len))
        .max()
        .unwrap_or(5)
        .clamp(5, 12);
    let title_width =
        headings.iter().map(|h| h.title.len()).max().unwrap_or(5).clamp(5, 40);

    // Header
    println!(
        "{:<loc_width$}  {:<state_width$}  {:<4}  {:<title_width$}  TAGS",
        "LOCATION",
        "STATE",
        "PRI",
        "TITLE",
        loc_width = loc_width,
        state_width = state_width,
        title_width = title_width,
    );
    println!(
        "{:-<loc_width$}  {:-<state_width$}  {:-<4}  {:-<title_width$}  {:-<12}",
        "",
        "",
        "",
        "",
        "",
        loc_width = loc_width,
        state_width = state_width,
        title_width = title_width,
    );

    // Rows
    for heading in headings {
        let loc = truncate(&location(heading), loc_width);
        let title = truncate(&heading.title, title_width);

        println!(
            "{:<loc_width$}  {:<state_width$}  {:<4}  {:<title_width$}  {}",
            loc,
            heading.todo_state.as_deref().unwrap_or("-"),
            heading.priority.as_deref().unwrap_or("-"),
            title,
            format_tags(&heading.tags),
            loc_width = loc_width,
            state_width = state_width,
            title_width = title_width,
        );
    }

    println!();
    println!("-- {} headings --", headings.len());
}

/// Print headings as JSON.
pub fn print_headings_json(headings: &[Heading]) {
    let output: Vec<HeadingOutput> = headings.iter().map(HeadingOutput::from).collect();
    println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
}

/// Print headings as `file:line` locations only (quiet mode).
pub fn print_headings_quiet(headings: &[Heading]) {
    for heading in headings {
        println!("{}", location(heading));
    }
}

/// Truncate string with ellipsis if needed.
fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        format!("{}...", &s[..max_len - 3])
    } else {
        s[..max_len].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a-rather-long-string", 10), "a-rathe...");
        assert_eq!(truncate("abc", 3), "abc");
    }

    #[test]
    fn test_format_tags() {
        assert_eq!(format_tags(&[]), "");
        assert_eq!(
            format_tags(&["work".to_string(), "dev".to_string()]),
            ":work:dev:"
        );
    }
}
