//! Bracket-link extraction.
//!
//! Scans `[[target]]` and `[[target][description]]` forms line by line
//! and classifies each target. The enclosing heading, when one exists,
//! is recorded by its effective key so backlink queries can land on a
//! specific subtree.

use std::sync::LazyLock;

use regex::Regex;

use crate::index::{Heading, Link, LinkKind};

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\]\[]+)\](?:\[([^\]]*)\])?\]").unwrap());

pub(crate) fn extract_links(uri: &str, content: &str, headings: &[Heading]) -> Vec<Link> {
    let mut links = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line_number = u32::try_from(idx + 1).unwrap_or(u32::MAX);
        for captures in LINK_RE.captures_iter(line) {
            let target = &captures[1];
            let text = captures
                .get(2)
                .map(|m| m.as_str().trim().to_string())
                .filter(|t| !t.is_empty());

            let mut link = classify(target);
            link.source_uri = uri.to_string();
            link.source_heading = enclosing_heading(headings, line_number);
            link.text = text;
            link.line = line_number;
            links.push(link);
        }
    }

    links
}

/// Classify a raw link target. Unschemed paths are file links; `*` and
/// `#` prefixes address headings by title and by explicit id.
fn classify(target: &str) -> Link {
    let mut link = Link {
        id: None,
        source_uri: String::new(),
        source_heading: None,
        target_uri: None,
        target_heading: None,
        target_id: None,
        kind: LinkKind::File,
        text: None,
        line: 0,
    };

    if target.starts_with("https://") {
        link.kind = LinkKind::Https;
        link.target_uri = Some(target.to_string());
    } else if target.starts_with("http://") {
        link.kind = LinkKind::Http;
        link.target_uri = Some(target.to_string());
    } else if let Some(id) = target.strip_prefix("id:") {
        link.kind = LinkKind::Id;
        link.target_id = Some(id.to_string());
    } else if let Some(path) = target.strip_prefix("file:") {
        link.kind = LinkKind::File;
        apply_file_target(&mut link, path);
    } else if let Some(title) = target.strip_prefix('*') {
        link.kind = LinkKind::Heading;
        link.target_heading = Some(title.to_string());
    } else if let Some(id) = target.strip_prefix('#') {
        link.kind = LinkKind::Heading;
        link.target_id = Some(id.to_string());
    } else {
        link.kind = LinkKind::File;
        apply_file_target(&mut link, target);
    }

    link
}

/// Split `path::anchor` file targets. The anchor addresses a heading by
/// title (`*Title`) or by explicit id (`#custom-id`).
fn apply_file_target(link: &mut Link, path: &str) {
    match path.split_once("::") {
        Some((file, anchor)) => {
            link.target_uri = Some(file.to_string());
            if let Some(title) = anchor.strip_prefix('*') {
                link.target_heading = Some(title.to_string());
            } else if let Some(id) = anchor.strip_prefix('#') {
                link.target_id = Some(id.to_string());
            } else if !anchor.is_empty() {
                link.target_heading = Some(anchor.to_string());
            }
        }
        None => link.target_uri = Some(path.to_string()),
    }
}

/// The innermost heading whose subtree spans `line`, as its effective
/// key. Headings are in document order, so the last match wins.
fn enclosing_heading(headings: &[Heading], line: u32) -> Option<String> {
    headings
        .iter()
        .filter(|h| h.start_line <= line && line <= h.end_line)
        .next_back()
        .map(Heading::key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::org::TodoVocabulary;

    fn extract(content: &str) -> Vec<Link> {
        let doc =
            super::super::document::extract_document("a.org", content, &TodoVocabulary::default());
        doc.links
    }

    #[test]
    fn test_classifies_schemes() {
        let links = extract(
            "* Refs\n\
             [[https://example.com/a][site]]\n\
             [[http://plain.example]]\n\
             [[id:abc-123]]\n\
             [[file:notes.org]]\n\
             [[projects/plan.org]]\n",
        );
        assert_eq!(links.len(), 5);
        assert_eq!(links[0].kind, LinkKind::Https);
        assert_eq!(links[0].target_uri.as_deref(), Some("https://example.com/a"));
        assert_eq!(links[0].text.as_deref(), Some("site"));
        assert_eq!(links[1].kind, LinkKind::Http);
        assert_eq!(links[2].kind, LinkKind::Id);
        assert_eq!(links[2].target_id.as_deref(), Some("abc-123"));
        assert_eq!(links[3].target_uri.as_deref(), Some("notes.org"));
        assert_eq!(links[4].kind, LinkKind::File);
        assert_eq!(links[4].target_uri.as_deref(), Some("projects/plan.org"));
    }

    #[test]
    fn test_file_anchor_split() {
        let links = extract(
            "[[file:notes.org::*Weekly sync]]\n\
             [[file:notes.org::#sync-id]]\n\
             [[plan.org::Roadmap]]\n",
        );
        assert_eq!(links[0].target_uri.as_deref(), Some("notes.org"));
        assert_eq!(links[0].target_heading.as_deref(), Some("Weekly sync"));
        assert_eq!(links[1].target_id.as_deref(), Some("sync-id"));
        assert_eq!(links[2].target_uri.as_deref(), Some("plan.org"));
        assert_eq!(links[2].target_heading.as_deref(), Some("Roadmap"));
    }

    #[test]
    fn test_heading_anchors_in_same_file() {
        let links = extract("[[*Some heading]]\n[[#custom-id]]\n");
        assert_eq!(links[0].kind, LinkKind::Heading);
        assert_eq!(links[0].target_heading.as_deref(), Some("Some heading"));
        assert!(links[0].target_uri.is_none());
        assert_eq!(links[1].kind, LinkKind::Heading);
        assert_eq!(links[1].target_id.as_deref(), Some("custom-id"));
    }

    #[test]
    fn test_source_heading_is_innermost() {
        let content = "\
* Outer
** Inner
[[https://example.com]]
* Next
";
        let links = extract(content);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].source_heading.as_deref(), Some("a.org:2"));
        assert_eq!(links[0].line, 3);
    }

    #[test]
    fn test_link_before_first_heading_has_no_source() {
        let links = extract("[[https://example.com]]\n* Later\n");
        assert_eq!(links[0].source_heading, None);
    }

    #[test]
    fn test_two_links_on_one_line() {
        let links = extract("see [[id:a]] and [[id:b]]\n");
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].target_id.as_deref(), Some("a"));
        assert_eq!(links[1].target_id.as_deref(), Some("b"));
    }
}
