//! Turns a parsed document into index entities.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::index::{Heading, Link, TodoCategory};
use crate::org::parser::effective_vocabulary;
use crate::org::{OrgTimestamp, TodoVocabulary, parse_document, phonetic_index};

use super::links::extract_links;

/// Everything the indexer persists for one file.
#[derive(Debug, Default)]
pub struct ExtractedDocument {
    pub title: Option<String>,
    pub file_tags: Vec<String>,
    pub properties: BTreeMap<String, String>,
    pub headings: Vec<Heading>,
    pub links: Vec<Link>,
}

/// Extract headings and links from `content`. The effective TODO
/// vocabulary (configured plus in-buffer `#+TODO:`) drives both keyword
/// recognition and the todo/done categorization.
pub fn extract_document(
    uri: &str,
    content: &str,
    vocabulary: &TodoVocabulary,
) -> ExtractedDocument {
    let vocab = effective_vocabulary(content, vocabulary);
    let document = parse_document(content, &vocab);
    let now = Utc::now();

    let mut headings: Vec<Heading> = Vec::with_capacity(document.headings.len());
    // Stack of (level, effective key) for parent resolution.
    let mut stack: Vec<(u32, String)> = Vec::new();

    for node in &document.headings {
        while stack.last().is_some_and(|(level, _)| *level >= node.level) {
            stack.pop();
        }
        let parent_id = stack.last().map(|(_, key)| key.clone());

        let id = node
            .properties
            .get("ID")
            .or_else(|| node.properties.get("CUSTOM_ID"))
            .cloned();

        let heading = Heading {
            file_uri: uri.to_string(),
            id,
            level: node.level,
            title: node.title.clone(),
            todo_state: node.todo_keyword.clone(),
            todo_category: node.todo_keyword.as_deref().map(|keyword| {
                if vocab.is_done(keyword) {
                    TodoCategory::Done
                } else {
                    TodoCategory::Todo
                }
            }),
            priority: node.priority.map(|cookie| format!("[#{cookie}]")),
            tags: node.tags.clone(),
            properties: node.properties.clone(),
            scheduled: planned_at(node.scheduled.as_ref(), &node.properties, "SCHEDULED"),
            deadline: planned_at(node.deadline.as_ref(), &node.properties, "DEADLINE"),
            closed: planned_at(node.closed.as_ref(), &node.properties, "CLOSED"),
            parent_id,
            start_line: node.start_line,
            end_line: node.end_line,
            content: node.body.clone(),
            title_phonetic: phonetic_index(&node.title),
            created_at: now,
            updated_at: now,
        };

        stack.push((node.level, heading.key()));
        headings.push(heading);
    }

    let links = extract_links(uri, content, &headings);

    // File tags are #+FILETAGS plus whatever the first heading carries.
    let mut file_tags = document.file_tags.clone();
    if let Some(first) = headings.first() {
        for tag in &first.tags {
            if !file_tags.contains(tag) {
                file_tags.push(tag.clone());
            }
        }
    }

    ExtractedDocument {
        title: document.title,
        file_tags,
        properties: document.properties,
        headings,
        links,
    }
}

/// Planning instant for a heading: planning line first, then the drawer
/// property of the same name.
fn planned_at(
    parsed: Option<&OrgTimestamp>,
    properties: &BTreeMap<String, String>,
    key: &str,
) -> Option<DateTime<Utc>> {
    parsed
        .map(OrgTimestamp::to_utc)
        .or_else(|| properties.get(key).and_then(|v| OrgTimestamp::parse(v)).map(|ts| ts.to_utc()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> TodoVocabulary {
        TodoVocabulary::default()
    }

    #[test]
    fn test_extracts_headings_with_parents() {
        let content = "\
* Projects
** TODO Website
** Infra
*** [#A] Migrate database :ops:
";
        let doc = extract_document("work.org", content, &vocab());
        assert_eq!(doc.headings.len(), 4);

        let projects = &doc.headings[0];
        assert_eq!(projects.parent_id, None);

        let website = &doc.headings[1];
        assert_eq!(website.todo_state.as_deref(), Some("TODO"));
        assert_eq!(website.todo_category, Some(TodoCategory::Todo));
        assert_eq!(website.parent_id.as_deref(), Some("work.org:1"));

        let migrate = &doc.headings[3];
        assert_eq!(migrate.priority.as_deref(), Some("[#A]"));
        assert_eq!(migrate.tags, vec!["ops"]);
        // Parent is the nearest shallower heading, Infra at line 3.
        assert_eq!(migrate.parent_id.as_deref(), Some("work.org:3"));
    }

    #[test]
    fn test_sibling_then_deeper_parent() {
        let content = "\
* One
** Two A
** Two B
*** Three
";
        let doc = extract_document("t.org", content, &vocab());
        let three = &doc.headings[3];
        assert_eq!(three.parent_id.as_deref(), Some("t.org:3"));
    }

    #[test]
    fn test_explicit_id_becomes_parent_key() {
        let content = "\
* Root
:PROPERTIES:
:ID: root-id
:END:
** Child
";
        let doc = extract_document("a.org", content, &vocab());
        assert_eq!(doc.headings[0].id.as_deref(), Some("root-id"));
        assert_eq!(doc.headings[1].parent_id.as_deref(), Some("root-id"));
    }

    #[test]
    fn test_custom_id_fallback() {
        let content = "\
* Root
:PROPERTIES:
:CUSTOM_ID: custom-key
:END:
";
        let doc = extract_document("a.org", content, &vocab());
        assert_eq!(doc.headings[0].id.as_deref(), Some("custom-key"));
    }

    #[test]
    fn test_file_extended_done_keyword() {
        let content = "\
#+TODO: DRAFT | SHIPPED
* SHIPPED Release notes
* DRAFT Blog post
";
        let doc = extract_document("a.org", content, &vocab());
        assert_eq!(doc.headings[0].todo_category, Some(TodoCategory::Done));
        assert_eq!(doc.headings[1].todo_category, Some(TodoCategory::Todo));
    }

    #[test]
    fn test_drawer_planning_fallback() {
        let content = "\
* Task
:PROPERTIES:
:DEADLINE: <2025-03-01>
:END:
";
        let doc = extract_document("a.org", content, &vocab());
        assert!(doc.headings[0].deadline.is_some());
        assert!(doc.headings[0].scheduled.is_none());
    }

    #[test]
    fn test_planning_line_wins_over_drawer() {
        let content = "\
* Task
SCHEDULED: <2025-06-10>
:PROPERTIES:
:SCHEDULED: <2020-01-01>
:END:
";
        let doc = extract_document("a.org", content, &vocab());
        let expected = OrgTimestamp::parse("<2025-06-10>").unwrap().to_utc();
        assert_eq!(doc.headings[0].scheduled, Some(expected));
    }

    #[test]
    fn test_file_tags_union() {
        let content = "\
#+FILETAGS: :journal:
* Intro :journal:meta:
";
        let doc = extract_document("a.org", content, &vocab());
        assert_eq!(doc.file_tags, vec!["journal", "meta"]);
    }

    #[test]
    fn test_headingless_file() {
        let content = "#+TITLE: Scratch\nJust prose.\n";
        let doc = extract_document("a.org", content, &vocab());
        assert_eq!(doc.title.as_deref(), Some("Scratch"));
        assert!(doc.headings.is_empty());
        assert!(doc.file_tags.is_empty());
    }

    #[test]
    fn test_phonetic_index_for_non_latin_title() {
        let content = "* Встреча с командой\n";
        let doc = extract_document("a.org", content, &vocab());
        let phonetic = doc.headings[0].title_phonetic.as_deref().unwrap();
        assert!(phonetic.contains("vstrecha"));
    }
}
