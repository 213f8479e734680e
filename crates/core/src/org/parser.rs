//! Org outline parser.
//!
//! Produces a flat stream of heading nodes in document order plus
//! document-level directives. Hierarchy reconstruction happens in the
//! extraction layer. The parser covers the indexed subset: headlines
//! with keyword/priority/tags, planning lines, property drawers, and
//! `#+TITLE` / `#+FILETAGS` / `#+PROPERTY` / `#+TODO` directives.
//! Tables and block evaluation are out of scope and pass through as
//! plain body text.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::timestamp::OrgTimestamp;

static HEADLINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\*+)\s+(.*)$").unwrap());

static PRIORITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[#([A-Za-z0-9])\]\s*").unwrap());

// A trailing chain like :work:deep: at the end of a headline.
static TAGS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+((?::[A-Za-z0-9_@#%]+)+:)\s*$").unwrap());

static DRAWER_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:([A-Za-z0-9_\-]+):\s*(.*)$").unwrap());

static PLANNING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(SCHEDULED|DEADLINE|CLOSED):").unwrap());

/// The TODO keyword sets a document is parsed against. A headline
/// keyword outside both sets is ordinary title text.
#[derive(Debug, Clone)]
pub struct TodoVocabulary {
    pub open: Vec<String>,
    pub done: Vec<String>,
}

impl Default for TodoVocabulary {
    fn default() -> Self {
        Self { open: vec!["TODO".to_string()], done: vec!["DONE".to_string()] }
    }
}

impl TodoVocabulary {
    pub fn new(open: Vec<String>, done: Vec<String>) -> Self {
        Self { open, done }
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.open.iter().any(|k| k == keyword) || self.is_done(keyword)
    }

    pub fn is_done(&self, keyword: &str) -> bool {
        self.done.iter().any(|k| k == keyword)
    }

    fn add_open(&mut self, keyword: &str) {
        if !self.contains(keyword) {
            self.open.push(keyword.to_string());
        }
    }

    fn add_done(&mut self, keyword: &str) {
        if !self.is_done(keyword) {
            self.open.retain(|k| k != keyword);
            self.done.push(keyword.to_string());
        }
    }
}

/// One headline and everything attached to it, before hierarchy
/// reconstruction.
#[derive(Debug, Clone)]
pub struct HeadingNode {
    /// Number of leading stars (>= 1).
    pub level: u32,
    /// Recognized workflow keyword, if the headline carried one.
    pub todo_keyword: Option<String>,
    /// Priority cookie letter from `[#A]`.
    pub priority: Option<char>,
    pub title: String,
    pub tags: Vec<String>,
    /// Property drawer entries, keys uppercased.
    pub properties: BTreeMap<String, String>,
    pub scheduled: Option<OrgTimestamp>,
    pub deadline: Option<OrgTimestamp>,
    pub closed: Option<OrgTimestamp>,
    /// 1-based line of the headline.
    pub start_line: u32,
    /// 1-based last line of the subtree (inclusive): the line before
    /// the next heading of the same or shallower level, or the end of
    /// the document.
    pub end_line: u32,
    /// Direct body text under this headline, up to the next headline
    /// of any level. Planning lines and the property drawer are not
    /// part of the body.
    pub body: String,
}

/// A parsed document: directives plus the flat heading stream.
#[derive(Debug, Clone, Default)]
pub struct OrgDocument {
    pub title: Option<String>,
    pub file_tags: Vec<String>,
    /// File-level `#+PROPERTY: key value` entries, keys as written.
    pub properties: BTreeMap<String, String>,
    pub headings: Vec<HeadingNode>,
}

/// Parse a document against the given vocabulary. In-buffer `#+TODO:`
/// directives extend the vocabulary for this document only.
pub fn parse_document(content: &str, vocabulary: &TodoVocabulary) -> OrgDocument {
    let vocab = effective_vocabulary(content, vocabulary);

    let mut doc = OrgDocument::default();
    let mut headings: Vec<HeadingNode> = Vec::new();
    let mut body: Vec<&str> = Vec::new();
    let mut in_drawer = false;
    let mut planning_ok = false;

    for (idx, line) in content.lines().enumerate() {
        let line_no = u32::try_from(idx + 1).unwrap_or(u32::MAX);
        let trimmed = line.trim();

        if let Some(cap) = HEADLINE_RE.captures(line) {
            if let Some(last) = headings.last_mut() {
                last.body = take_body(&mut body);
            }
            in_drawer = false;
            planning_ok = true;

            let level = u32::try_from(cap[1].len()).unwrap_or(u32::MAX);
            let (todo_keyword, priority, title, tags) = parse_headline(&cap[2], &vocab);
            headings.push(HeadingNode {
                level,
                todo_keyword,
                priority,
                title,
                tags,
                properties: BTreeMap::new(),
                scheduled: None,
                deadline: None,
                closed: None,
                start_line: line_no,
                end_line: line_no,
                body: String::new(),
            });
            continue;
        }

        if in_drawer {
            if trimmed.eq_ignore_ascii_case(":END:") {
                in_drawer = false;
            } else if let Some(cap) = DRAWER_KEY_RE.captures(trimmed) {
                if let Some(last) = headings.last_mut() {
                    last.properties
                        .insert(cap[1].to_ascii_uppercase(), cap[2].trim().to_string());
                }
            }
            // Anything else inside an open drawer is ignored; an
            // unterminated drawer keeps the entries seen so far.
            continue;
        }

        if trimmed.eq_ignore_ascii_case(":PROPERTIES:") && !headings.is_empty() {
            in_drawer = true;
            planning_ok = false;
            continue;
        }

        if planning_ok
            && !headings.is_empty()
            && parse_planning(line, headings.last_mut())
        {
            continue;
        }

        if parse_directive(trimmed, &mut doc) {
            continue;
        }

        if !trimmed.is_empty() {
            planning_ok = false;
        }
        if !headings.is_empty() {
            body.push(line);
        }
    }

    if let Some(last) = headings.last_mut() {
        last.body = take_body(&mut body);
    }

    let total = u32::try_from(content.lines().count()).unwrap_or(u32::MAX);
    assign_end_lines(&mut headings, total);
    doc.headings = headings;
    doc
}

fn take_body(body: &mut Vec<&str>) -> String {
    let text = body.join("\n").trim_end().to_string();
    body.clear();
    text
}

fn assign_end_lines(headings: &mut [HeadingNode], total_lines: u32) {
    for i in 0..headings.len() {
        let level = headings[i].level;
        let mut end = total_lines;
        for next in &headings[i + 1..] {
            if next.level <= level {
                end = next.start_line.saturating_sub(1);
                break;
            }
        }
        headings[i].end_line = end.max(headings[i].start_line);
    }
}

fn parse_headline(
    rest: &str,
    vocab: &TodoVocabulary,
) -> (Option<String>, Option<char>, String, Vec<String>) {
    let mut rest = rest.trim_start();

    let mut tags = Vec::new();
    if let Some(cap) = TAGS_RE.captures(rest)
        && let Some(m) = cap.get(1)
    {
        tags = m
            .as_str()
            .split(':')
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        rest = &rest[..m.start()];
    }

    let mut keyword = None;
    if let Some(first) = rest.split_whitespace().next()
        && vocab.contains(first)
    {
        keyword = Some(first.to_string());
        rest = rest[first.len()..].trim_start();
    }

    let mut priority = None;
    if let Some(cap) = PRIORITY_RE.captures(rest) {
        priority = cap[1].chars().next();
        if let Some(m) = cap.get(0) {
            rest = &rest[m.end()..];
        }
    }

    (keyword, priority, rest.trim().to_string(), tags)
}

/// Parse SCHEDULED/DEADLINE/CLOSED entries on a planning line. The
/// line must start with one of the keywords; several may share it.
fn parse_planning(line: &str, heading: Option<&mut HeadingNode>) -> bool {
    let Some(heading) = heading else { return false };

    let lead = line.trim_start();
    if !["SCHEDULED:", "DEADLINE:", "CLOSED:"].iter().any(|k| lead.starts_with(k)) {
        return false;
    }

    let matches: Vec<_> = PLANNING_RE.find_iter(line).collect();
    if matches.is_empty() {
        return false;
    }

    for (i, m) in matches.iter().enumerate() {
        let value_end = matches.get(i + 1).map_or(line.len(), regex::Match::start);
        let stamp = OrgTimestamp::parse(&line[m.end()..value_end]);
        match &line[m.start()..m.end() - 1] {
            "SCHEDULED" => heading.scheduled = stamp.or(heading.scheduled),
            "DEADLINE" => heading.deadline = stamp.or(heading.deadline),
            "CLOSED" => heading.closed = stamp.or(heading.closed),
            _ => {}
        }
    }
    true
}

/// Handle a recognized `#+` directive line. Unknown `#+` lines are not
/// consumed, so src blocks and similar stay in the body.
fn parse_directive(trimmed: &str, doc: &mut OrgDocument) -> bool {
    let Some(rest) = trimmed.strip_prefix("#+") else { return false };
    let Some((name, value)) = rest.split_once(':') else { return false };
    let value = value.trim();

    match name.to_ascii_uppercase().as_str() {
        "TITLE" => {
            if !value.is_empty() {
                doc.title = Some(value.to_string());
            }
        }
        "FILETAGS" => {
            let tags: Vec<&str> = if value.contains(':') {
                value.split(':').filter(|s| !s.is_empty()).collect()
            } else {
                value.split_whitespace().collect()
            };
            for tag in tags {
                if !doc.file_tags.iter().any(|t| t == tag) {
                    doc.file_tags.push(tag.to_string());
                }
            }
        }
        "PROPERTY" => {
            if let Some((key, val)) = value.split_once(char::is_whitespace) {
                doc.properties.insert(key.to_string(), val.trim().to_string());
            } else if !value.is_empty() {
                doc.properties.insert(value.to_string(), String::new());
            }
        }
        // Vocabulary directives are applied in a separate pass so they
        // affect the whole document regardless of position.
        "TODO" => {}
        _ => return false,
    }
    true
}

/// The vocabulary in force for a document: the configured one plus any
/// in-buffer `#+TODO:` extensions.
pub(crate) fn effective_vocabulary(
    content: &str,
    base: &TodoVocabulary,
) -> TodoVocabulary {
    let mut vocab = base.clone();
    for line in content.lines() {
        let Some(rest) = line.trim().strip_prefix("#+") else { continue };
        let Some((name, value)) = rest.split_once(':') else { continue };
        if name.eq_ignore_ascii_case("TODO") {
            apply_todo_directive(&mut vocab, value);
        }
    }
    vocab
}

/// `#+TODO: TODO NEXT | DONE CANCELLED`. Keywords may carry fast-access
/// suffixes like `TODO(t)`. Without a bar the last keyword closes, as
/// org does.
fn apply_todo_directive(vocab: &mut TodoVocabulary, value: &str) {
    let mut words: Vec<String> = Vec::new();
    let mut bar_at = None;

    for token in value.split_whitespace() {
        if token == "|" {
            bar_at = Some(words.len());
            continue;
        }
        let word = token.split('(').next().unwrap_or(token);
        if !word.is_empty() {
            words.push(word.to_string());
        }
    }

    if words.is_empty() {
        return;
    }
    let split = bar_at.unwrap_or(words.len() - 1);
    for (i, word) in words.iter().enumerate() {
        if i < split {
            vocab.add_open(word);
        } else {
            vocab.add_done(word);
        }
    }
}
