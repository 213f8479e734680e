use chrono::NaiveDate;
use orgdex_core::index::{FileIndexer, Heading, HeadingStore, IndexDb};
use orgdex_core::org::TodoVocabulary;
use orgdex_core::query::{Translator, parse};

fn vocabulary() -> TodoVocabulary {
    TodoVocabulary::new(
        vec!["TODO".to_string(), "NEXT".to_string()],
        vec!["DONE".to_string(), "CANCELLED".to_string()],
    )
}

fn done_states() -> Vec<String> {
    vec!["DONE".to_string(), "CANCELLED".to_string()]
}

const BOARD: &str = "\
* NEXT [#A] Plan sprint :work:
* TODO [#B] Write docs :work:docs:
* DONE [#A] Close budget :work:mgmt:
";

fn seeded_db() -> IndexDb {
    let db = IndexDb::open_in_memory().unwrap();
    FileIndexer::new(&db, vocabulary())
        .index_file("board.org", BOARD, false)
        .unwrap();
    db
}

fn run(db: &IndexDb, query: &str) -> Vec<String> {
    let ast = parse(query).unwrap();
    let done = done_states();
    let compiled = Translator::new(&done).translate(&ast).unwrap();
    HeadingStore::new(db)
        .find_by_ql(&compiled)
        .unwrap()
        .into_iter()
        .map(|h| h.title)
        .collect()
}

#[test]
fn conjunction_narrows_to_one_heading() {
    let db = seeded_db();
    let titles = run(&db, r#"(and (todo "NEXT") (priority "A"))"#);
    assert_eq!(titles, vec!["Plan sprint"]);
}

#[test]
fn disjunction_unions_matches() {
    let db = seeded_db();
    let titles = run(&db, r#"(or (todo "DONE") (priority "B"))"#);
    assert_eq!(titles, vec!["Write docs", "Close budget"]);
}

#[test]
fn negation_excludes_done_work() {
    let db = seeded_db();
    let titles = run(&db, r#"(and (tag "work") (not (todo "DONE")))"#);
    assert_eq!(titles, vec!["Plan sprint", "Write docs"]);
}

#[test]
fn multi_tag_argument_means_any_of() {
    let db = seeded_db();
    let titles = run(&db, r#"(tag "docs" "mgmt")"#);
    assert_eq!(titles, vec!["Write docs", "Close budget"]);
}

#[test]
fn done_shorthand_uses_configured_states() {
    let db = seeded_db();
    assert_eq!(run(&db, "(done)"), vec!["Close budget"]);
    assert_eq!(run(&db, "(not (done))"), vec!["Plan sprint", "Write docs"]);
}

#[test]
fn priority_accepts_bare_letter() {
    let db = seeded_db();
    let titles = run(&db, r#"(priority "B")"#);
    assert_eq!(titles, vec!["Write docs"]);
}

#[test]
fn aliases_parse_to_the_same_tree() {
    let full = parse(r#"(priority "A")"#).unwrap();
    assert_eq!(parse(r#"(prio "A")"#).unwrap(), full);
    assert_eq!(parse(r#"(p "A")"#).unwrap(), full);

    let tag = parse(r#"(tag "work")"#).unwrap();
    assert_eq!(parse(r#"(# "work")"#).unwrap(), tag);
}

#[test]
fn free_text_leaf_matches_titles() {
    let db = seeded_db();
    let titles = run(&db, r#""sprint""#);
    assert_eq!(titles, vec!["Plan sprint"]);
}

#[test]
fn level_comparison_filters_depth() {
    let db = IndexDb::open_in_memory().unwrap();
    FileIndexer::new(&db, vocabulary())
        .index_file("deep.org", "* Top\n** Mid\n*** Leaf\n", false)
        .unwrap();

    assert_eq!(run(&db, "(level 1)"), vec!["Top"]);
    assert_eq!(run(&db, "(level >= 2)"), vec!["Mid", "Leaf"]);
}

#[test]
fn scheduled_window_matches_whole_day() {
    let db = IndexDb::open_in_memory().unwrap();
    FileIndexer::new(&db, vocabulary())
        .index_file(
            "agenda.org",
            "* TODO Standup\nSCHEDULED: <2025-03-12 Wed>\n* TODO Retro\nSCHEDULED: <2025-03-20 Thu>\n",
            false,
        )
        .unwrap();

    let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
    let done = done_states();
    let translator = Translator::with_today(&done, today);
    let store = HeadingStore::new(&db);

    let titles = |query: &str| -> Vec<String> {
        let compiled = translator.translate(&parse(query).unwrap()).unwrap();
        store
            .find_by_ql(&compiled)
            .unwrap()
            .into_iter()
            .map(|h| h.title)
            .collect()
    };

    assert_eq!(titles(r#"(scheduled "2025-03-12")"#), vec!["Standup"]);
    assert_eq!(titles(r#"(scheduled "today+2d")"#), vec!["Standup"]);
    assert_eq!(
        titles(r#"(scheduled :from "2025-03-01" :to "2025-04-01")"#),
        vec!["Standup", "Retro"]
    );
    assert_eq!(
        titles(r#"(scheduled :from "2025-03-15")"#),
        vec!["Retro"]
    );
    assert!(titles(r#"(deadline)"#).is_empty());
}

#[test]
fn property_predicate_reads_the_drawer() {
    let db = IndexDb::open_in_memory().unwrap();
    FileIndexer::new(&db, vocabulary())
        .index_file(
            "crm.org",
            "* Acme\n:PROPERTIES:\n:KIND: client\n:SEATS: 40\n:END:\n* Beta\n:PROPERTIES:\n:KIND: vendor\n:END:\n",
            false,
        )
        .unwrap();

    assert_eq!(run(&db, r#"(property "KIND" "client")"#), vec!["Acme"]);
    assert_eq!(run(&db, r#"(property "KIND")"#), vec!["Acme", "Beta"]);
    assert_eq!(run(&db, r#"(property "kind" "vendor")"#), vec!["Beta"]);
}

#[test]
fn parent_predicate_selects_children() {
    let db = IndexDb::open_in_memory().unwrap();
    FileIndexer::new(&db, vocabulary())
        .index_file(
            "tree.org",
            "* Projects\n** TODO Website\n** TODO Backups\n* Someday\n** Learn piano\n",
            false,
        )
        .unwrap();

    let titles = run(&db, r#"(parent "Projects")"#);
    assert_eq!(titles, vec!["Website", "Backups"]);
}

#[test]
fn group_by_returns_key_and_full_rows() {
    let db = seeded_db();
    let ast = parse(r#"(group-by todo (tag "work"))"#).unwrap();
    let done = done_states();
    let compiled = Translator::new(&done).translate(&ast).unwrap();
    assert_eq!(compiled.group_by.as_deref(), Some("todo"));

    let rows: Vec<Heading> = HeadingStore::new(&db).find_by_ql(&compiled).unwrap();
    assert_eq!(rows.len(), 3);
}

#[test]
fn sql_metacharacters_stay_inside_parameters() {
    let db = seeded_db();
    let titles = run(&db, r#"(todo "'; DROP TABLE files; --")"#);
    assert!(titles.is_empty());

    // Nothing was dropped.
    assert_eq!(run(&db, r#"(todo "NEXT")"#), vec!["Plan sprint"]);
}

#[test]
fn malformed_query_is_a_hard_error() {
    assert!(parse(r#"(and (todo "NEXT")"#).is_err());
    assert!(parse("").is_err());
    assert!(parse("()").is_err());
}
