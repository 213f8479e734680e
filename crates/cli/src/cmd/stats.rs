//! Stats command implementation.

use std::collections::BTreeMap;
use std::path::Path;

use orgdex_core::config::loader::ConfigLoader;
use orgdex_core::index::{
    AgendaItem, FileStore, HeadingStore, IndexDb, LinkStore, TagCount, TodoCount,
};
use serde::Serialize;

use crate::StatsArgs;

#[derive(Debug, Serialize)]
struct StatsOutput {
    files: i64,
    headings: i64,
    links: i64,
    todo_counts: Vec<TodoCount>,
    tag_counts: Vec<TagCount>,
    agenda: Vec<AgendaItem>,
}

pub fn run(config: Option<&Path>, profile: Option<&str>, args: &StatsArgs) {
    let rc = match ConfigLoader::load(config, profile) {
        Ok(rc) => rc,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            std::process::exit(1);
        }
    };

    let db = match IndexDb::open(&rc.index_path()) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Error opening index: {e}");
            eprintln!("Hint: Run 'odx index' to build the index first.");
            std::process::exit(1);
        }
    };

    let stats = match collect(&db) {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("Error reading index: {e}");
            std::process::exit(1);
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats).unwrap_or_default());
    } else {
        print_stats(&stats);
    }
}

fn collect(db: &IndexDb) -> Result<StatsOutput, orgdex_core::index::StoreError> {
    Ok(StatsOutput {
        files: FileStore::new(db).count()?,
        headings: HeadingStore::new(db).count()?,
        links: LinkStore::new(db).count()?,
        todo_counts: db.todo_counts()?,
        tag_counts: db.tag_counts()?,
        agenda: db.agenda_items()?,
    })
}

fn print_stats(stats: &StatsOutput) {
    println!("Index contents:");
    println!("  Files:    {}", stats.files);
    println!("  Headings: {}", stats.headings);
    println!("  Links:    {}", stats.links);

    // The view counts per file; fold to per-state totals for display.
    let mut per_state: BTreeMap<&str, i64> = BTreeMap::new();
    for row in &stats.todo_counts {
        *per_state.entry(row.todo_state.as_str()).or_default() += row.n;
    }
    if !per_state.is_empty() {
        println!();
        println!("Workflow states:");
        for (state, n) in &per_state {
            println!("  {state:<12} {n}");
        }
    }

    if !stats.tag_counts.is_empty() {
        println!();
        println!("Top tags:");
        for row in stats.tag_counts.iter().take(10) {
            println!("  {:<20} {}", row.tag, row.n);
        }
    }

    if !stats.agenda.is_empty() {
        println!();
        println!("Agenda ({} dated headings):", stats.agenda.len());
        for item in stats.agenda.iter().take(10) {
            let stamp = item
                .scheduled
                .or(item.deadline)
                .map_or_else(|| "-".to_string(), |at| at.format("%Y-%m-%d").to_string());
            println!(
                "  {stamp}  {:<9} {} ({}:{})",
                item.todo_state.as_deref().unwrap_or("-"),
                item.title,
                item.file_uri,
                item.start_line,
            );
        }
    }
}
