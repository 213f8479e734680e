//! Query command implementation.

use std::collections::BTreeMap;
use std::path::Path;

use orgdex_core::config::loader::ConfigLoader;
use orgdex_core::index::{Heading, HeadingFilter, HeadingStore, IndexDb, SortKey};
use orgdex_core::query::{Translator, parse};

use super::output::{
    HeadingOutput, location, print_headings_json, print_headings_quiet,
    print_headings_table,
};
use crate::{OutputFormat, QueryArgs};

pub fn run(config: Option<&Path>, profile: Option<&str>, args: QueryArgs) {
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

    let store = HeadingStore::new(&db);
    let format = resolve_format(args.output, args.json, args.quiet);

    if let Some(expr) = &args.expr {
        if has_filter_flags(&args) {
            eprintln!("Use either a query expression or filter flags, not both.");
            std::process::exit(2);
        }
        run_expression(&store, &rc.todo.done, expr, format);
        return;
    }

    let filter = filter_from_flags(&args);
    let headings = match store.find_by_criteria(&filter) {
        Ok(headings) => headings,
        Err(e) => {
            eprintln!("Error querying index: {e}");
            std::process::exit(1);
        }
    };
    print_rows(&headings, format);
}

fn run_expression(
    store: &HeadingStore,
    done_states: &[String],
    expr: &str,
    format: OutputFormat,
) {
    let ast = match parse(expr) {
        Ok(ast) => ast,
        Err(e) => {
            eprintln!("Query parse error: {e}");
            std::process::exit(2);
        }
    };

    let compiled = match Translator::new(done_states).translate(&ast) {
        Ok(compiled) => compiled,
        Err(e) => {
            eprintln!("Query error: {e}");
            std::process::exit(2);
        }
    };

    let headings = match store.find_by_ql(&compiled) {
        Ok(headings) => headings,
        Err(e) => {
            eprintln!("Error querying index: {e}");
            std::process::exit(1);
        }
    };

    match compiled.group_by.as_deref() {
        Some(key) => print_grouped(&headings, key, format),
        None => print_rows(&headings, format),
    }
}

/// Flags that translate into criteria; they conflict with an expression
/// because `find_by_ql` carries its own ordering and no limit.
fn has_filter_flags(args: &QueryArgs) -> bool {
    !args.todo.is_empty()
        || args.priority.is_some()
        || !args.tag.is_empty()
        || args.level.is_some()
        || args.file.is_some()
        || args.text.is_some()
        || args.sort.is_some()
        || args.limit.is_some()
}

fn filter_from_flags(args: &QueryArgs) -> HeadingFilter {
    let sort = args.sort.as_deref().map(|name| match SortKey::from_str(name) {
        Some(key) => key,
        None => {
            eprintln!(
                "Unknown sort key '{name}' (expected file, priority, scheduled, deadline or level)"
            );
            std::process::exit(2);
        }
    });

    HeadingFilter {
        todo_states: args.todo.clone(),
        priority: args.priority.clone(),
        tags: args.tag.clone(),
        level: args.level,
        min_level: None,
        max_level: None,
        file_uri: args.file.clone(),
        text: args.text.clone(),
        sort,
        limit: args.limit,
    }
}

fn print_rows(headings: &[Heading], format: OutputFormat) {
    match format {
        OutputFormat::Table => print_headings_table(headings),
        OutputFormat::Json => print_headings_json(headings),
        OutputFormat::Quiet => print_headings_quiet(headings),
    }
}

/// A heading lands in one bucket per value of the grouping key; with
/// `tag` it lands in one bucket per tag it carries.
fn group_members(heading: &Heading, key: &str) -> Vec<String> {
    match key {
        "todo" => {
            vec![heading.todo_state.clone().unwrap_or_else(|| "(none)".to_string())]
        }
        "priority" => {
            vec![heading.priority.clone().unwrap_or_else(|| "(none)".to_string())]
        }
        "file" => vec![heading.file_uri.clone()],
        "level" => vec![heading.level.to_string()],
        "tag" => {
            if heading.tags.is_empty() {
                vec!["(untagged)".to_string()]
            } else {
                heading.tags.clone()
            }
        }
        // The translator only emits the keys above.
        _ => vec!["(all)".to_string()],
    }
}

fn print_grouped(headings: &[Heading], key: &str, format: OutputFormat) {
    let mut groups: BTreeMap<String, Vec<Heading>> = BTreeMap::new();
    for heading in headings {
        for group in group_members(heading, key) {
            groups.entry(group).or_default().push(heading.clone());
        }
    }

    match format {
        OutputFormat::Quiet => {
            for members in groups.values() {
                for heading in members {
                    println!("{}", location(heading));
                }
            }
        }
        OutputFormat::Json => {
            let output: BTreeMap<String, Vec<HeadingOutput>> = groups
                .iter()
                .map(|(group, members)| {
                    (group.clone(), members.iter().map(HeadingOutput::from).collect())
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
        }
        OutputFormat::Table => {
            for (group, members) in &groups {
                println!("== {key}: {group} ==");
                print_headings_table(members);
                println!();
            }
        }
    }
}

/// Resolve the output format from flags.
fn resolve_format(output: OutputFormat, json: bool, quiet: bool) -> OutputFormat {
    if json {
        OutputFormat::Json
    } else if quiet {
        OutputFormat::Quiet
    } else {
        output
    }
}
