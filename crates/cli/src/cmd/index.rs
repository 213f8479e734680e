//! Index command implementation.

use std::path::Path;

use orgdex_core::config::loader::ConfigLoader;
use orgdex_core::index::{IndexDb, WorkspaceIndexer};
use orgdex_core::org::TodoVocabulary;
use orgdex_core::workspace::WalkdirProvider;
use tracing::debug;

use crate::logging;
use crate::IndexArgs;

pub fn run(config: Option<&Path>, profile: Option<&str>, args: &IndexArgs) {
    let mut rc = match ConfigLoader::load(config, profile) {
        Ok(rc) => rc,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            std::process::exit(1);
        }
    };
    if args.verbose {
        rc.logging.level = "debug".to_string();
    }
    logging::init(&rc);
    debug!("Resolved profile '{}', index at {}", rc.active_profile, rc.index_path().display());

    if let Err(e) = std::fs::create_dir_all(&rc.index_dir) {
        eprintln!("Error creating index directory: {e}");
        std::process::exit(1);
    }

    let db = match IndexDb::open(&rc.index_path()) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Error opening index database: {e}");
            std::process::exit(1);
        }
    };

    let provider = match WalkdirProvider::new(&rc.workspace_root) {
        Ok(provider) => provider,
        Err(e) => {
            eprintln!("Error opening workspace: {e}");
            std::process::exit(1);
        }
    };

    println!("Indexing workspace: {}", rc.workspace_root.display());

    let vocabulary = TodoVocabulary::new(rc.todo.keywords.clone(), rc.todo.done.clone());
    let indexer = WorkspaceIndexer::new(&db, provider, rc.file_pattern.clone(), vocabulary);

    match indexer.index_workspace(args.force) {
        Ok(stats) => {
            println!();
            println!("Indexing complete:");
            println!("  Files found:      {}", stats.files_found);
            println!("  Files indexed:    {}", stats.files_indexed);
            if stats.files_skipped > 0 {
                println!("  Files skipped:    {}", stats.files_skipped);
            }
            if stats.files_failed > 0 {
                println!("  Files failed:     {}", stats.files_failed);
            }
            println!("  Headings indexed: {}", stats.headings_indexed);
            println!("  Links indexed:    {}", stats.links_indexed);
            println!("  Duration:         {}ms", stats.duration_ms);
            println!();
            println!("Index stored at: {}", rc.index_path().display());
        }
        Err(e) => {
            eprintln!("Error during indexing: {e}");
            std::process::exit(1);
        }
    }
}
