//! Watch command implementation.

use std::path::Path;
use std::time::Duration;

use orgdex_core::config::loader::ConfigLoader;
use orgdex_core::index::IndexDb;
use orgdex_core::org::TodoVocabulary;
use orgdex_core::watch::UpdateService;
use tracing::debug;

use crate::logging;

pub fn run(config: Option<&Path>, profile: Option<&str>) {
    let rc = match ConfigLoader::load(config, profile) {
        Ok(rc) => rc,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            std::process::exit(1);
        }
    };
    logging::init(&rc);

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

    let vocabulary = TodoVocabulary::new(rc.todo.keywords.clone(), rc.todo.done.clone());
    let debounce = Duration::from_millis(rc.watch.debounce_ms);
    debug!("Debounce window: {}ms", rc.watch.debounce_ms);

    let service = match UpdateService::new(
        &db,
        &rc.workspace_root,
        &rc.file_pattern,
        vocabulary,
        debounce,
    ) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Error starting watcher: {e}");
            std::process::exit(1);
        }
    };

    // Catch up on anything changed while we were not running.
    match service.scan(false) {
        Ok(Some(stats)) => {
            println!(
                "Initial scan: {} indexed, {} skipped, {} failed",
                stats.files_indexed, stats.files_skipped, stats.files_failed
            );
        }
        Ok(None) => {}
        Err(e) => {
            eprintln!("Error during initial scan: {e}");
            std::process::exit(1);
        }
    }

    println!("Watching {} (press Ctrl-C to stop)", rc.workspace_root.display());
    if let Err(e) = service.run() {
        eprintln!("Watch error: {e}");
        std::process::exit(1);
    }
}
