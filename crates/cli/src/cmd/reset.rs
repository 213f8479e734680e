//! Reset command implementation.

use std::path::Path;

use orgdex_core::config::loader::ConfigLoader;
use orgdex_core::index::IndexDb;

use crate::ResetArgs;

pub fn run(config: Option<&Path>, profile: Option<&str>, args: &ResetArgs) {
    let rc = match ConfigLoader::load(config, profile) {
        Ok(rc) => rc,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            std::process::exit(1);
        }
    };

    if !args.yes {
        eprintln!("Refusing to reset without --yes (drops all indexed data).");
        std::process::exit(2);
    }

    let index_path = rc.index_path();
    if !index_path.exists() {
        println!("No index at {}; nothing to reset.", index_path.display());
        return;
    }

    let db = match IndexDb::open(&index_path) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Error opening index: {e}");
            std::process::exit(1);
        }
    };

    match db.reset() {
        Ok(()) => println!("Index reset: {}", index_path.display()),
        Err(e) => {
            eprintln!("Error resetting index: {e}");
            std::process::exit(1);
        }
    }
}
