use std::path::Path;

use orgdex_core::config::loader::{ConfigLoader, default_config_path};
use orgdex_core::index::IndexDb;

pub fn run(config: Option<&Path>, profile: Option<&str>) {
    let rc = match ConfigLoader::load(config, profile) {
        Ok(rc) => rc,
        Err(e) => {
            println!("FAIL odx doctor");
            println!("{e}");
            if config.is_none() {
                println!("looked for: {}", default_config_path().display());
            }
            std::process::exit(1);
        }
    };

    println!("OK   odx doctor");
    println!(
        "config: {}",
        config.map_or_else(
            || default_config_path().display().to_string(),
            |p| p.display().to_string()
        )
    );
    println!("profile: {}", rc.active_profile);
    println!("workspace_root: {}", rc.workspace_root.display());
    println!("file_pattern: {}", rc.file_pattern);
    println!("index: {}", rc.index_path().display());

    if let Err(e) = std::fs::create_dir_all(&rc.index_dir) {
        println!("FAIL creating index directory: {e}");
        std::process::exit(1);
    }

    let db = match IndexDb::open(&rc.index_path()) {
        Ok(db) => db,
        Err(e) => {
            println!("FAIL opening index: {e}");
            std::process::exit(1);
        }
    };

    match db.schema_version() {
        Ok(version) => println!("schema_version: {version}"),
        Err(e) => {
            println!("FAIL reading schema version: {e}");
            std::process::exit(1);
        }
    }

    match db.verify() {
        Ok(true) => println!("verify: ok"),
        Ok(false) => {
            println!("verify: FAILED (run 'odx reset --yes' to rebuild)");
            std::process::exit(1);
        }
        Err(e) => {
            println!("FAIL verifying index: {e}");
            std::process::exit(1);
        }
    }
}
