use orgdex_core::config::loader::ConfigLoader;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn write_file(path: &PathBuf, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

#[test]
fn load_default_profile_ok() {
    let tmp = tempdir().unwrap();
    let cfg_path = tmp.path().join("config.toml");
    let toml = r#"
version = 1
profile = "default"

[profiles.default]
workspace_root = "/tmp/notes"
file_pattern = "**/*.org"

[todo]
keywords = ["TODO", "NEXT", "WAIT"]
done = ["DONE", "CANCELLED"]

[watch]
debounce_ms = 250
"#;

    write_file(&cfg_path, toml);

    let rc = ConfigLoader::load(Some(&cfg_path), None).expect("should load");
    assert_eq!(rc.active_profile, "default");
    assert_eq!(rc.workspace_root.display().to_string(), "/tmp/notes");
    assert_eq!(rc.file_pattern, "**/*.org");
    assert!(rc.index_dir.ends_with(".orgdex"));
    assert!(rc.index_path().ends_with(".orgdex/index.db"));
    assert_eq!(rc.todo.keywords, vec!["TODO", "NEXT", "WAIT"]);
    assert_eq!(rc.todo.done, vec!["DONE", "CANCELLED"]);
    assert_eq!(rc.watch.debounce_ms, 250);
}

#[test]
fn load_with_profile_override_ok() {
    let tmp = tempdir().unwrap();
    let cfg_path = tmp.path().join("orgdex/config.toml");
    let toml = r#"
version = 1
profile = "default"

[profiles.default]
workspace_root = "/tmp/def"

[profiles.work]
workspace_root = "/tmp/work"
index_dir = "{{workspace_root}}/.cache/orgdex"
"#;
    write_file(&cfg_path, toml);

    let rc = ConfigLoader::load(Some(&cfg_path), Some("work")).expect("should load");
    assert_eq!(rc.active_profile, "work");
    assert_eq!(rc.workspace_root.display().to_string(), "/tmp/work");
    assert_eq!(rc.index_dir.display().to_string(), "/tmp/work/.cache/orgdex");
}

#[test]
fn defaults_fill_missing_sections() {
    let tmp = tempdir().unwrap();
    let cfg_path = tmp.path().join("config.toml");
    let toml = r#"
version = 1

[profiles.default]
workspace_root = "/tmp/min"
"#;
    write_file(&cfg_path, toml);

    let rc = ConfigLoader::load(Some(&cfg_path), None).expect("should load");
    assert_eq!(rc.file_pattern, "**/*.org");
    assert_eq!(rc.watch.debounce_ms, 400);
    assert_eq!(rc.logging.level, "info");
    assert!(rc.todo.keywords.contains(&"TODO".to_string()));
    assert!(rc.todo.done.contains(&"DONE".to_string()));
}
