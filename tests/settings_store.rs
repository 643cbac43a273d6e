//! Settings store behaviour against real files in a temporary directory.

use dropstack_cli::settings::schema::Placement;
use dropstack_cli::settings::{DEFAULT_URL, GLOBAL_FILE_NAME, PROJECT_FILE_NAME};
use dropstack_cli::{LoadOutcome, Settings, SettingsError, SettingsPaths, SettingsStore};
use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;

fn store(dir: &TempDir) -> SettingsStore {
    SettingsStore::new(SettingsPaths::new(
        dir.path().join("project").join(PROJECT_FILE_NAME),
        dir.path().join("home").join(GLOBAL_FILE_NAME),
    ))
}

fn settings(value: Value) -> Settings {
    serde_json::from_value(value).unwrap()
}

fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn load_without_files_returns_defaults() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);

    match store.load(&Settings::new()) {
        LoadOutcome::Defaults(s) => {
            assert_eq!(s.url(), Some(DEFAULT_URL));
            assert!(s.token().is_none());
        }
        other => panic!("expected defaults, got {other:?}"),
    }
}

#[test]
fn save_splits_identity_and_project_fields() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let s = settings(json!({
        "username": "u",
        "token": "t",
        "url": "https://api.example",
        "alias": "x",
        "password": "p",
        "message": "Logged in",
        "variables": ["A=1", "B=2"],
    }));

    store.save(&s).unwrap();

    assert_eq!(
        read_json(&store.paths().global),
        json!({"username": "u", "token": "t", "url": "https://api.example"})
    );
    assert_eq!(
        read_json(&store.paths().project),
        json!({"alias": "x", "variables": "A=1,B=2"})
    );
}

#[test]
fn round_trip_keeps_alias_and_never_reads_secrets_from_project() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let s = settings(json!({"username": "u", "token": "t", "alias": "x", "password": "p"}));
    store.save(&s).unwrap();

    let loaded = store.load(&Settings::new()).into_settings();
    assert_eq!(loaded.get_str("alias"), Some("x"));
    assert_eq!(loaded.username(), Some("u"));
    assert_eq!(loaded.token(), Some("t"));
    assert!(!loaded.contains_key("password"));

    // Without the global file, identity is gone: the project file never had it.
    store.remove_global_file().unwrap();
    let loaded = store.load(&Settings::new()).into_settings();
    assert_eq!(loaded.get_str("alias"), Some("x"));
    assert!(loaded.token().is_none());
    assert!(loaded.username().is_none());
}

#[test]
fn saving_twice_writes_identical_bytes() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let s = settings(json!({
        "username": "u",
        "token": "t",
        "alias": "x",
        "domain": "x.example",
        "mappings": {"b": 2, "a": 1},
    }));

    store.save(&s).unwrap();
    let global = fs::read(&store.paths().global).unwrap();
    let project = fs::read(&store.paths().project).unwrap();

    store.save(&s).unwrap();
    assert_eq!(fs::read(&store.paths().global).unwrap(), global);
    assert_eq!(fs::read(&store.paths().project).unwrap(), project);
}

#[test]
fn array_variables_override_replaces_file_value() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    store.save(&settings(json!({"variables": "c,d"}))).unwrap();

    let loaded = store
        .load(&settings(json!({"variables": ["a", "b"]})))
        .into_settings();
    assert_eq!(loaded.get_str("variables"), Some("a,b"));
}

#[test]
fn url_override_beats_global_file() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    store
        .save(&settings(json!({"username": "u", "url": "https://saved.example"})))
        .unwrap();

    let loaded = store.load(&Settings::new()).into_settings();
    assert_eq!(loaded.url(), Some("https://saved.example"));

    let loaded = store
        .load(&settings(json!({"url": "https://flag.example"})))
        .into_settings();
    assert_eq!(loaded.url(), Some("https://flag.example"));
}

#[test]
fn corrupt_project_file_is_reported_and_global_still_loads() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    store
        .save(&settings(json!({"username": "u", "token": "t", "alias": "x"})))
        .unwrap();
    fs::write(&store.paths().project, "{ not json").unwrap();

    let outcome = store.load(&Settings::new());
    assert_eq!(outcome.settings().username(), Some("u"));
    assert_eq!(outcome.settings().token(), Some("t"));
    assert!(!outcome.settings().contains_key("alias"));
    assert_eq!(outcome.writable(), vec![Placement::Global]);

    match outcome {
        LoadOutcome::Failed { errors, .. } => {
            assert_eq!(errors.len(), 1);
            match &errors[0] {
                (Placement::Project, SettingsError::Parse { path, .. }) => {
                    assert_eq!(path, &store.paths().project);
                }
                other => panic!("expected a project parse failure, got {other:?}"),
            }
        }
        other => panic!("expected a failed load, got {other:?}"),
    }
}

#[test]
fn corrupt_global_file_keeps_project_settings() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    store.save(&settings(json!({"alias": "x"}))).unwrap();
    fs::write(&store.paths().global, "[]").unwrap();

    let outcome = store.load(&Settings::new());
    assert!(matches!(outcome, LoadOutcome::Failed { .. }));
    assert_eq!(outcome.writable(), vec![Placement::Project]);
    assert_eq!(outcome.settings().get_str("alias"), Some("x"));
}

#[test]
fn clean_load_allows_writing_both_files() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let outcome = store.load(&Settings::new());
    assert_eq!(
        outcome.writable(),
        vec![Placement::Global, Placement::Project]
    );
}

#[test]
fn save_layers_leaves_other_file_alone() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    fs::create_dir_all(store.paths().project.parent().unwrap()).unwrap();
    fs::write(&store.paths().project, "{ not json").unwrap();

    let s = settings(json!({"username": "u", "alias": "x"}));
    store.save_layers(&s, &[Placement::Global]).unwrap();

    assert_eq!(read_json(&store.paths().global), json!({"username": "u"}));
    assert_eq!(
        fs::read_to_string(&store.paths().project).unwrap(),
        "{ not json"
    );
}

#[test]
fn failed_global_write_still_writes_project() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    // A directory where the global file should be makes that write fail.
    fs::create_dir_all(&store.paths().global).unwrap();

    let s = settings(json!({"username": "u", "alias": "x"}));
    let err = store.save(&s).unwrap_err();
    assert!(matches!(err, SettingsError::Write { .. }));
    assert_eq!(read_json(&store.paths().project), json!({"alias": "x"}));
    assert_eq!(s.username(), Some("u"));
}

#[test]
fn remove_deletes_files_and_tolerates_absence() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    store
        .save(&settings(json!({"username": "u", "alias": "x"})))
        .unwrap();
    assert!(store.paths().project.exists());
    assert!(store.paths().global.exists());

    store.remove().unwrap();
    assert!(!store.paths().project.exists());
    store.remove_project_file().unwrap();

    store.remove_global_file().unwrap();
    assert!(!store.paths().global.exists());
    store.remove_global_file().unwrap();
}
