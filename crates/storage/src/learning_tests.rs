// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn store(dir: &tempfile::TempDir) -> LearningStore {
    LearningStore::new(dir.path())
}

fn seed(store: &LearningStore, id: &str, utility: f64) -> PathBuf {
    let record = LearningRecord {
        id: id.to_string(),
        title: format!("Learning {id}"),
        utility,
        ..LearningRecord::default()
    };
    store.create(&record).unwrap()
}

#[test]
fn create_and_read_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let path = seed(&store, "l1", 0.6);

    let record = store.read(&path).unwrap();
    assert_eq!(record.id, "l1");
    assert_eq!(record.utility, 0.6);
    assert_eq!(record.maturity, Maturity::Provisional);
}

#[test]
fn update_rewrites_first_line_only() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let path = seed(&store, "l1", 0.5);

    // Append a history line that the update must preserve.
    use std::io::Write as _;
    let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    writeln!(f, "{{\"event\":\"cited\"}}").unwrap();
    drop(f);

    let updated = store
        .update(&path, |r| {
            r.utility = 0.64;
            r.reward_count += 1;
        })
        .unwrap();
    assert_eq!(updated.utility, 0.64);

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("0.64"));
    assert_eq!(lines[1], "{\"event\":\"cited\"}");
}

#[test]
fn update_preserves_unknown_fields() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    std::fs::create_dir_all(store.dir()).unwrap();
    let path = store.dir().join("legacy.jsonl");
    std::fs::write(
        &path,
        "{\"id\":\"legacy\",\"utility\":0.5,\"origin\":\"session-1\"}\n",
    )
    .unwrap();

    store.update(&path, |r| r.utility = 0.55).unwrap();

    let record = store.read(&path).unwrap();
    assert_eq!(
        record.extra.get("origin").and_then(|v| v.as_str()),
        Some("session-1")
    );
}

#[test]
fn read_defaults_id_to_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    std::fs::create_dir_all(store.dir()).unwrap();
    let path = store.dir().join("anon.jsonl");
    std::fs::write(&path, "{\"utility\":0.4}\n").unwrap();

    let record = store.read(&path).unwrap();
    assert_eq!(record.id, "anon.jsonl");
}

#[test]
fn empty_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    std::fs::create_dir_all(store.dir()).unwrap();
    let path = store.dir().join("empty.jsonl");
    std::fs::write(&path, "").unwrap();
    assert!(matches!(store.read(&path), Err(LearningError::Empty(_))));
}

#[test]
fn list_files_includes_md_and_jsonl() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    seed(&store, "l1", 0.5);
    std::fs::write(store.dir().join("note.md"), "# Note\n").unwrap();
    std::fs::write(store.dir().join("ignore.txt"), "x").unwrap();

    let files = store.list_files();
    assert_eq!(files.len(), 2);
}

#[test]
fn find_by_name_resolves() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    seed(&store, "l1", 0.5);

    let found = store.find_by_name("l1.jsonl").unwrap();
    assert!(found.ends_with("l1.jsonl"));
    assert!(matches!(
        store.find_by_name("missing.jsonl"),
        Err(LearningError::NotFound(_))
    ));
}
