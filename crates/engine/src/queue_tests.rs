// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn seed(dir: &tempfile::TempDir, lines: &[&str]) -> IssueQueue {
    let beads = dir.path().join(".beads");
    std::fs::create_dir_all(&beads).unwrap();
    std::fs::write(beads.join("issues.jsonl"), lines.join("\n") + "\n").unwrap();
    IssueQueue::new(dir.path())
}

#[test]
fn counts_by_status() {
    let dir = tempfile::tempdir().unwrap();
    let queue = seed(
        &dir,
        &[
            r#"{"id":"a","status":"ready"}"#,
            r#"{"id":"b","status":"ready"}"#,
            r#"{"id":"c","status":"in_progress"}"#,
            r#"{"id":"d","status":"closed"}"#,
            r#"{"id":"e","status":"blocked","deps":["a"]}"#,
        ],
    );

    assert_eq!(queue.count_ready().unwrap(), 2);
    assert_eq!(queue.count_in_progress().unwrap(), 1);
}

#[test]
fn validate_accepts_well_formed_lines() {
    let dir = tempfile::tempdir().unwrap();
    let queue = seed(&dir, &[r#"{"id":"a","status":"ready"}"#]);
    assert_eq!(queue.validate().unwrap(), 1);
}

#[test]
fn validate_rejects_bad_line_with_number() {
    let dir = tempfile::tempdir().unwrap();
    let queue = seed(&dir, &[r#"{"id":"a"}"#, "not json"]);
    match queue.validate() {
        Err(QueueError::Malformed { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected malformed, got {other:?}"),
    }
}

#[test]
fn validate_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let queue = IssueQueue::new(dir.path());
    assert!(matches!(queue.validate(), Err(QueueError::NotFound(_))));
    assert!(!queue.exists());
}

#[test]
fn unknown_status_tolerated() {
    let dir = tempfile::tempdir().unwrap();
    let queue = seed(&dir, &[r#"{"id":"a","status":"someday"}"#]);
    let issues = queue.load().unwrap();
    assert_eq!(issues[0].status, IssueStatus::Unknown);
}

#[test]
fn detect_cycle_finds_loop() {
    let dir = tempfile::tempdir().unwrap();
    let queue = seed(
        &dir,
        &[
            r#"{"id":"a","status":"ready","deps":["b"]}"#,
            r#"{"id":"b","status":"ready","deps":["c"]}"#,
            r#"{"id":"c","status":"ready","deps":["a"]}"#,
        ],
    );
    let cycle = queue.detect_cycle().unwrap().unwrap();
    assert!(cycle.len() >= 3);
    assert_eq!(cycle.first(), cycle.last());
}

#[test]
fn detect_cycle_clean_graph() {
    let dir = tempfile::tempdir().unwrap();
    let queue = seed(
        &dir,
        &[
            r#"{"id":"a","status":"ready","deps":[]}"#,
            r#"{"id":"b","status":"ready","deps":["a"]}"#,
            r#"{"id":"c","status":"ready","deps":["a","b"]}"#,
        ],
    );
    assert!(queue.detect_cycle().unwrap().is_none());
}

#[test]
fn requeue_moves_in_progress_to_ready() {
    let dir = tempfile::tempdir().unwrap();
    let queue = seed(
        &dir,
        &[
            r#"{"id":"a","status":"in_progress","title":"keep me"}"#,
            r#"{"id":"b","status":"closed"}"#,
        ],
    );

    assert_eq!(queue.requeue_in_progress().unwrap(), 1);
    let issues = queue.load().unwrap();
    assert_eq!(issues[0].status, IssueStatus::Ready);
    assert_eq!(issues[1].status, IssueStatus::Closed);
    // Unknown fields survive the rewrite.
    assert_eq!(
        issues[0].extra.get("title").and_then(|v| v.as_str()),
        Some("keep me")
    );

    // Second call is a no-op.
    assert_eq!(queue.requeue_in_progress().unwrap(), 0);
}
