// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn record_parses_with_unknown_fields() {
    let line = r#"{"type":"assistant","role":"assistant","session_id":"s-1",
        "timestamp":"2026-01-24T10:30:00Z","content":"hello","uuid":"x","cwd":"/tmp"}"#
        .replace('\n', "");
    let record: TranscriptRecord = serde_json::from_str(&line).unwrap();
    assert_eq!(record.kind, "assistant");
    assert_eq!(record.session_id, "s-1");
    assert!(record.timestamp.is_some());
    assert!(record.tools.is_empty());
}

#[test]
fn record_tolerates_bad_timestamp() {
    let line = r#"{"type":"user","timestamp":"yesterday","content":"hi"}"#;
    let record: TranscriptRecord = serde_json::from_str(line).unwrap();
    assert!(record.timestamp.is_none());
    assert_eq!(record.content, "hi");
}

#[test]
fn tool_call_file_path_prefers_file_path_key() {
    let tool: ToolCall = serde_json::from_str(
        r#"{"name":"Edit","input":{"file_path":"/a.rs","path":"/b.rs"},"output":"ok"}"#,
    )
    .unwrap();
    assert_eq!(tool.file_path(), Some("/a.rs"));
}

#[test]
fn tool_call_file_path_falls_back_to_path() {
    let tool: ToolCall =
        serde_json::from_str(r#"{"name":"Glob","input":{"path":"/src"}}"#).unwrap();
    assert_eq!(tool.file_path(), Some("/src"));
}

#[test]
fn tool_call_without_paths_returns_none() {
    let tool: ToolCall =
        serde_json::from_str(r#"{"name":"Bash","input":{"command":"ls"}}"#).unwrap();
    assert_eq!(tool.file_path(), None);
}

#[test]
fn parse_timestamp_accepts_date_only() {
    let ts = parse_timestamp("2026-01-24").unwrap();
    assert_eq!(ts.to_rfc3339(), "2026-01-24T00:00:00+00:00");
}
