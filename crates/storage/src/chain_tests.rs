// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ao_core::ratchet::ArtifactTier;
use chrono::{TimeZone, Utc};

fn ts(minute: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 24, 9, minute, 0).unwrap()
}

fn loaded(dir: &tempfile::TempDir) -> Chain {
    Chain::load(dir.path()).unwrap()
}

#[test]
fn append_persists_and_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let mut chain = loaded(&dir);
    chain
        .append(ChainEntry::recorded(Step::Research, "research/topic.md", ts(0)))
        .unwrap();

    let reloaded = loaded(&dir);
    assert_eq!(reloaded.entries.len(), 1);
    assert_eq!(reloaded.entries[0].output, "research/topic.md");
}

#[test]
fn status_reflects_latest_entry() {
    let dir = tempfile::tempdir().unwrap();
    let mut chain = loaded(&dir);
    assert_eq!(chain.status(Step::Research), StepStatus::Pending);

    chain
        .append(ChainEntry::recorded(Step::Research, "research/a.md", ts(0)).unlocked())
        .unwrap();
    assert_eq!(chain.status(Step::Research), StepStatus::InProgress);

    chain
        .append(ChainEntry::recorded(Step::Research, "research/a.md", ts(1)))
        .unwrap();
    assert_eq!(chain.status(Step::Research), StepStatus::Locked);

    chain
        .append(ChainEntry::skip(Step::PreMortem, "bug fix", ts(2)))
        .unwrap();
    assert_eq!(chain.status(Step::PreMortem), StepStatus::Skipped);
}

#[test]
fn locked_pair_rejects_unlocked_followup() {
    let dir = tempfile::tempdir().unwrap();
    let mut chain = loaded(&dir);
    chain
        .append(ChainEntry::recorded(Step::Plan, "epic:ol-0001", ts(0)))
        .unwrap();

    let err = chain.append(ChainEntry::recorded(Step::Plan, "epic:ol-0001", ts(1)).unlocked());
    assert!(matches!(err, Err(ChainError::LockedConflict { .. })));
    // A fresh locked entry for the same step is still allowed.
    chain
        .append(ChainEntry::recorded(Step::Plan, "epic:ol-0002", ts(2)))
        .unwrap();
}

#[test]
fn gate_requires_locked_prerequisite() {
    let dir = tempfile::tempdir().unwrap();
    let mut chain = loaded(&dir);

    assert!(chain.check_gate(Step::Research).passed);
    assert!(!chain.check_gate(Step::Plan).passed);

    chain
        .append(ChainEntry::recorded(Step::Research, "research/a.md", ts(0)))
        .unwrap();
    let gate = chain.check_gate(Step::Plan);
    assert!(gate.passed);
    assert_eq!(gate.input.as_deref(), Some("research/a.md"));
}

#[test]
fn gate_accepts_documented_skip() {
    let dir = tempfile::tempdir().unwrap();
    let mut chain = loaded(&dir);
    chain
        .append(ChainEntry::recorded(Step::Research, "research/a.md", ts(0)))
        .unwrap();
    chain
        .append(ChainEntry::skip(Step::PreMortem, "bug fix, no spec needed", ts(1)))
        .unwrap();

    // PreMortem gates on Research; Plan also gates on Research. The skip
    // does not poison anything downstream.
    assert!(chain.check_gate(Step::Plan).passed);
}

#[test]
fn gate_fails_on_unlocked_prerequisite() {
    let dir = tempfile::tempdir().unwrap();
    let mut chain = loaded(&dir);
    chain
        .append(ChainEntry::recorded(Step::Research, "research/a.md", ts(0)).unlocked())
        .unwrap();
    let gate = chain.check_gate(Step::Plan);
    assert!(!gate.passed);
    assert!(gate.message.contains("not locked"));
}

#[test]
fn trace_walks_inputs_backward() {
    let dir = tempfile::tempdir().unwrap();
    let mut chain = loaded(&dir);
    // e1: research → spec; e2: unrelated; e3: spec → epic
    chain
        .append(ChainEntry::recorded(Step::Research, "specs/spec-v1.md", ts(0)))
        .unwrap();
    chain
        .append(ChainEntry::recorded(Step::Research, "research/other.md", ts(1)))
        .unwrap();
    chain
        .append(
            ChainEntry::recorded(Step::Plan, "epic:ol-0001", ts(2))
                .with_input("specs/spec-v1.md"),
        )
        .unwrap();

    let trace = chain.trace("epic:ol-0001");
    assert_eq!(trace.len(), 2);
    assert_eq!(trace[0].step, Step::Research);
    assert_eq!(trace[0].output, "specs/spec-v1.md");
    assert_eq!(trace[1].step, Step::Plan);
}

#[test]
fn trace_of_unknown_artifact_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let chain = loaded(&dir);
    assert!(chain.trace("nothing.md").is_empty());
}

#[test]
fn promotion_entries_carry_tier() {
    let dir = tempfile::tempdir().unwrap();
    let mut chain = loaded(&dir);
    chain
        .append(
            ChainEntry::recorded(Step::Promotion, ".agents/learnings", ts(0))
                .with_input(".agents/candidates/insight.md")
                .with_tier(ArtifactTier::Learning),
        )
        .unwrap();

    let reloaded = loaded(&dir);
    assert_eq!(reloaded.entries[0].tier, Some(ArtifactTier::Learning));
}

#[test]
fn partial_trailing_line_does_not_block_load_or_append() {
    let dir = tempfile::tempdir().unwrap();
    let mut chain = loaded(&dir);
    chain
        .append(ChainEntry::recorded(Step::Research, "research/a.md", ts(0)))
        .unwrap();

    // Crash-simulated partial line at EOF.
    use std::io::Write as _;
    let mut f = std::fs::OpenOptions::new()
        .append(true)
        .open(chain.path())
        .unwrap();
    f.write_all(b"{\"step\":\"plan\",\"time").unwrap();
    drop(f);

    let reloaded = loaded(&dir);
    assert_eq!(reloaded.entries.len(), 1);
}
