// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::output::OutputFormat;

fn ctx(dir: &tempfile::TempDir) -> Context {
    Context {
        base_dir: dir.path().to_path_buf(),
        output: OutputFormat::Table,
        dry_run: false,
        verbose: false,
    }
}

#[test]
fn record_then_status_shows_locked() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = ctx(&dir);
    record(
        &ctx,
        "research",
        None,
        "research/topic.md".to_string(),
        None,
        true,
    )
    .unwrap();

    let chain = Chain::load(&ctx.base_dir).unwrap();
    assert_eq!(chain.status(Step::Research), ao_core::StepStatus::Locked);
}

#[test]
fn record_rejects_bad_tier() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = ctx(&dir);
    let err = record(&ctx, "research", None, "x".to_string(), Some(9), true);
    assert!(err.is_err());
}

#[test]
fn skip_requires_reason() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = ctx(&dir);
    assert!(skip(&ctx, "pre-mortem", "  ").is_err());
    skip(&ctx, "pre-mortem", "bug fix").unwrap();

    let chain = Chain::load(&ctx.base_dir).unwrap();
    assert_eq!(chain.status(Step::PreMortem), ao_core::StepStatus::Skipped);
}

#[test]
fn dry_run_record_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut c = ctx(&dir);
    c.dry_run = true;
    record(&c, "research", None, "research/x.md".to_string(), None, true).unwrap();
    assert!(Chain::load(&c.base_dir).unwrap().entries.is_empty());
}

#[test]
fn migrate_adds_schema_marker_once() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = ctx(&dir);
    let agents = dir.path().join(".agents/learnings");
    std::fs::create_dir_all(&agents).unwrap();
    let file = agents.join("old.md");
    std::fs::write(&file, "# Old Learning\n\nBody text.\n").unwrap();

    migrate(&ctx, Path::new(".agents")).unwrap();
    let content = std::fs::read_to_string(&file).unwrap();
    assert!(content.contains("**Schema Version:** 1"));
    let first_marker = content.find("Schema Version").unwrap();
    assert_eq!(content[first_marker..].matches("Schema Version").count(), 1);

    // Second run skips it.
    migrate(&ctx, Path::new(".agents")).unwrap();
    let again = std::fs::read_to_string(&file).unwrap();
    assert_eq!(again.matches("Schema Version").count(), 1);
}

#[test]
fn unknown_step_is_an_error() {
    assert!(parse_step("deploy").is_err());
    assert_eq!(parse_step("autopilot").unwrap(), Step::Crank);
}
