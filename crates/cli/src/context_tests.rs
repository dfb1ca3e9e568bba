// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn explicit_flags_win() {
    std::env::set_var("AO_BASE_DIR", "/tmp/env-dir");
    std::env::set_var("AO_OUTPUT", "json");
    let ctx = Context::build(
        Some(PathBuf::from("/tmp/flag-dir")),
        OutputFormat::Table,
        true,
        false,
    )
    .unwrap();
    assert_eq!(ctx.base_dir, PathBuf::from("/tmp/flag-dir"));
    // Default-valued output falls back to the env override.
    assert_eq!(ctx.output, OutputFormat::Json);
    assert!(ctx.dry_run);
    std::env::remove_var("AO_BASE_DIR");
    std::env::remove_var("AO_OUTPUT");
}

#[test]
#[serial]
fn env_base_dir_applies_when_flag_missing() {
    std::env::set_var("AO_BASE_DIR", "/tmp/env-dir");
    let ctx = Context::build(None, OutputFormat::Table, false, false).unwrap();
    assert_eq!(ctx.base_dir, PathBuf::from("/tmp/env-dir"));
    std::env::remove_var("AO_BASE_DIR");
}

#[test]
#[serial]
fn verbose_env_toggle() {
    std::env::set_var("AO_VERBOSE", "1");
    let ctx = Context::build(None, OutputFormat::Table, false, false).unwrap();
    assert!(ctx.verbose);
    std::env::remove_var("AO_VERBOSE");
}
