// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::{TimeZone, Utc};
use yare::parameterized;

#[parameterized(
    seconds = { 30, "30s" },
    minutes = { 150, "2m" },
    hours = { 7200, "2h" },
    days = { 200_000, "2d" },
)]
fn age_formatting(delta_secs: i64, expected: &str) {
    let now = Utc.with_ymd_and_hms(2026, 1, 25, 12, 0, 0).unwrap();
    let then = now - chrono::Duration::seconds(delta_secs);
    assert_eq!(format_age(then, now), expected);
}

#[test]
fn truncate_keeps_short_strings() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a much longer string here", 10), "a much...");
}

#[test]
fn output_format_parses_aliases() {
    assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
    assert_eq!(OutputFormat::parse("TABLE"), Some(OutputFormat::Table));
    assert_eq!(OutputFormat::parse("text"), Some(OutputFormat::Table));
    assert_eq!(OutputFormat::parse("yamlish"), None);
}
