// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use yare::parameterized;

fn candidate(id: &str) -> Candidate {
    Candidate::new(
        id,
        KnowledgeType::Learning,
        "content",
        Source::default(),
        Utc.with_ymd_and_hms(2026, 1, 24, 10, 0, 0).unwrap(),
    )
}

#[parameterized(
    decision = { "Lead-only commit pattern", "lead-only commit pattern" },
    case_folds = { "LEAD-ONLY COMMIT PATTERN", "lead-only commit pattern" },
    whitespace = { "  lead-only   commit\n pattern  ", "lead-only commit pattern" },
    ellipsis = { "lead-only commit pattern...", "lead-only commit pattern" },
    unicode_ellipsis = { "lead-only commit pattern…", "lead-only commit pattern" },
)]
fn normalize_content_collapses(input: &str, expected: &str) {
    assert_eq!(normalize_content(input), expected);
}

#[test]
fn normalize_is_stable_under_trailing_whitespace() {
    let base = "Lead-only commit pattern";
    for n in 0..4 {
        let padded = format!("{}{}", base, "\n  ".repeat(n));
        assert_eq!(normalize_content(&padded), normalize_content(base));
    }
}

#[test]
fn content_key_is_case_insensitive() {
    let a = content_key("Lead-only commit pattern");
    let b = content_key("lead-only commit pattern");
    let c = content_key("LEAD-ONLY COMMIT PATTERN");
    assert_eq!(a, b);
    assert_eq!(b, c);
    assert_eq!(a.len(), 64);
}

#[test]
fn content_key_differs_for_different_content() {
    assert_ne!(content_key("alpha"), content_key("beta"));
}

#[parameterized(
    future_date = { "2099-12-31", false },
    past_date = { "2020-01-01", true },
    invalid = { "not-a-date", false },
    empty = { "", false },
    full_timestamp_past = { "2020-01-01T00:00:00Z", true },
    full_timestamp_future = { "2099-06-15T12:30:00Z", false },
)]
fn valid_until_expiry(raw: &str, expired: bool) {
    let now = Utc.with_ymd_and_hms(2026, 1, 24, 10, 0, 0).unwrap();
    let mut c = candidate("c1");
    c.valid_until = Some(raw.to_string());
    assert_eq!(c.is_expired(now), expired, "valid_until={raw:?}");
}

#[test]
fn no_valid_until_never_expires() {
    let now = Utc.with_ymd_and_hms(2026, 1, 24, 10, 0, 0).unwrap();
    assert!(!candidate("c1").is_expired(now));
}

#[test]
fn tier_meets_ordering() {
    assert!(Tier::Gold.meets(Tier::Bronze));
    assert!(Tier::Silver.meets(Tier::Silver));
    assert!(!Tier::Bronze.meets(Tier::Silver));
    assert!(!Tier::Discard.meets(Tier::Bronze));
}

#[test]
fn tier_parse_round_trips() {
    for tier in [Tier::Gold, Tier::Silver, Tier::Bronze, Tier::Discard] {
        assert_eq!(Tier::parse(tier.as_str()), Some(tier));
    }
    assert_eq!(Tier::parse("platinum"), None);
}

#[test]
fn candidate_json_round_trip() {
    let mut c = candidate("cand-abc123");
    c.tier = Tier::Gold;
    c.utility = 0.87;
    c.valid_until = Some("2099-12-31".to_string());
    let json = serde_json::to_string(&c).unwrap();
    let decoded: Candidate = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, c);
    assert!(json.contains("\"type\":\"learning\""));
}

#[test]
fn candidate_defaults_apply_on_sparse_json() {
    let sparse = r#"{"id":"c1","type":"decision","content":"x","extracted_at":"2026-01-24T10:00:00Z"}"#;
    let c: Candidate = serde_json::from_str(sparse).unwrap();
    assert_eq!(c.utility, INITIAL_UTILITY);
    assert!(c.is_current);
    assert_eq!(c.maturity, Maturity::Provisional);
    assert_eq!(c.supersession_depth, 0);
}

#[test]
fn supersession_chain_valid() {
    let mut a = candidate("a");
    let mut b = candidate("b");
    let mut c = candidate("c");
    a.is_current = false;
    a.superseded_by = Some(CandidateId::new("b"));
    b.is_current = false;
    b.supersedes = Some(CandidateId::new("a"));
    b.superseded_by = Some(CandidateId::new("c"));
    b.supersession_depth = 1;
    c.supersedes = Some(CandidateId::new("b"));
    c.supersession_depth = 2;

    assert!(supersession_issues(&[&a, &b, &c]).is_empty());
}

#[test]
fn supersession_chain_flags_two_current() {
    let mut a = candidate("a");
    let b = candidate("b");
    a.superseded_by = Some(CandidateId::new("b"));
    let issues = supersession_issues(&[&a, &b]);
    assert!(issues.iter().any(|i| i.contains("exactly one current")));
}

#[test]
fn supersession_chain_flags_depth_gap() {
    let mut a = candidate("a");
    let mut b = candidate("b");
    a.is_current = false;
    b.supersedes = Some(CandidateId::new("a"));
    b.supersession_depth = 3;
    let issues = supersession_issues(&[&a, &b]);
    assert!(issues.iter().any(|i| i.contains("does not follow")));
}

#[test]
fn supersession_chain_flags_excess_depth() {
    let mut d = candidate("d");
    d.supersession_depth = MAX_SUPERSESSION_DEPTH + 1;
    let issues = supersession_issues(&[&d]);
    assert!(issues.iter().any(|i| i.contains("max supersession depth")));
}
