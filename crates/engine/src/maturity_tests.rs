// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use yare::parameterized;

fn record(
    maturity: Maturity,
    utility: f64,
    reward: u32,
    helpful: u32,
    harmful: u32,
) -> LearningRecord {
    LearningRecord {
        id: "l1".to_string(),
        maturity,
        utility,
        reward_count: reward,
        helpful_count: helpful,
        harmful_count: harmful,
        ..LearningRecord::default()
    }
}

#[parameterized(
    provisional_promotes = {
        record(Maturity::Provisional, 0.72, 3, 3, 0), Maturity::Candidate, true
    },
    provisional_needs_rewards = {
        record(Maturity::Provisional, 0.9, 2, 2, 0), Maturity::Provisional, false
    },
    provisional_needs_utility = {
        record(Maturity::Provisional, 0.69, 5, 5, 0), Maturity::Provisional, false
    },
    candidate_establishes = {
        record(Maturity::Candidate, 0.75, 5, 4, 1), Maturity::Established, true
    },
    candidate_blocked_by_harm = {
        record(Maturity::Candidate, 0.75, 5, 2, 2), Maturity::Candidate, false
    },
    candidate_demotes = {
        record(Maturity::Candidate, 0.25, 4, 1, 3), Maturity::Provisional, true
    },
    candidate_holds = {
        record(Maturity::Candidate, 0.5, 4, 2, 1), Maturity::Candidate, false
    },
    established_demotes = {
        record(Maturity::Established, 0.45, 9, 5, 4), Maturity::Candidate, true
    },
    established_holds = {
        record(Maturity::Established, 0.55, 9, 5, 4), Maturity::Established, false
    },
    anti_pattern_fires = {
        record(Maturity::Candidate, 0.15, 9, 1, 6), Maturity::AntiPattern, true
    },
    rehabilitation = {
        record(Maturity::AntiPattern, 0.65, 9, 7, 3), Maturity::Provisional, true
    },
    rehabilitation_blocked = {
        record(Maturity::AntiPattern, 0.65, 9, 6, 3), Maturity::AntiPattern, false
    },
)]
fn transitions(record: LearningRecord, expected: Maturity, fires: bool) {
    let result = MaturityEngine::check(&record);
    assert_eq!(result.new_maturity, expected, "{}", result.reason);
    assert_eq!(result.transitioned, fires, "{}", result.reason);
}

#[test]
fn anti_pattern_rule_has_priority() {
    // Would qualify for promotion on counts, but the anti-pattern gate
    // catches the low utility first.
    let r = record(Maturity::Provisional, 0.2, 10, 0, 5);
    let result = MaturityEngine::check(&r);
    assert_eq!(result.new_maturity, Maturity::AntiPattern);
}

#[test]
fn anti_pattern_is_idempotent() {
    let r = record(Maturity::AntiPattern, 0.1, 9, 0, 9);
    let result = MaturityEngine::check(&r);
    assert_eq!(result.new_maturity, Maturity::AntiPattern);
    assert!(!result.transitioned);
}

#[test]
fn promotion_reason_names_both_thresholds() {
    let r = record(Maturity::Provisional, 0.72, 3, 3, 0);
    let result = MaturityEngine::check(&r);
    assert!(result.reason.contains("0.72 >= 0.70"), "{}", result.reason);
    assert!(result.reason.contains("3 >= 3"), "{}", result.reason);
}

#[test]
fn apply_updates_record_atomically() {
    let dir = tempfile::tempdir().unwrap();
    let store = LearningStore::new(dir.path());
    let path = store
        .create(&record(Maturity::Provisional, 0.72, 3, 3, 0))
        .unwrap();

    let engine = MaturityEngine::new(dir.path());
    let now = Utc.with_ymd_and_hms(2026, 1, 24, 12, 0, 0).unwrap();
    let result = engine.apply(&path, now).unwrap();
    assert!(result.transitioned);

    let updated = store.read(&path).unwrap();
    assert_eq!(updated.maturity, Maturity::Candidate);
    assert_eq!(updated.maturity_changed_at, Some(now));
    assert_eq!(updated.maturity_reason, Some(result.reason));
}

#[test]
fn apply_without_transition_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let store = LearningStore::new(dir.path());
    let path = store
        .create(&record(Maturity::Provisional, 0.5, 0, 0, 0))
        .unwrap();
    let before = std::fs::read_to_string(&path).unwrap();

    let engine = MaturityEngine::new(dir.path());
    let now = Utc.with_ymd_and_hms(2026, 1, 24, 12, 0, 0).unwrap();
    let result = engine.apply(&path, now).unwrap();
    assert!(!result.transitioned);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn scan_reports_only_pending_transitions() {
    let dir = tempfile::tempdir().unwrap();
    let store = LearningStore::new(dir.path());
    store
        .create(&LearningRecord {
            id: "ready".to_string(),
            ..record(Maturity::Provisional, 0.8, 4, 4, 0)
        })
        .unwrap();
    store
        .create(&LearningRecord {
            id: "steady".to_string(),
            ..record(Maturity::Provisional, 0.5, 0, 0, 0)
        })
        .unwrap();

    let engine = MaturityEngine::new(dir.path());
    let pending = engine.scan();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].1.learning_id, "ready");
}
