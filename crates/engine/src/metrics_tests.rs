// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ao_storage::LearningRecord;
use chrono::TimeZone;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 24, 12, 0, 0).unwrap()
}

fn seed_learning(base: &Path, id: &str, utility: f64, created: DateTime<Utc>) -> PathBuf {
    LearningStore::new(base)
        .create(&LearningRecord {
            id: id.to_string(),
            utility,
            created_at: Some(created),
            ..LearningRecord::default()
        })
        .unwrap()
}

fn cite(base: &Path, artifact: &str, at: DateTime<Utc>, kind: CitationType) {
    CitationLog::new(base)
        .record(&CitationEvent {
            artifact_path: artifact.to_string(),
            session_id: "s-1".to_string(),
            cited_at: at,
            citation_type: kind,
            query: None,
        })
        .unwrap();
}

#[test]
fn empty_project_yields_zeroed_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let metrics = MetricsEngine::new(dir.path()).compute(7, now()).unwrap();
    assert_eq!(metrics.sigma, 0.0);
    assert_eq!(metrics.rho, 0.0);
    assert!(!metrics.above_escape_velocity);
    assert_eq!(metrics.loop_status(), "OPEN");
    assert_eq!(metrics.utility.count, 0);
}

#[test]
fn sigma_and_rho_follow_definitions() {
    let dir = tempfile::tempdir().unwrap();
    let recent = now() - chrono::Duration::days(1);
    let a = seed_learning(dir.path(), "a", 0.5, recent);
    let b = seed_learning(dir.path(), "b", 0.5, recent);
    let _quiet = seed_learning(dir.path(), "quiet", 0.5, recent);

    // a cited twice, b once: 3 events, 2 unique, 3 artifacts total.
    cite(dir.path(), &a.display().to_string(), recent, CitationType::Retrieved);
    cite(dir.path(), &a.display().to_string(), recent, CitationType::Applied);
    cite(dir.path(), &b.display().to_string(), recent, CitationType::Retrieved);

    let metrics = MetricsEngine::new(dir.path()).compute(7, now()).unwrap();
    assert_eq!(metrics.citation_events, 3);
    assert_eq!(metrics.unique_cited, 2);
    assert_eq!(metrics.total_artifacts, 3);
    assert!((metrics.sigma - 2.0 / 3.0).abs() < 1e-9);
    // rho = events / unique / weeks = 3 / 2 / 1
    assert!((metrics.rho - 1.5).abs() < 1e-9);
    assert!((metrics.sigma_rho - 1.0).abs() < 1e-9);
    assert!(metrics.above_escape_velocity);
}

#[test]
fn citations_outside_period_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let recent = now() - chrono::Duration::days(1);
    let stale = now() - chrono::Duration::days(30);
    let a = seed_learning(dir.path(), "a", 0.5, stale);
    cite(dir.path(), &a.display().to_string(), stale, CitationType::Retrieved);
    cite(dir.path(), &a.display().to_string(), recent, CitationType::Retrieved);

    let metrics = MetricsEngine::new(dir.path()).compute(7, now()).unwrap();
    assert_eq!(metrics.citation_events, 1);
}

#[test]
fn loop_closure_compares_found_to_created() {
    let dir = tempfile::tempdir().unwrap();
    let recent = now() - chrono::Duration::days(1);
    let a = seed_learning(dir.path(), "a", 0.5, recent);
    let _b = seed_learning(dir.path(), "b", 0.5, recent);
    cite(dir.path(), &a.display().to_string(), recent, CitationType::Retrieved);

    let metrics = MetricsEngine::new(dir.path()).compute(7, now()).unwrap();
    assert_eq!(metrics.learnings_created, 2);
    assert_eq!(metrics.learnings_found, 1);
    assert!((metrics.loop_closure_ratio - 0.5).abs() < 1e-9);
    assert_eq!(metrics.loop_status(), "PARTIAL");
}

#[test]
fn loop_closes_at_ratio_one() {
    let dir = tempfile::tempdir().unwrap();
    let recent = now() - chrono::Duration::days(1);
    let a = seed_learning(dir.path(), "a", 0.5, recent);
    cite(dir.path(), &a.display().to_string(), recent, CitationType::Retrieved);

    let metrics = MetricsEngine::new(dir.path()).compute(7, now()).unwrap();
    assert_eq!(metrics.loop_status(), "CLOSED");
}

#[test]
fn bypass_citations_counted_separately() {
    let dir = tempfile::tempdir().unwrap();
    let recent = now() - chrono::Duration::days(1);
    let a = seed_learning(dir.path(), "a", 0.5, recent);
    cite(dir.path(), &a.display().to_string(), recent, CitationType::Bypass);

    let metrics = MetricsEngine::new(dir.path()).compute(7, now()).unwrap();
    assert_eq!(metrics.bypass_count, 1);
}

#[test]
fn utility_stats_cover_distribution() {
    let dir = tempfile::tempdir().unwrap();
    let recent = now() - chrono::Duration::days(1);
    seed_learning(dir.path(), "high", 0.9, recent);
    seed_learning(dir.path(), "mid", 0.5, recent);
    seed_learning(dir.path(), "low", 0.1, recent);

    let metrics = MetricsEngine::new(dir.path()).compute(7, now()).unwrap();
    assert_eq!(metrics.utility.count, 3);
    assert!((metrics.utility.mean - 0.5).abs() < 1e-9);
    assert_eq!(metrics.utility.high, 1);
    assert_eq!(metrics.utility.low, 1);
    assert!(metrics.utility.stdev > 0.3);
}

#[test]
fn baseline_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let engine = MetricsEngine::new(dir.path());
    let metrics = engine.compute(7, now()).unwrap();
    let path = engine.save_baseline(&metrics).unwrap();

    assert!(path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("baseline-2026-01-24"));
    let content = std::fs::read_to_string(&path).unwrap();
    let loaded: FlywheelMetrics = serde_json::from_str(&content).unwrap();
    assert_eq!(loaded.period_days, 7);
}

#[test]
fn manual_citation_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let engine = MetricsEngine::new(dir.path());
    engine
        .record_citation(".agents/learnings/a.jsonl", "s-9", CitationType::Bypass, now())
        .unwrap();

    let citations = CitationLog::new(dir.path()).load().unwrap();
    assert_eq!(citations.len(), 1);
    assert_eq!(citations[0].citation_type, CitationType::Bypass);
}
