// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ao_storage::LearningRecord;
use chrono::{Duration, TimeZone};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 24, 12, 0, 0).unwrap()
}

fn seed_learning(
    base: &Path,
    id: &str,
    utility: f64,
    age_weeks: i64,
    superseded_by: Option<&str>,
    valid_until: Option<&str>,
) {
    let store = LearningStore::new(base);
    let record = LearningRecord {
        id: id.to_string(),
        title: format!("Learning about {id}"),
        summary: format!("Summary for {id}"),
        utility,
        superseded_by: superseded_by.map(String::from),
        valid_until: valid_until.map(String::from),
        created_at: Some(now() - Duration::weeks(age_weeks)),
        ..LearningRecord::default()
    };
    store.create(&record).unwrap();
}

#[test]
fn freshness_boundaries() {
    assert!((freshness(0.0) - 1.0).abs() < 1e-9);
    let four = freshness(4.0);
    assert!((0.49..=0.52).contains(&four), "freshness(4wk) = {four}");
    assert_eq!(freshness(52.0), 0.1);
}

#[test]
fn composite_prefers_fresh_high_utility() {
    let mut set = vec![
        RetrievedLearning {
            id: "stale-low".into(),
            title: String::new(),
            summary: String::new(),
            source: PathBuf::new(),
            age_weeks: 20.0,
            freshness: freshness(20.0),
            utility: 0.2,
            composite: 0.0,
        },
        RetrievedLearning {
            id: "fresh-high".into(),
            title: String::new(),
            summary: String::new(),
            source: PathBuf::new(),
            age_weeks: 0.5,
            freshness: freshness(0.5),
            utility: 0.9,
            composite: 0.0,
        },
    ];
    apply_composite_scoring(&mut set, 0.5);
    assert!(set[1].composite > set[0].composite);
}

#[test]
fn composite_guard_handles_identical_sets() {
    let mut set = vec![
        RetrievedLearning {
            id: "a".into(),
            title: String::new(),
            summary: String::new(),
            source: PathBuf::new(),
            age_weeks: 1.0,
            freshness: 0.8,
            utility: 0.5,
            composite: 0.0,
        },
        RetrievedLearning {
            id: "b".into(),
            title: String::new(),
            summary: String::new(),
            source: PathBuf::new(),
            age_weeks: 1.0,
            freshness: 0.8,
            utility: 0.5,
            composite: 0.0,
        },
    ];
    apply_composite_scoring(&mut set, 0.5);
    assert!(set.iter().all(|l| l.composite.is_finite()));
}

#[test]
fn retrieve_skips_superseded_and_expired() {
    let dir = tempfile::tempdir().unwrap();
    seed_learning(dir.path(), "current", 0.8, 1, None, None);
    seed_learning(dir.path(), "superseded", 0.9, 1, Some("current"), None);
    seed_learning(dir.path(), "expired", 0.9, 1, None, Some("2020-01-01"));
    seed_learning(dir.path(), "future", 0.6, 1, None, Some("2099-12-31"));
    seed_learning(dir.path(), "badly-dated", 0.6, 1, None, Some("not-a-date"));

    let retriever = Retriever::new(dir.path());
    let injection = retriever
        .retrieve(None, &SessionId::new("session-20260124-120000"), false, now())
        .unwrap();

    let ids: Vec<&str> = injection.learnings.iter().map(|l| l.id.as_str()).collect();
    assert!(ids.contains(&"current"));
    assert!(ids.contains(&"future"));
    assert!(ids.contains(&"badly-dated"), "invalid valid_until means no expiry");
    assert!(!ids.contains(&"superseded"));
    assert!(!ids.contains(&"expired"));
}

#[test]
fn retrieve_filters_by_query() {
    let dir = tempfile::tempdir().unwrap();
    seed_learning(dir.path(), "auth-tokens", 0.8, 1, None, None);
    seed_learning(dir.path(), "tmux-panes", 0.8, 1, None, None);

    let retriever = Retriever::new(dir.path());
    let injection = retriever
        .retrieve(Some("auth"), &SessionId::new("s"), false, now())
        .unwrap();
    assert_eq!(injection.learnings.len(), 1);
    assert_eq!(injection.learnings[0].id, "auth-tokens");
}

#[test]
fn retrieve_records_citations_for_each_included() {
    let dir = tempfile::tempdir().unwrap();
    seed_learning(dir.path(), "a", 0.8, 1, None, None);
    seed_learning(dir.path(), "b", 0.6, 2, None, None);

    let session = SessionId::new("session-20260124-120000");
    let retriever = Retriever::new(dir.path());
    let injection = retriever
        .retrieve(Some("learning"), &session, true, now())
        .unwrap();
    assert_eq!(injection.learnings.len(), 2);

    let citations = ao_storage::CitationLog::new(dir.path())
        .load_for_session(session.as_str(), Some(ao_core::CitationType::Retrieved))
        .unwrap();
    assert_eq!(citations.len(), 2);
    assert_eq!(citations[0].query.as_deref(), Some("learning"));
}

#[test]
fn retrieve_caps_item_count() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..15 {
        seed_learning(dir.path(), &format!("l{i:02}"), 0.5, 1, None, None);
    }
    let retriever = Retriever::new(dir.path());
    let injection = retriever
        .retrieve(None, &SessionId::new("s"), false, now())
        .unwrap();
    assert_eq!(injection.learnings.len(), MAX_LEARNINGS);
}

#[test]
fn ranking_is_descending_by_composite() {
    let dir = tempfile::tempdir().unwrap();
    seed_learning(dir.path(), "old-low", 0.1, 30, None, None);
    seed_learning(dir.path(), "fresh-high", 0.9, 0, None, None);
    seed_learning(dir.path(), "middle", 0.5, 4, None, None);

    let retriever = Retriever::new(dir.path());
    let injection = retriever
        .retrieve(None, &SessionId::new("s"), false, now())
        .unwrap();
    assert_eq!(injection.learnings[0].id, "fresh-high");
    let scores: Vec<f64> = injection.learnings.iter().map(|l| l.composite).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn markdown_render_truncates_at_budget() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..10 {
        seed_learning(dir.path(), &format!("learning-{i:02}"), 0.5, 1, None, None);
    }
    let retriever = Retriever::new(dir.path()).with_max_tokens(60);
    let injection = retriever
        .retrieve(None, &SessionId::new("s"), false, now())
        .unwrap();

    let (rendered, truncated) = retriever.render_markdown(&injection);
    assert!(truncated);
    assert!(rendered.ends_with("*[truncated to fit token budget]*\n"));
    assert!(rendered.len() <= 60 * CHARS_PER_TOKEN + 64);
}

#[test]
fn markdown_render_fits_generous_budget() {
    let dir = tempfile::tempdir().unwrap();
    seed_learning(dir.path(), "only", 0.5, 1, None, None);
    let retriever = Retriever::new(dir.path());
    let injection = retriever
        .retrieve(None, &SessionId::new("s"), false, now())
        .unwrap();
    let (rendered, truncated) = retriever.render_markdown(&injection);
    assert!(!truncated);
    assert!(rendered.contains("### Recent Learnings"));
    assert!(rendered.contains("**only**"));
}

#[test]
fn markdown_learning_files_participate() {
    let dir = tempfile::tempdir().unwrap();
    let store = LearningStore::new(dir.path());
    std::fs::create_dir_all(store.dir()).unwrap();
    std::fs::write(
        store.dir().join("note.md"),
        "# Pane readiness\nProbe the pane command before sending keys.\n",
    )
    .unwrap();
    std::fs::write(
        store.dir().join("gone.md"),
        "---\nsuperseded_by: note.md\n---\n# Old advice\nIgnore this.\n",
    )
    .unwrap();

    let retriever = Retriever::new(dir.path());
    let injection = retriever
        .retrieve(None, &SessionId::new("s"), false, now())
        .unwrap();
    let ids: Vec<&str> = injection.learnings.iter().map(|l| l.id.as_str()).collect();
    assert!(ids.contains(&"note.md"));
    assert!(!ids.contains(&"gone.md"));
}
