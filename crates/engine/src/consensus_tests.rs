// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use yare::parameterized;

fn finding(severity: Severity, category: &str, title: &str, source: &str) -> Finding {
    Finding {
        severity,
        category: category.to_string(),
        title: title.to_string(),
        source: source.to_string(),
        confidence: 0.8,
        ..Finding::default()
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 24, 12, 0, 0).unwrap()
}

#[test]
fn dedup_merges_same_category_and_title() {
    let consensus = Consensus::new();
    let mut a = finding(Severity::Medium, "security", "Unchecked Input", "pod-a");
    a.files = vec!["src/a.rs".into()];
    a.lines = vec![10];
    a.confidence = 0.6;
    let mut b = finding(Severity::High, "security", "unchecked   input", "pod-b");
    b.files = vec!["src/b.rs".into(), "src/a.rs".into()];
    b.lines = vec![42, 10];
    b.confidence = 1.0;

    let merged = consensus.deduplicate(vec![a, b]);
    assert_eq!(merged.len(), 1);
    let m = &merged[0];
    // Max severity kept, files/lines unioned, confidence averaged,
    // sources concatenated.
    assert_eq!(m.severity, Severity::High);
    assert_eq!(m.files.len(), 2);
    assert_eq!(m.lines, vec![10, 42]);
    assert!((m.confidence - 0.8).abs() < 1e-9);
    assert!(m.source.contains("pod-a") && m.source.contains("pod-b"));
}

#[test]
fn dedup_keeps_distinct_findings_apart() {
    let consensus = Consensus::new();
    let merged = consensus.deduplicate(vec![
        finding(Severity::Low, "security", "one thing", "a"),
        finding(Severity::Low, "perf", "one thing", "a"),
        finding(Severity::Low, "security", "another", "a"),
    ]);
    assert_eq!(merged.len(), 3);
}

#[test]
fn single_veto_forces_critical_verdict() {
    let consensus = Consensus::new();
    let findings = vec![
        finding(Severity::Low, "a", "l", "p1"),
        finding(Severity::Medium, "b", "m", "p1"),
        finding(Severity::High, "c", "h", "p1"),
        finding(Severity::Critical, "d", "c", "p1"),
    ];
    assert_eq!(consensus.verdict(&findings), Severity::Critical);
    let grade = consensus.grade(Severity::Critical, 1, 1);
    assert_eq!(grade, "D");
}

#[test]
fn verdict_without_critical_is_max_severity() {
    let consensus = Consensus::new();
    let findings = vec![
        finding(Severity::Low, "a", "l", "p1"),
        finding(Severity::High, "c", "h", "p1"),
    ];
    assert_eq!(consensus.verdict(&findings), Severity::High);
    assert_eq!(consensus.verdict(&[]), Severity::Pass);
}

#[parameterized(
    pass = { Severity::Pass, 0, 0, "A" },
    low = { Severity::Low, 0, 0, "A-" },
    medium = { Severity::Medium, 0, 0, "B" },
    high_few = { Severity::High, 0, 3, "C" },
    high_many = { Severity::High, 0, 4, "D" },
    critical_one = { Severity::Critical, 1, 0, "D" },
    critical_many = { Severity::Critical, 2, 0, "F" },
)]
fn grades(verdict: Severity, critical: usize, high: usize, expected: &str) {
    assert_eq!(Consensus::new().grade(verdict, critical, high), expected);
}

#[test]
fn quorum_demotes_high_without_agreement() {
    let consensus = Consensus::new();
    // One agent of ten reports HIGH: 10% agreement, demote to MEDIUM.
    let result = consensus.apply_quorum(
        vec![finding(Severity::High, "security", "weak auth", "a1")],
        10,
    );
    assert_eq!(result[0].severity, Severity::Medium);

    // Seven agents of ten agree: keep HIGH.
    let agreeing: Vec<Finding> = (0..7)
        .map(|i| finding(Severity::High, "security", "weak auth", &format!("a{i}")))
        .collect();
    let result = consensus.apply_quorum(agreeing, 10);
    assert_eq!(result[0].severity, Severity::High);
}

#[test]
fn quorum_demotes_medium_below_half() {
    let consensus = Consensus::new();
    let result = consensus.apply_quorum(
        vec![finding(Severity::Medium, "quality", "naming", "a1")],
        4,
    );
    assert_eq!(result[0].severity, Severity::Low);
}

#[test]
fn quorum_drops_single_source_low() {
    let consensus = Consensus::new();
    let dropped = consensus.apply_quorum(
        vec![finding(Severity::Low, "style", "nit", "a1")],
        4,
    );
    assert!(dropped.is_empty());

    let kept = consensus.apply_quorum(
        vec![
            finding(Severity::Low, "style", "nit", "a1"),
            finding(Severity::Low, "style", "nit", "a2"),
        ],
        4,
    );
    assert_eq!(kept.len(), 1);
}

#[test]
fn quorum_never_drops_critical() {
    let consensus = Consensus::new();
    let result = consensus.apply_quorum(
        vec![finding(Severity::Critical, "security", "rce", "a1")],
        100,
    );
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].severity, Severity::Critical);
}

#[test]
fn context_filter_applies_more_restrictive_rule_first() {
    let consensus = Consensus::new();
    let findings = || {
        vec![
            finding(Severity::Critical, "a", "c", "p"),
            finding(Severity::High, "b", "h", "p"),
            finding(Severity::Medium, "c", "m", "p"),
            finding(Severity::Low, "d", "l", "p"),
        ]
    };

    // At 80%: only CRITICAL and HIGH survive.
    let at_80 = consensus.filter_by_context_budget(findings(), 0.85);
    assert_eq!(at_80.len(), 2);

    // At 60%: LOW dropped, MEDIUM kept.
    let at_60 = consensus.filter_by_context_budget(findings(), 0.65);
    assert_eq!(at_60.len(), 3);

    // Below pressure: untouched.
    let relaxed = consensus.filter_by_context_budget(findings(), 0.3);
    assert_eq!(relaxed.len(), 4);
}

fn pod(name: &str, findings: Vec<Finding>) -> PodResult {
    PodResult {
        pod: name.to_string(),
        findings,
        ..PodResult::default()
    }
}

#[test]
fn early_termination_needs_three_pods() {
    let consensus = Consensus::new();
    let critical = || finding(Severity::Critical, "security", "rce", "x");

    let two = vec![
        pod("p1", vec![critical()]),
        pod("p2", vec![critical()]),
    ];
    assert!(consensus.check_early_termination(&two).is_none());

    let three = vec![
        pod("p1", vec![critical()]),
        pod("p2", vec![critical()]),
        pod("p3", vec![critical()]),
    ];
    assert!(consensus.check_early_termination(&three).is_some());
}

#[test]
fn early_termination_counts_pods_not_findings() {
    let consensus = Consensus::new();
    // One pod reporting the same critical three times is one vote.
    let critical = || finding(Severity::Critical, "security", "rce", "x");
    let pods = vec![pod("p1", vec![critical(), critical(), critical()])];
    assert!(consensus.check_early_termination(&pods).is_none());
}

#[test]
fn synthesize_early_termination_keeps_only_the_critical() {
    let consensus = Consensus::new();
    let critical = || finding(Severity::Critical, "security", "rce", "x");
    let pods = vec![
        pod("p1", vec![critical(), finding(Severity::Low, "style", "nit", "x")]),
        pod("p2", vec![critical()]),
        pod("p3", vec![critical()]),
    ];

    let result = consensus.synthesize("vibe-1", &pods, now());
    assert!(result.early_terminated);
    assert_eq!(result.verdict, Severity::Critical);
    assert_eq!(result.findings.len(), 1);
    assert_eq!(result.findings[0].severity, Severity::Critical);
}

#[test]
fn synthesize_full_path_counts_and_grades() {
    let consensus = Consensus::new();
    let pods = vec![
        pod(
            "p1",
            vec![
                finding(Severity::High, "security", "weak auth", "p1"),
                finding(Severity::Low, "style", "nit", "p1"),
            ],
        ),
        pod("p2", vec![finding(Severity::Medium, "quality", "dup", "p2")]),
    ];

    let result = consensus.synthesize("vibe-2", &pods, now());
    assert!(!result.early_terminated);
    assert_eq!(result.verdict, Severity::High);
    assert_eq!(result.grade, "C");
    assert_eq!(result.high_count, 1);
    assert_eq!(result.medium_count, 1);
    assert_eq!(result.low_count, 1);
    // Sorted most severe first.
    assert_eq!(result.findings[0].severity, Severity::High);
}
