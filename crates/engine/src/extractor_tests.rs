// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    decision = { "We decided to use JSONL for the ledger.", KnowledgeType::Decision },
    solution = { "It was fixed by clearing the pane buffer first.", KnowledgeType::Solution },
    learning = { "Turns out tmux needs literal and Enter sent separately.", KnowledgeType::Learning },
    failure = { "Splitting before the session exists didn't work at all.", KnowledgeType::Failure },
    reference = { "See https://example.com/tmux-manual for details.", KnowledgeType::Reference },
)]
fn detectors_fire_on_markers(content: &str, expected: KnowledgeType) {
    let extractor = Extractor::new();
    let detections = extractor.detect(content);
    assert!(
        detections.iter().any(|d| d.kind == expected),
        "expected {expected:?} in {detections:?}"
    );
}

#[test]
fn detection_is_case_insensitive() {
    let extractor = Extractor::new();
    let detections = extractor.detect("DECIDED TO go with plan B");
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].kind, KnowledgeType::Decision);
    assert_eq!(detections[0].start, 0);
}

#[test]
fn multiple_hits_sorted_by_offset() {
    let extractor = Extractor::new();
    let content = "We decided to batch writes. Turns out fsync dominates.";
    let detections = extractor.detect(content);
    assert!(detections.len() >= 2);
    assert!(detections.windows(2).all(|w| w[0].start <= w[1].start));
}

#[test]
fn no_markers_no_detections() {
    let extractor = Extractor::new();
    assert!(extractor.detect("just a normal sentence").is_empty());
}

#[test]
fn snippet_respects_word_boundary() {
    let content = "decided to use a very long sentence that keeps going ".repeat(8);
    let s = snippet(&content, 0, 40);
    assert!(s.chars().count() <= 44, "snippet too long: {s:?}");
    assert!(s.ends_with("..."));
    assert!(!s.trim_end_matches("...").ends_with(' '));
}

#[test]
fn short_snippet_is_untruncated() {
    let s = snippet("decided to keep it short", 0, 200);
    assert_eq!(s, "decided to keep it short");
}

#[test]
fn snippet_from_offset() {
    let content = "noise noise decided to use channels here";
    let start = content.find("decided").unwrap();
    assert_eq!(snippet(content, start, 200), "decided to use channels here");
}

#[test]
fn snippet_out_of_range_is_empty() {
    assert_eq!(snippet("abc", 100, 10), "");
}
