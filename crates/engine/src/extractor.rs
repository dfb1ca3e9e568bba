// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed knowledge detectors applied to transcript messages.
//!
//! Each detector scans message content for its marker phrases and yields
//! `(type, start_index)` detections; the forge cuts a bounded snippet at a
//! word boundary from each.

use ao_core::knowledge::KnowledgeType;

/// Maximum length for extracted snippets.
pub const SNIPPET_MAX_LENGTH: usize = 200;

/// One detector hit inside a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub kind: KnowledgeType,
    pub start: usize,
}

/// A typed knowledge detector.
pub trait Detector: Send + Sync {
    fn kind(&self) -> KnowledgeType;

    /// Byte offsets (on char boundaries) where this detector fires.
    fn detect(&self, content: &str) -> Vec<usize>;
}

/// Phrase-marker detector: fires at each occurrence of any marker.
struct PhraseDetector {
    kind: KnowledgeType,
    markers: &'static [&'static str],
}

impl Detector for PhraseDetector {
    fn kind(&self) -> KnowledgeType {
        self.kind
    }

    fn detect(&self, content: &str) -> Vec<usize> {
        let lowered = content.to_lowercase();
        let mut hits = Vec::new();
        for marker in self.markers {
            let mut from = 0;
            while let Some(pos) = lowered[from..].find(marker) {
                let at = from + pos;
                hits.push(at);
                from = at + marker.len();
            }
        }
        hits.sort_unstable();
        hits.dedup();
        hits
    }
}

/// The standard detector table, in application order.
pub struct Extractor {
    detectors: Vec<Box<dyn Detector>>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            detectors: vec![
                Box::new(PhraseDetector {
                    kind: KnowledgeType::Decision,
                    markers: &["decided to", "decision:", "went with", "we chose", "opted for"],
                }),
                Box::new(PhraseDetector {
                    kind: KnowledgeType::Solution,
                    markers: &["fixed by", "the fix was", "solution:", "resolved by", "works now because"],
                }),
                Box::new(PhraseDetector {
                    kind: KnowledgeType::Learning,
                    markers: &["learned that", "turns out", "til:", "key insight", "important:"],
                }),
                Box::new(PhraseDetector {
                    kind: KnowledgeType::Failure,
                    markers: &["didn't work", "did not work", "failed because", "dead end", "don't try"],
                }),
                Box::new(PhraseDetector {
                    kind: KnowledgeType::Reference,
                    markers: &["see https://", "reference:", "documented at"],
                }),
            ],
        }
    }
}

impl Extractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every detector over a message, lowest offset first.
    pub fn detect(&self, content: &str) -> Vec<Detection> {
        let mut detections = Vec::new();
        for detector in &self.detectors {
            for start in detector.detect(content) {
                detections.push(Detection {
                    kind: detector.kind(),
                    start,
                });
            }
        }
        detections.sort_by_key(|d| d.start);
        detections
    }
}

/// Cut a snippet from `content` at `start`, bounded to `max_len` chars and
/// ending on a word boundary, with a trailing ellipsis when truncated.
pub fn snippet(content: &str, start: usize, max_len: usize) -> String {
    let tail: String = content
        .get(start..)
        .unwrap_or_default()
        .chars()
        .take(max_len + 1)
        .collect();
    let tail = tail.trim_start();
    if tail.chars().count() <= max_len {
        return tail.trim_end().to_string();
    }
    let head: String = tail.chars().take(max_len).collect();
    let cut = head.rfind(' ').unwrap_or(head.len());
    format!("{}...", head[..cut].trim_end())
}

#[cfg(test)]
#[path = "extractor_tests.rs"]
mod tests;
