// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Knowledge candidates: extracted items, quality tiers, maturity levels.

use crate::id::CandidateId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Utility assigned to a learning that has never received feedback.
pub const INITIAL_UTILITY: f64 = 0.5;

/// Default EMA learning rate for utility updates.
pub const DEFAULT_ALPHA: f64 = 0.1;

/// Default weight of utility relative to freshness in composite scoring.
pub const DEFAULT_LAMBDA: f64 = 0.5;

/// Knowledge decay rate per week (Darr et al. literature baseline).
pub const DECAY_RATE_PER_WEEK: f64 = 0.17;

/// Utility threshold for promotion transitions.
pub const MATURITY_PROMOTION_THRESHOLD: f64 = 0.7;

/// Utility threshold below which a candidate demotes to provisional.
pub const MATURITY_DEMOTION_THRESHOLD: f64 = 0.3;

/// Utility ceiling for the anti-pattern transition.
pub const MATURITY_ANTI_PATTERN_THRESHOLD: f64 = 0.2;

/// Reward events required before provisional can promote.
pub const MIN_FEEDBACK_FOR_PROMOTION: u32 = 3;

/// Harmful events required before the anti-pattern rule fires.
pub const MIN_FEEDBACK_FOR_ANTI_PATTERN: u32 = 5;

/// Maximum depth of a supersession chain.
pub const MAX_SUPERSESSION_DEPTH: u32 = 3;

/// The kind of knowledge an extracted candidate carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeType {
    Decision,
    Solution,
    Learning,
    Failure,
    Reference,
}

impl KnowledgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KnowledgeType::Decision => "decision",
            KnowledgeType::Solution => "solution",
            KnowledgeType::Learning => "learning",
            KnowledgeType::Failure => "failure",
            KnowledgeType::Reference => "reference",
        }
    }
}

impl std::fmt::Display for KnowledgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quality tier assigned by scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Gold,
    Silver,
    #[default]
    Bronze,
    Discard,
}

impl Tier {
    /// Numeric rank: higher is better.
    pub fn rank(&self) -> u8 {
        match self {
            Tier::Gold => 3,
            Tier::Silver => 2,
            Tier::Bronze => 1,
            Tier::Discard => 0,
        }
    }

    /// True when this tier meets or exceeds the given minimum.
    pub fn meets(&self, min: Tier) -> bool {
        self.rank() >= min.rank()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Gold => "gold",
            Tier::Silver => "silver",
            Tier::Bronze => "bronze",
            Tier::Discard => "discard",
        }
    }

    pub fn parse(s: &str) -> Option<Tier> {
        match s.to_ascii_lowercase().as_str() {
            "gold" => Some(Tier::Gold),
            "silver" => Some(Tier::Silver),
            "bronze" => Some(Tier::Bronze),
            "discard" => Some(Tier::Discard),
            _ => None,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maturity level of a learning, driven by the feedback loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Maturity {
    #[default]
    Provisional,
    Candidate,
    Established,
    AntiPattern,
}

impl Maturity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Maturity::Provisional => "provisional",
            Maturity::Candidate => "candidate",
            Maturity::Established => "established",
            Maturity::AntiPattern => "anti_pattern",
        }
    }
}

impl std::fmt::Display for Maturity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance back-pointer from a candidate to its transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Source {
    #[serde(default)]
    pub transcript_path: String,
    #[serde(default)]
    pub message_index: u64,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub session_id: String,
}

/// An extracted knowledge item flowing through the quality pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    #[serde(rename = "type")]
    pub kind: KnowledgeType,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default)]
    pub tier: Tier,
    #[serde(default = "default_utility")]
    pub utility: f64,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub maturity: Maturity,
    #[serde(default)]
    pub reward_count: u32,
    #[serde(default)]
    pub helpful_count: u32,
    #[serde(default)]
    pub harmful_count: u32,
    #[serde(default = "default_true")]
    pub is_current: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<CandidateId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<CandidateId>,
    #[serde(default)]
    pub supersession_depth: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<String>,
    #[serde(default)]
    pub source: Source,
    pub extracted_at: DateTime<Utc>,
}

fn default_utility() -> f64 {
    INITIAL_UTILITY
}

fn default_true() -> bool {
    true
}

impl Candidate {
    pub fn new(
        id: impl Into<CandidateId>,
        kind: KnowledgeType,
        content: impl Into<String>,
        source: Source,
        extracted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            content: content.into(),
            context: None,
            tier: Tier::Bronze,
            utility: INITIAL_UTILITY,
            confidence: 0.5,
            maturity: Maturity::Provisional,
            reward_count: 0,
            helpful_count: 0,
            harmful_count: 0,
            is_current: true,
            supersedes: None,
            superseded_by: None,
            supersession_depth: 0,
            valid_until: None,
            source,
            extracted_at,
        }
    }

    /// True when `valid_until` names a deadline that has passed.
    ///
    /// Unparseable deadlines are treated as "no expiry".
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.valid_until.as_deref().and_then(parse_valid_until) {
            Some(deadline) => deadline < now,
            None => false,
        }
    }
}

/// Scoring attached to a pool entry when the forge admits a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Scoring {
    #[serde(default)]
    pub raw_score: f64,
    #[serde(default)]
    pub gate_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// Parse a `valid_until` value in either date-only or full timestamp form.
///
/// Returns `None` for anything unparseable; invalid means no expiry.
pub fn parse_valid_until(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(23, 59, 59)?;
        return Some(DateTime::from_naive_utc_and_offset(midnight, Utc));
    }
    None
}

/// Normalize content for deduplication: lowercase, trimmed, trailing
/// ellipsis removed, internal whitespace collapsed.
pub fn normalize_content(content: &str) -> String {
    let lowered = content.to_lowercase();
    let trimmed = lowered.trim().trim_end_matches('…').trim_end_matches("...");
    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Content-derived dedup key: SHA-256 over the normalized content.
pub fn content_key(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_content(content).as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

/// Check the structural invariants of a supersession chain.
///
/// Returns one message per violation: exactly one current member, depth
/// increasing by one per link, depth capped at [`MAX_SUPERSESSION_DEPTH`].
pub fn supersession_issues(chain: &[&Candidate]) -> Vec<String> {
    let mut issues = Vec::new();

    let current: Vec<_> = chain.iter().filter(|c| c.is_current).collect();
    if current.len() != 1 {
        issues.push(format!(
            "expected exactly one current candidate, found {}",
            current.len()
        ));
    }

    for c in chain {
        if c.supersession_depth > MAX_SUPERSESSION_DEPTH {
            issues.push(format!(
                "{} exceeds max supersession depth ({} > {})",
                c.id, c.supersession_depth, MAX_SUPERSESSION_DEPTH
            ));
        }
        if let Some(prev_id) = &c.supersedes {
            if let Some(prev) = chain.iter().find(|p| &p.id == prev_id) {
                if c.supersession_depth != prev.supersession_depth + 1 {
                    issues.push(format!(
                        "{} depth {} does not follow {} depth {}",
                        c.id, c.supersession_depth, prev.id, prev.supersession_depth
                    ));
                }
                if prev.is_current {
                    issues.push(format!("{} is superseded but still current", prev.id));
                }
            }
        }
    }

    issues
}

#[cfg(test)]
#[path = "knowledge_tests.rs"]
mod tests;
