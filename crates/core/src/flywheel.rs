// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Citation and feedback events that close the reinforcement loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a learning entered a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CitationType {
    /// Included by the retriever during injection.
    #[default]
    Retrieved,
    /// Confirmed applied by the session outcome.
    Applied,
    /// Consulted outside the retriever (manual citation).
    Bypass,
}

impl CitationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CitationType::Retrieved => "retrieved",
            CitationType::Applied => "applied",
            CitationType::Bypass => "bypass",
        }
    }

    pub fn parse(s: &str) -> Option<CitationType> {
        match s.to_ascii_lowercase().as_str() {
            "retrieved" => Some(CitationType::Retrieved),
            "applied" => Some(CitationType::Applied),
            "bypass" => Some(CitationType::Bypass),
            _ => None,
        }
    }
}

/// One retrieval or application of an artifact by a session. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationEvent {
    pub artifact_path: String,
    pub session_id: String,
    pub cited_at: DateTime<Utc>,
    pub citation_type: CitationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

/// One utility update applied to a cited learning. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEvent {
    pub session_id: String,
    pub artifact_path: String,
    pub reward: f64,
    pub utility_before: f64,
    pub utility_after: f64,
    pub alpha: f64,
    pub recorded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_path: Option<String>,
}

/// One EMA step of the utility update rule: `u ← (1-α)·u + α·r`.
///
/// The result is clamped to [0, 1].
pub fn ema_update(utility: f64, reward: f64, alpha: f64) -> f64 {
    ((1.0 - alpha) * utility + alpha * reward).clamp(0.0, 1.0)
}

#[cfg(test)]
#[path = "flywheel_tests.rs"]
mod tests;
