// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two-phase retriever: freshness decay plus learned utility, under a
//! token budget.
//!
//! Phase A scores freshness with exponential decay; Phase B weighs in
//! per-learning utility. Both are z-normalized across the candidate set
//! and combined as `score = z(f) + λ·z(u)`.

use ao_core::knowledge::{parse_valid_until, DECAY_RATE_PER_WEEK, DEFAULT_LAMBDA, INITIAL_UTILITY};
use ao_core::{CitationEvent, CitationType, SessionId};
use ao_storage::{CitationLog, LearningStore};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default token budget for an injection (~1500 tokens ≈ 6KB).
pub const DEFAULT_MAX_TOKENS: usize = 1500;

/// Approximate characters per token.
pub const CHARS_PER_TOKEN: usize = 4;

/// Maximum learnings included in one injection.
pub const MAX_LEARNINGS: usize = 10;

/// Floor below which freshness is clamped.
const FRESHNESS_FLOOR: f64 = 0.1;

/// Guard for z-normalization when the spread collapses.
const MIN_STD: f64 = 0.001;

#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error(transparent)]
    Jsonl(#[from] ao_storage::JsonlError),
}

/// One learning scored for injection.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RetrievedLearning {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub source: PathBuf,
    pub age_weeks: f64,
    pub freshness: f64,
    pub utility: f64,
    pub composite: f64,
}

/// Assembled injection output.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct Injection {
    pub learnings: Vec<RetrievedLearning>,
    pub query: Option<String>,
    pub session_id: String,
    pub generated_at: DateTime<Utc>,
    pub truncated: bool,
}

/// Freshness score for an age in weeks: `max(0.1, exp(-age × δ))`.
pub fn freshness(age_weeks: f64) -> f64 {
    (-age_weeks * DECAY_RATE_PER_WEEK).exp().max(FRESHNESS_FLOOR)
}

/// Apply composite scoring in place: z-normalize freshness and utility
/// across the set, then `composite = z(f) + λ·z(u)`.
pub fn apply_composite_scoring(learnings: &mut [RetrievedLearning], lambda: f64) {
    if learnings.is_empty() {
        return;
    }
    let n = learnings.len() as f64;
    let mean_f = learnings.iter().map(|l| l.freshness).sum::<f64>() / n;
    let mean_u = learnings.iter().map(|l| l.utility).sum::<f64>() / n;
    let var_f = learnings
        .iter()
        .map(|l| (l.freshness - mean_f).powi(2))
        .sum::<f64>()
        / n;
    let var_u = learnings
        .iter()
        .map(|l| (l.utility - mean_u).powi(2))
        .sum::<f64>()
        / n;
    let std_f = var_f.sqrt().max(MIN_STD);
    let std_u = var_u.sqrt().max(MIN_STD);

    for l in learnings.iter_mut() {
        let z_f = (l.freshness - mean_f) / std_f;
        let z_u = (l.utility - mean_u) / std_u;
        l.composite = z_f + lambda * z_u;
    }
}

/// The two-phase retriever over a project's learnings.
pub struct Retriever {
    store: LearningStore,
    citations: CitationLog,
    pub max_tokens: usize,
    pub max_learnings: usize,
    pub lambda: f64,
}

impl Retriever {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            store: LearningStore::new(base_dir),
            citations: CitationLog::new(base_dir),
            max_tokens: DEFAULT_MAX_TOKENS,
            max_learnings: MAX_LEARNINGS,
            lambda: DEFAULT_LAMBDA,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Retrieve the highest-scoring learnings for an optional query and
    /// record a retrieval citation for each one included.
    pub fn retrieve(
        &self,
        query: Option<&str>,
        session_id: &SessionId,
        cite: bool,
        now: DateTime<Utc>,
    ) -> Result<Injection, RetrieveError> {
        let mut learnings = self.enumerate(query, now);

        apply_composite_scoring(&mut learnings, self.lambda);
        learnings.sort_by(|a, b| {
            b.composite
                .partial_cmp(&a.composite)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        learnings.truncate(self.max_learnings);

        let injection = Injection {
            learnings,
            query: query.map(String::from),
            session_id: session_id.as_str().to_string(),
            generated_at: now,
            truncated: false,
        };

        if cite {
            for learning in &injection.learnings {
                self.citations.record(&CitationEvent {
                    artifact_path: learning.source.display().to_string(),
                    session_id: session_id.as_str().to_string(),
                    cited_at: now,
                    citation_type: CitationType::Retrieved,
                    query: injection.query.clone(),
                })?;
            }
        }

        Ok(injection)
    }

    /// Render an injection as markdown, truncated at a section boundary to
    /// the token budget with a visible marker.
    pub fn render_markdown(&self, injection: &Injection) -> (String, bool) {
        let mut out = String::from("## Injected Knowledge\n\n");

        if injection.learnings.is_empty() {
            out.push_str("*No prior knowledge found.*\n\n");
        } else {
            out.push_str("### Recent Learnings\n");
            for l in &injection.learnings {
                let text = if l.summary.is_empty() { &l.title } else { &l.summary };
                out.push_str(&format!("- **{}**: {}\n", l.id, text));
            }
            out.push('\n');
        }

        out.push_str(&format!(
            "*Last injection: {}*\n",
            injection.generated_at.to_rfc3339()
        ));

        let budget = self.max_tokens * CHARS_PER_TOKEN;
        if out.len() <= budget {
            return (out, false);
        }

        // Truncate at a line boundary, leaving room for the marker.
        let mut kept = String::new();
        for line in out.lines() {
            if kept.len() + line.len() + 1 > budget.saturating_sub(50) {
                break;
            }
            kept.push_str(line);
            kept.push('\n');
        }
        kept.push_str("\n*[truncated to fit token budget]*\n");
        (kept, true)
    }

    fn enumerate(&self, query: Option<&str>, now: DateTime<Utc>) -> Vec<RetrievedLearning> {
        let query_lower = query.map(str::to_lowercase);
        let mut learnings = Vec::new();

        for path in self.store.list_files() {
            let Some(candidate) = self.load_one(&path, now) else {
                continue;
            };
            if let Some(q) = &query_lower {
                let haystack = format!("{} {}", candidate.title, candidate.summary).to_lowercase();
                if !haystack.contains(q) {
                    continue;
                }
            }
            learnings.push(candidate);
        }
        learnings
    }

    fn load_one(&self, path: &Path, now: DateTime<Utc>) -> Option<RetrievedLearning> {
        if path.extension().and_then(|e| e.to_str()) == Some("md") {
            return self.load_markdown(path, now);
        }

        let record = self.store.read(path).ok()?;
        // Skip superseded and expired learnings.
        if record.superseded_by.as_deref().is_some_and(|s| !s.is_empty()) {
            tracing::debug!(path = %path.display(), "skipping superseded learning");
            return None;
        }
        if let Some(deadline) = record.valid_until.as_deref().and_then(parse_valid_until) {
            if deadline < now {
                tracing::debug!(path = %path.display(), "skipping expired learning");
                return None;
            }
        }

        let age = age_weeks(path, record.created_at, now);
        Some(RetrievedLearning {
            id: record.id,
            title: record.title,
            summary: truncate_chars(
                if record.summary.is_empty() {
                    &record.content
                } else {
                    &record.summary
                },
                200,
            ),
            source: path.to_path_buf(),
            age_weeks: age,
            freshness: freshness(age),
            utility: record.utility,
            composite: 0.0,
        })
    }

    fn load_markdown(&self, path: &Path, now: DateTime<Utc>) -> Option<RetrievedLearning> {
        let content = std::fs::read_to_string(path).ok()?;
        let mut title = String::new();
        let mut summary = String::new();
        let mut in_front_matter = false;

        for (i, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if i == 0 && trimmed == "---" {
                in_front_matter = true;
                continue;
            }
            if in_front_matter {
                if trimmed == "---" {
                    in_front_matter = false;
                } else if let Some(value) = trimmed
                    .strip_prefix("superseded_by:")
                    .or_else(|| trimmed.strip_prefix("superseded-by:"))
                {
                    let value = value.trim();
                    if !value.is_empty() && value != "null" && value != "~" {
                        return None;
                    }
                }
                continue;
            }
            if let Some(t) = trimmed.strip_prefix("# ") {
                if title.is_empty() {
                    title = t.to_string();
                }
            } else if summary.is_empty() && !trimmed.is_empty() && !trimmed.starts_with('#') {
                summary = truncate_chars(trimmed, 200);
            }
        }

        let id = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if title.is_empty() {
            title = id.trim_end_matches(".md").to_string();
        }

        let age = age_weeks(path, None, now);
        Some(RetrievedLearning {
            id,
            title,
            summary,
            source: path.to_path_buf(),
            age_weeks: age,
            freshness: freshness(age),
            utility: INITIAL_UTILITY,
            composite: 0.0,
        })
    }
}

/// Age in weeks, preferring the record's creation time over file mtime.
fn age_weeks(path: &Path, created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let reference = created_at.or_else(|| {
        std::fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from)
    });
    match reference {
        Some(ts) => ((now - ts).num_seconds().max(0) as f64) / (7.0 * 86400.0),
        None => 0.0,
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let head: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{head}...")
}

#[cfg(test)]
#[path = "retriever_tests.rs"]
mod tests;
