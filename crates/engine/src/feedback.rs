// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Feedback loop: turns session outcomes into utility updates for the
//! learnings that session retrieved.

use ao_core::knowledge::DEFAULT_ALPHA;
use ao_core::{ema_update, CitationEvent, CitationType, FeedbackEvent};
use ao_storage::{CitationLog, FeedbackLog, LearningStore};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("no transcript found; pass an explicit reward")]
    NoTranscript,
    #[error("reward {0} outside [0, 1]")]
    RewardOutOfRange(f64),
    #[error(transparent)]
    Jsonl(#[from] ao_storage::JsonlError),
}

/// Derives a session reward from its transcript.
///
/// Implementations must document their mapping from outcome to r ∈ [0,1].
pub trait RewardSource {
    fn reward(&self, transcript: Option<&Path>, session_id: &str) -> Result<f64, FeedbackError>;
}

/// Default reward source: scans the transcript tail for outcome markers.
///
/// Mapping: explicit success markers (tests passing, "farm complete",
/// completed issue ids) score 0.9; explicit failure markers score 0.2;
/// mixed signals score 0.5; an unreadable or absent transcript is an
/// error, never a guess.
#[derive(Debug, Clone, Default)]
pub struct OutcomeRewardSource;

impl OutcomeRewardSource {
    /// Lines inspected at the end of the transcript.
    const TAIL_LINES: usize = 50;
}

impl RewardSource for OutcomeRewardSource {
    fn reward(&self, transcript: Option<&Path>, _session_id: &str) -> Result<f64, FeedbackError> {
        let path = transcript.ok_or(FeedbackError::NoTranscript)?;
        let content = std::fs::read_to_string(path).map_err(|_| FeedbackError::NoTranscript)?;

        let tail: Vec<&str> = {
            let lines: Vec<&str> = content.lines().collect();
            let start = lines.len().saturating_sub(Self::TAIL_LINES);
            lines[start..].to_vec()
        };
        let haystack = tail.join("\n").to_lowercase();

        let success = ["tests pass", "all checks passed", "farm complete", "status: closed", "completed"]
            .iter()
            .any(|m| haystack.contains(m));
        let failure = ["tests fail", "build fail", "error:", "gave up", "status: failed"]
            .iter()
            .any(|m| haystack.contains(m));

        Ok(match (success, failure) {
            (true, false) => 0.9,
            (false, true) => 0.2,
            _ => 0.5,
        })
    }
}

/// Summary of one feedback-loop run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FeedbackSummary {
    pub session_id: String,
    pub reward: f64,
    pub citations: usize,
    pub unique: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Closes the loop for one session: citations → reward → EMA updates →
/// feedback events.
pub struct FeedbackLoop {
    citations: CitationLog,
    feedback: FeedbackLog,
    store: LearningStore,
    pub alpha: f64,
}

impl FeedbackLoop {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            citations: CitationLog::new(base_dir),
            feedback: FeedbackLog::new(base_dir),
            store: LearningStore::new(base_dir),
            alpha: DEFAULT_ALPHA,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Run the loop for one session.
    ///
    /// When `reward` is `None`, it is derived from the transcript via the
    /// reward source.
    pub fn run(
        &self,
        session_id: &str,
        reward: Option<f64>,
        citation_type: Option<CitationType>,
        transcript: Option<&Path>,
        source: &dyn RewardSource,
        now: DateTime<Utc>,
    ) -> Result<FeedbackSummary, FeedbackError> {
        if let Some(r) = reward {
            if !(0.0..=1.0).contains(&r) {
                return Err(FeedbackError::RewardOutOfRange(r));
            }
        }

        let session_citations = self
            .citations
            .load_for_session(session_id, citation_type)?;
        if session_citations.is_empty() {
            return Ok(FeedbackSummary {
                session_id: session_id.to_string(),
                reward: reward.unwrap_or(0.0),
                citations: 0,
                unique: 0,
                updated: 0,
                failed: 0,
            });
        }

        let reward = match reward {
            Some(r) => r,
            None => source.reward(transcript, session_id)?,
        };

        let unique = dedup_by_artifact(&session_citations);
        let mut events = Vec::new();
        let mut failed = 0usize;

        for citation in &unique {
            let Some(path) = self.resolve_learning(&citation.artifact_path) else {
                tracing::warn!(artifact = %citation.artifact_path, "cited learning not found");
                failed += 1;
                continue;
            };

            let before = match self.store.read(&path) {
                Ok(record) => record.utility,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "unreadable learning");
                    failed += 1;
                    continue;
                }
            };

            let alpha = self.alpha;
            let update = self.store.update(&path, |record| {
                record.utility = ema_update(record.utility, reward, alpha);
                record.reward_count += 1;
                record.last_reward = Some(reward);
                if reward >= 0.5 {
                    record.helpful_count += 1;
                } else {
                    record.harmful_count += 1;
                }
            });

            match update {
                Ok(record) => {
                    events.push(FeedbackEvent {
                        session_id: session_id.to_string(),
                        artifact_path: path.display().to_string(),
                        reward,
                        utility_before: before,
                        utility_after: record.utility,
                        alpha,
                        recorded_at: now,
                        transcript_path: transcript.map(|p| p.display().to_string()),
                    });
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "utility update failed");
                    failed += 1;
                }
            }
        }

        self.feedback.record_all(&events)?;

        Ok(FeedbackSummary {
            session_id: session_id.to_string(),
            reward,
            citations: session_citations.len(),
            unique: unique.len(),
            updated: events.len(),
            failed,
        })
    }

    /// Run the loop for every recent session with citations but no
    /// feedback yet. Already-processed sessions are skipped.
    pub fn run_batch(
        &self,
        days: i64,
        source: &dyn RewardSource,
        now: DateTime<Utc>,
    ) -> Result<Vec<FeedbackSummary>, FeedbackError> {
        let since = now - Duration::days(days);
        let processed = self.feedback.processed_sessions()?;

        let mut sessions: Vec<String> = Vec::new();
        for citation in self.citations.load()? {
            if citation.cited_at < since || processed.contains(&citation.session_id) {
                continue;
            }
            if !sessions.contains(&citation.session_id) {
                sessions.push(citation.session_id);
            }
        }

        let mut summaries = Vec::new();
        for session_id in sessions {
            match self.run(&session_id, None, Some(CitationType::Retrieved), None, source, now) {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    tracing::warn!(session = %session_id, error = %e, "batch feedback skipped session");
                }
            }
        }
        Ok(summaries)
    }

    fn resolve_learning(&self, artifact_path: &str) -> Option<PathBuf> {
        let direct = PathBuf::from(artifact_path);
        if direct.is_file() {
            return Some(direct);
        }
        let name = direct.file_name()?.to_string_lossy().to_string();
        self.store.find_by_name(&name).ok()
    }
}

/// Most recently modified transcript under `~/.claude/projects`, used
/// when no transcript is passed explicitly.
pub fn find_latest_transcript() -> Option<PathBuf> {
    let projects = dirs::home_dir()?.join(".claude").join("projects");
    let mut latest: Option<(std::time::SystemTime, PathBuf)> = None;

    let project_dirs = std::fs::read_dir(projects).ok()?;
    for project in project_dirs.flatten() {
        let Ok(files) = std::fs::read_dir(project.path()) else {
            continue;
        };
        for file in files.flatten() {
            let path = file.path();
            if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
                continue;
            }
            let Ok(modified) = file.metadata().and_then(|m| m.modified()) else {
                continue;
            };
            if latest.as_ref().map_or(true, |(ts, _)| modified > *ts) {
                latest = Some((modified, path));
            }
        }
    }
    latest.map(|(_, path)| path)
}

/// First citation per artifact path, preserving order.
fn dedup_by_artifact(citations: &[CitationEvent]) -> Vec<CitationEvent> {
    let mut seen: HashMap<&str, ()> = HashMap::new();
    let mut unique = Vec::new();
    for c in citations {
        if seen.insert(c.artifact_path.as_str(), ()).is_none() {
            unique.push(c.clone());
        }
    }
    unique
}

#[cfg(test)]
#[path = "feedback_tests.rs"]
mod tests;
