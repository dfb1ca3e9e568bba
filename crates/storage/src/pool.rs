// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Quality pool: the candidate review state machine.
//!
//! Entries live as one JSON file per candidate under
//! `.agents/pool/{pending,staged,rejected}/`. `rejected` is terminal:
//! a rejected entry can never be staged or promoted again.

use crate::chain::{Chain, ChainError};
use crate::jsonl::{atomic_write_json, JsonlError};
use crate::learning::{LearningError, LearningRecord, LearningStore};
use ao_core::knowledge::{Candidate, Scoring, Tier};
use ao_core::ratchet::{ArtifactTier, ChainEntry, Step};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Maximum length of a rejection reason or approval note.
pub const MAX_REASON_LENGTH: usize = 1000;

/// Minimum age threshold accepted by bulk approval.
pub const MIN_BULK_THRESHOLD: Duration = Duration::from_secs(3600);

const PENDING_DIR: &str = "pending";
const STAGED_DIR: &str = "staged";
const REJECTED_DIR: &str = "rejected";

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("candidate not found: {0}")]
    NotFound(String),
    #[error("state error: candidate {0} is rejected and cannot transition")]
    Rejected(String),
    #[error("state error: already reviewed by {reviewer}")]
    AlreadyReviewed { reviewer: String },
    #[error("threshold too low: bulk approval requires at least 1h")]
    ThresholdTooLow,
    #[error("reason exceeds {MAX_REASON_LENGTH} characters")]
    ReasonTooLong,
    #[error("reason must not be empty")]
    ReasonEmpty,
    #[error("candidate {id} tier {tier} is below required {min}")]
    TierTooLow { id: String, tier: Tier, min: Tier },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Jsonl(#[from] JsonlError),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Learning(#[from] LearningError),
}

/// Review state of a pool entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PoolStatus {
    #[default]
    Pending,
    Staged,
    Promoted,
    Rejected,
}

/// What a human reviewer decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Approved,
    Rejected,
}

/// A recorded human review. At most one per candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanReview {
    pub reviewer: String,
    pub note: String,
    pub action: ReviewAction,
    pub reviewed_at: DateTime<Utc>,
}

/// One candidate and its review state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolEntry {
    pub candidate: Candidate,
    pub scoring: Scoring,
    pub status: PoolStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_review: Option<HumanReview>,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filters for listing pool entries.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub tier: Option<Tier>,
    pub status: Option<PoolStatus>,
    pub limit: Option<usize>,
}

/// The on-disk quality pool.
#[derive(Debug, Clone)]
pub struct Pool {
    base_dir: PathBuf,
    pool_path: PathBuf,
}

impl Pool {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            pool_path: base_dir.join(super::AGENTS_DIR).join("pool"),
        }
    }

    pub fn pool_path(&self) -> &Path {
        &self.pool_path
    }

    /// Create the pool directory skeleton.
    pub fn init(&self) -> Result<(), PoolError> {
        for dir in [PENDING_DIR, STAGED_DIR, REJECTED_DIR] {
            std::fs::create_dir_all(self.pool_path.join(dir))?;
        }
        Ok(())
    }

    /// Admit a candidate as a pending entry.
    pub fn add(
        &self,
        candidate: Candidate,
        scoring: Scoring,
        now: DateTime<Utc>,
    ) -> Result<(), PoolError> {
        self.init()?;
        let entry = PoolEntry {
            candidate,
            scoring,
            status: PoolStatus::Pending,
            human_review: None,
            added_at: now,
            updated_at: now,
        };
        let path = self.entry_file(PENDING_DIR, entry.candidate.id.as_str());
        atomic_write_json(&path, &entry)?;
        Ok(())
    }

    /// Fetch an entry by candidate id, wherever it lives.
    pub fn get(&self, id: &str) -> Result<PoolEntry, PoolError> {
        let (_, entry) = self.locate(id)?;
        Ok(entry)
    }

    /// List entries across all states, newest first.
    pub fn list(&self, opts: &ListOptions) -> Result<Vec<PoolEntry>, PoolError> {
        let mut entries = Vec::new();
        for dir in [PENDING_DIR, STAGED_DIR, REJECTED_DIR] {
            let dir_path = self.pool_path.join(dir);
            let Ok(read) = std::fs::read_dir(&dir_path) else {
                continue;
            };
            for file in read.flatten() {
                let path = file.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                match self.read_entry(&path) {
                    Ok(entry) => entries.push(entry),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "skipping unreadable pool entry");
                    }
                }
            }
        }

        entries.retain(|e| {
            opts.tier.map_or(true, |t| e.candidate.tier == t)
                && opts.status.map_or(true, |s| e.status == s)
        });
        entries.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        if let Some(limit) = opts.limit {
            entries.truncate(limit);
        }
        Ok(entries)
    }

    /// Stage a pending entry whose tier meets the minimum.
    pub fn stage(&self, id: &str, min_tier: Tier, now: DateTime<Utc>) -> Result<(), PoolError> {
        let (path, mut entry) = self.locate(id)?;
        if entry.status == PoolStatus::Rejected {
            return Err(PoolError::Rejected(id.to_string()));
        }
        if !entry.candidate.tier.meets(min_tier) {
            return Err(PoolError::TierTooLow {
                id: id.to_string(),
                tier: entry.candidate.tier,
                min: min_tier,
            });
        }
        entry.status = PoolStatus::Staged;
        entry.updated_at = now;
        self.move_entry(&path, STAGED_DIR, &entry)?;
        Ok(())
    }

    /// Promote an entry: write its artifact under the matching tier
    /// directory, record a promotion in the ratchet chain, and mark the
    /// entry promoted. Returns the artifact path.
    pub fn promote(&self, id: &str, now: DateTime<Utc>) -> Result<PathBuf, PoolError> {
        let (path, mut entry) = self.locate(id)?;
        if entry.status == PoolStatus::Rejected {
            return Err(PoolError::Rejected(id.to_string()));
        }
        if entry.status == PoolStatus::Promoted {
            // Idempotent: the artifact already exists.
            return Ok(self.artifact_path(&entry));
        }

        let artifact = self.write_artifact(&entry, now)?;

        let tier = artifact_tier_for(entry.candidate.tier);
        let mut chain = Chain::load(&self.base_dir)?;
        chain.append(
            ChainEntry::recorded(
                Step::Promotion,
                artifact.display().to_string(),
                now,
            )
            .with_input(entry.candidate.id.as_str())
            .with_tier(tier),
        )?;

        entry.status = PoolStatus::Promoted;
        entry.updated_at = now;
        atomic_write_json(&path, &entry)?;
        Ok(artifact)
    }

    /// Reject an entry. Terminal, and counts as the one human review.
    pub fn reject(
        &self,
        id: &str,
        reason: &str,
        reviewer: &str,
        now: DateTime<Utc>,
    ) -> Result<(), PoolError> {
        if reason.trim().is_empty() {
            return Err(PoolError::ReasonEmpty);
        }
        if reason.len() > MAX_REASON_LENGTH {
            return Err(PoolError::ReasonTooLong);
        }

        let (path, mut entry) = self.locate(id)?;
        if let Some(review) = &entry.human_review {
            return Err(PoolError::AlreadyReviewed {
                reviewer: review.reviewer.clone(),
            });
        }

        entry.status = PoolStatus::Rejected;
        entry.human_review = Some(HumanReview {
            reviewer: reviewer.to_string(),
            note: reason.to_string(),
            action: ReviewAction::Rejected,
            reviewed_at: now,
        });
        entry.updated_at = now;
        self.move_entry(&path, REJECTED_DIR, &entry)?;
        Ok(())
    }

    /// Record an approval. A second review of any kind fails.
    pub fn approve(
        &self,
        id: &str,
        note: &str,
        reviewer: &str,
        now: DateTime<Utc>,
    ) -> Result<(), PoolError> {
        if note.len() > MAX_REASON_LENGTH {
            return Err(PoolError::ReasonTooLong);
        }

        let (path, mut entry) = self.locate(id)?;
        if let Some(review) = &entry.human_review {
            return Err(PoolError::AlreadyReviewed {
                reviewer: review.reviewer.clone(),
            });
        }

        entry.human_review = Some(HumanReview {
            reviewer: reviewer.to_string(),
            note: note.to_string(),
            action: ReviewAction::Approved,
            reviewed_at: now,
        });
        entry.updated_at = now;
        atomic_write_json(&path, &entry)?;
        Ok(())
    }

    /// Promote every silver candidate older than `threshold`.
    ///
    /// The threshold must be at least one hour. Returns promoted ids;
    /// running twice over the same pool is a no-op the second time.
    pub fn bulk_approve(
        &self,
        threshold: Duration,
        reviewer: &str,
        dry_run: bool,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, PoolError> {
        if threshold < MIN_BULK_THRESHOLD {
            return Err(PoolError::ThresholdTooLow);
        }

        let cutoff = now
            - chrono::Duration::from_std(threshold)
                .unwrap_or_else(|_| chrono::Duration::hours(1));

        let eligible: Vec<PoolEntry> = self
            .list(&ListOptions {
                tier: Some(Tier::Silver),
                ..ListOptions::default()
            })?
            .into_iter()
            .filter(|e| {
                matches!(e.status, PoolStatus::Pending | PoolStatus::Staged)
                    && e.added_at <= cutoff
            })
            .collect();

        let mut promoted = Vec::new();
        for entry in eligible {
            let id = entry.candidate.id.as_str().to_string();
            if dry_run {
                promoted.push(id);
                continue;
            }
            match self.promote(&id, now) {
                Ok(_) => {
                    tracing::info!(id = %id, reviewer, "auto-promoted silver candidate");
                    promoted.push(id);
                }
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "auto-promote failed");
                }
            }
        }
        Ok(promoted)
    }

    /// Entries that require a human review and have none yet.
    pub fn list_pending_review(&self) -> Result<Vec<PoolEntry>, PoolError> {
        Ok(self
            .list(&ListOptions::default())?
            .into_iter()
            .filter(|e| {
                e.scoring.gate_required
                    && e.human_review.is_none()
                    && matches!(e.status, PoolStatus::Pending | PoolStatus::Staged)
            })
            .collect())
    }

    // -- internals --

    fn entry_file(&self, dir: &str, id: &str) -> PathBuf {
        self.pool_path.join(dir).join(format!("{id}.json"))
    }

    fn read_entry(&self, path: &Path) -> Result<PoolEntry, PoolError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn locate(&self, id: &str) -> Result<(PathBuf, PoolEntry), PoolError> {
        for dir in [PENDING_DIR, STAGED_DIR, REJECTED_DIR] {
            let path = self.entry_file(dir, id);
            if path.is_file() {
                let entry = self.read_entry(&path)?;
                return Ok((path, entry));
            }
        }
        Err(PoolError::NotFound(id.to_string()))
    }

    fn move_entry(&self, old: &Path, dir: &str, entry: &PoolEntry) -> Result<(), PoolError> {
        let new = self.entry_file(dir, entry.candidate.id.as_str());
        atomic_write_json(&new, entry)?;
        if old != new {
            let _ = std::fs::remove_file(old);
        }
        Ok(())
    }

    fn artifact_path(&self, entry: &PoolEntry) -> PathBuf {
        let tier = artifact_tier_for(entry.candidate.tier);
        let dir = self
            .base_dir
            .join(super::AGENTS_DIR)
            .join(tier.location());
        match tier {
            ArtifactTier::Observation => dir.join(format!("{}.md", entry.candidate.id)),
            _ => dir.join(format!("{}.jsonl", entry.candidate.id)),
        }
    }

    fn write_artifact(
        &self,
        entry: &PoolEntry,
        now: DateTime<Utc>,
    ) -> Result<PathBuf, PoolError> {
        let tier = artifact_tier_for(entry.candidate.tier);
        match tier {
            ArtifactTier::Observation => {
                let path = self.artifact_path(entry);
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let body = format!(
                    "# {}\n**Schema Version:** 1\n**Type:** {}\n\n{}\n",
                    entry.candidate.id, entry.candidate.kind, entry.candidate.content
                );
                crate::jsonl::atomic_write(&path, body.as_bytes())?;
                Ok(path)
            }
            _ => {
                let store = LearningStore::new(&self.base_dir);
                let record = LearningRecord {
                    id: entry.candidate.id.as_str().to_string(),
                    title: title_from_content(&entry.candidate.content),
                    summary: entry.candidate.content.clone(),
                    utility: entry.candidate.utility,
                    confidence: entry.candidate.confidence,
                    maturity: entry.candidate.maturity,
                    reward_count: entry.candidate.reward_count,
                    helpful_count: entry.candidate.helpful_count,
                    harmful_count: entry.candidate.harmful_count,
                    valid_until: entry.candidate.valid_until.clone(),
                    created_at: Some(now),
                    ..LearningRecord::default()
                };
                Ok(store.create(&record)?)
            }
        }
    }
}

/// Where an artifact lands on the tier ladder, by quality tier.
fn artifact_tier_for(tier: Tier) -> ArtifactTier {
    match tier {
        Tier::Gold | Tier::Silver => ArtifactTier::Learning,
        Tier::Bronze | Tier::Discard => ArtifactTier::Observation,
    }
}

fn title_from_content(content: &str) -> String {
    let first_line = content.lines().next().unwrap_or_default().trim();
    if first_line.chars().count() <= 80 {
        return first_line.to_string();
    }
    let prefix: String = first_line.chars().take(80).collect();
    let cut = prefix.rfind(' ').unwrap_or(prefix.len());
    format!("{}…", &prefix[..cut])
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
