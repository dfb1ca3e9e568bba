// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flywheel metrics: dK/dt = I − δK + σρK − B.
//!
//! σ is retrieval effectiveness (unique cited / total artifacts), ρ the
//! citation rate per cited artifact per week, δ the fixed decay rate.
//! Escape velocity holds when σρ > δ.

use ao_core::knowledge::DECAY_RATE_PER_WEEK;
use ao_core::{CitationEvent, CitationType};
use ao_storage::{CitationLog, LearningStore};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Artifact directories counted into the knowledge stock.
const ARTIFACT_DIRS: [&str; 4] = ["candidates", "learnings", "patterns", "retros"];

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error(transparent)]
    Jsonl(#[from] ao_storage::JsonlError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Utility distribution across learnings.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct UtilityStats {
    pub count: usize,
    pub mean: f64,
    pub stdev: f64,
    /// Learnings with utility >= 0.7.
    pub high: usize,
    /// Learnings with utility < 0.3.
    pub low: usize,
}

/// One flywheel snapshot.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FlywheelMetrics {
    pub timestamp: DateTime<Utc>,
    pub period_days: i64,
    pub delta: f64,
    pub sigma: f64,
    pub rho: f64,
    pub sigma_rho: f64,
    pub above_escape_velocity: bool,
    pub total_artifacts: usize,
    pub artifacts_by_dir: BTreeMap<String, usize>,
    pub citation_events: usize,
    pub unique_cited: usize,
    pub bypass_count: usize,
    pub learnings_created: usize,
    pub learnings_found: usize,
    pub loop_closure_ratio: f64,
    pub utility: UtilityStats,
}

impl FlywheelMetrics {
    pub fn escape_velocity_status(&self) -> &'static str {
        if self.above_escape_velocity {
            "ACHIEVED"
        } else {
            "BELOW"
        }
    }

    pub fn loop_status(&self) -> &'static str {
        if self.loop_closure_ratio >= 1.0 {
            "CLOSED"
        } else if self.loop_closure_ratio > 0.0 {
            "PARTIAL"
        } else {
            "OPEN"
        }
    }
}

/// Computes and persists flywheel snapshots.
pub struct MetricsEngine {
    base_dir: PathBuf,
}

impl MetricsEngine {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
        }
    }

    /// Compute the flywheel equation over the trailing period.
    pub fn compute(&self, days: i64, now: DateTime<Utc>) -> Result<FlywheelMetrics, MetricsError> {
        let period_start = now - Duration::days(days);
        let citations = CitationLog::new(&self.base_dir).load()?;
        let period: Vec<&CitationEvent> = citations
            .iter()
            .filter(|c| c.cited_at >= period_start && c.cited_at <= now)
            .collect();

        let unique_cited: HashSet<&str> =
            period.iter().map(|c| c.artifact_path.as_str()).collect();
        let bypass_count = period
            .iter()
            .filter(|c| c.citation_type == CitationType::Bypass)
            .count();

        let (total_artifacts, artifacts_by_dir) = self.count_artifacts();

        let weeks = (days as f64) / 7.0;
        let sigma = if total_artifacts > 0 {
            unique_cited.len() as f64 / total_artifacts as f64
        } else {
            0.0
        };
        let rho = if !unique_cited.is_empty() && weeks > 0.0 {
            period.len() as f64 / unique_cited.len() as f64 / weeks
        } else {
            0.0
        };
        let sigma_rho = sigma * rho;

        let learnings_created = self.count_learnings_created(period_start);
        let learnings_found = period
            .iter()
            .filter(|c| c.artifact_path.contains("learnings"))
            .map(|c| c.artifact_path.as_str())
            .collect::<HashSet<_>>()
            .len();
        let loop_closure_ratio = if learnings_created > 0 {
            learnings_found as f64 / learnings_created as f64
        } else {
            0.0
        };

        Ok(FlywheelMetrics {
            timestamp: now,
            period_days: days,
            delta: DECAY_RATE_PER_WEEK,
            sigma,
            rho,
            sigma_rho,
            above_escape_velocity: sigma_rho > DECAY_RATE_PER_WEEK,
            total_artifacts,
            artifacts_by_dir,
            citation_events: period.len(),
            unique_cited: unique_cited.len(),
            bypass_count,
            learnings_created,
            learnings_found,
            loop_closure_ratio,
            utility: self.utility_stats(),
        })
    }

    /// Persist a snapshot as `baseline-YYYY-MM-DD.json`.
    pub fn save_baseline(&self, metrics: &FlywheelMetrics) -> Result<PathBuf, MetricsError> {
        let dir = self.base_dir.join(ao_storage::AO_DIR).join("metrics");
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(format!(
            "baseline-{}.json",
            metrics.timestamp.format("%Y-%m-%d")
        ));
        ao_storage::atomic_write_json(&path, metrics)?;
        Ok(path)
    }

    /// Record a manual (bypass) citation for an artifact.
    pub fn record_citation(
        &self,
        artifact: &str,
        session_id: &str,
        citation_type: CitationType,
        now: DateTime<Utc>,
    ) -> Result<(), MetricsError> {
        CitationLog::new(&self.base_dir).record(&CitationEvent {
            artifact_path: artifact.to_string(),
            session_id: session_id.to_string(),
            cited_at: now,
            citation_type,
            query: None,
        })?;
        Ok(())
    }

    fn count_artifacts(&self) -> (usize, BTreeMap<String, usize>) {
        let mut by_dir = BTreeMap::new();
        let mut total = 0usize;
        for dir in ARTIFACT_DIRS {
            let path = self.base_dir.join(ao_storage::AGENTS_DIR).join(dir);
            let count = count_files(&path);
            total += count;
            by_dir.insert(dir.to_string(), count);
        }
        (total, by_dir)
    }

    fn count_learnings_created(&self, since: DateTime<Utc>) -> usize {
        let store = LearningStore::new(&self.base_dir);
        store
            .list_files()
            .iter()
            .filter(|path| {
                let created = store
                    .read(path)
                    .ok()
                    .and_then(|r| r.created_at)
                    .or_else(|| {
                        std::fs::metadata(path)
                            .and_then(|m| m.modified())
                            .ok()
                            .map(DateTime::<Utc>::from)
                    });
                created.map_or(false, |ts| ts >= since)
            })
            .count()
    }

    fn utility_stats(&self) -> UtilityStats {
        let store = LearningStore::new(&self.base_dir);
        let utilities: Vec<f64> = store
            .list_files()
            .iter()
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("jsonl"))
            .filter_map(|p| store.read(p).ok())
            .map(|r| r.utility)
            .collect();

        if utilities.is_empty() {
            return UtilityStats::default();
        }

        let n = utilities.len() as f64;
        let mean = utilities.iter().sum::<f64>() / n;
        let variance = utilities.iter().map(|u| (u - mean).powi(2)).sum::<f64>() / n;

        UtilityStats {
            count: utilities.len(),
            mean,
            stdev: variance.sqrt(),
            high: utilities.iter().filter(|u| **u >= 0.7).count(),
            low: utilities.iter().filter(|u| **u < 0.3).count(),
        }
    }
}

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .filter(|e| e.path().is_file())
                .count()
        })
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
