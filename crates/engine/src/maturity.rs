// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maturity engine: state machine over learnings driven by utility and
//! feedback counts. The anti-pattern rule always has priority.

use ao_core::knowledge::{
    Maturity, MATURITY_ANTI_PATTERN_THRESHOLD, MATURITY_DEMOTION_THRESHOLD,
    MATURITY_PROMOTION_THRESHOLD, MIN_FEEDBACK_FOR_ANTI_PATTERN, MIN_FEEDBACK_FOR_PROMOTION,
};
use ao_storage::{LearningError, LearningRecord, LearningStore};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Reward events required before candidate can establish.
const MIN_FEEDBACK_FOR_ESTABLISHED: u32 = 5;

/// Result of evaluating one learning for a transition.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TransitionResult {
    pub learning_id: String,
    pub old_maturity: Maturity,
    pub new_maturity: Maturity,
    pub transitioned: bool,
    pub reason: String,
    pub utility: f64,
    pub reward_count: u32,
    pub helpful_count: u32,
    pub harmful_count: u32,
}

/// Evaluates and applies maturity transitions.
#[derive(Debug, Clone)]
pub struct MaturityEngine {
    store: LearningStore,
}

impl MaturityEngine {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            store: LearningStore::new(base_dir),
        }
    }

    /// Pure transition check over a record.
    pub fn check(record: &LearningRecord) -> TransitionResult {
        let current = record.maturity;
        let utility = record.utility;
        let mut result = TransitionResult {
            learning_id: record.id.clone(),
            old_maturity: current,
            new_maturity: current,
            transitioned: false,
            reason: String::new(),
            utility,
            reward_count: record.reward_count,
            helpful_count: record.helpful_count,
            harmful_count: record.harmful_count,
        };

        // Anti-pattern rule takes priority over everything else.
        if utility <= MATURITY_ANTI_PATTERN_THRESHOLD
            && record.harmful_count >= MIN_FEEDBACK_FOR_ANTI_PATTERN
        {
            result.new_maturity = Maturity::AntiPattern;
            result.transitioned = current != Maturity::AntiPattern;
            result.reason = format!(
                "utility {:.2} <= {:.2} and harmful_count {} >= {}",
                utility,
                MATURITY_ANTI_PATTERN_THRESHOLD,
                record.harmful_count,
                MIN_FEEDBACK_FOR_ANTI_PATTERN
            );
            return result;
        }

        match current {
            Maturity::Provisional => {
                if utility >= MATURITY_PROMOTION_THRESHOLD
                    && record.reward_count >= MIN_FEEDBACK_FOR_PROMOTION
                {
                    result.new_maturity = Maturity::Candidate;
                    result.transitioned = true;
                    result.reason = format!(
                        "utility {:.2} >= {:.2} and reward_count {} >= {}",
                        utility,
                        MATURITY_PROMOTION_THRESHOLD,
                        record.reward_count,
                        MIN_FEEDBACK_FOR_PROMOTION
                    );
                } else {
                    result.reason = "not enough positive feedback for promotion".to_string();
                }
            }
            Maturity::Candidate => {
                if utility >= MATURITY_PROMOTION_THRESHOLD
                    && record.reward_count >= MIN_FEEDBACK_FOR_ESTABLISHED
                    && record.helpful_count > record.harmful_count
                {
                    result.new_maturity = Maturity::Established;
                    result.transitioned = true;
                    result.reason = format!(
                        "utility {:.2} >= {:.2}, reward_count {} >= {}, helpful > harmful ({} > {})",
                        utility,
                        MATURITY_PROMOTION_THRESHOLD,
                        record.reward_count,
                        MIN_FEEDBACK_FOR_ESTABLISHED,
                        record.helpful_count,
                        record.harmful_count
                    );
                } else if utility < MATURITY_DEMOTION_THRESHOLD {
                    result.new_maturity = Maturity::Provisional;
                    result.transitioned = true;
                    result.reason = format!(
                        "utility {:.2} < {:.2} (demotion)",
                        utility, MATURITY_DEMOTION_THRESHOLD
                    );
                } else {
                    result.reason = "maintaining candidate status".to_string();
                }
            }
            Maturity::Established => {
                if utility < 0.5 {
                    result.new_maturity = Maturity::Candidate;
                    result.transitioned = true;
                    result.reason =
                        format!("utility {:.2} < 0.5 (demotion from established)", utility);
                } else {
                    result.reason = "maintaining established status".to_string();
                }
            }
            Maturity::AntiPattern => {
                if utility >= 0.6 && record.helpful_count > record.harmful_count * 2 {
                    result.new_maturity = Maturity::Provisional;
                    result.transitioned = true;
                    result.reason = format!(
                        "utility {:.2} >= 0.6 and helpful > 2*harmful ({} > {}): rehabilitation",
                        utility,
                        record.helpful_count,
                        record.harmful_count * 2
                    );
                } else {
                    result.reason = "maintaining anti-pattern status".to_string();
                }
            }
        }

        result
    }

    /// Check a learning file and apply the transition if one fires.
    pub fn apply(
        &self,
        path: &Path,
        now: DateTime<Utc>,
    ) -> Result<TransitionResult, LearningError> {
        let record = self.store.read(path)?;
        let result = Self::check(&record);
        if !result.transitioned {
            return Ok(result);
        }

        let new_maturity = result.new_maturity;
        let reason = result.reason.clone();
        self.store.update(path, |r| {
            r.maturity = new_maturity;
            r.maturity_changed_at = Some(now);
            r.maturity_reason = Some(reason);
        })?;
        Ok(result)
    }

    /// Scan the store and return every learning that would transition.
    pub fn scan(&self) -> Vec<(PathBuf, TransitionResult)> {
        let mut pending = Vec::new();
        for path in self.store.list_files() {
            if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
                continue;
            }
            let Ok(record) = self.store.read(&path) else {
                continue;
            };
            let result = Self::check(&record);
            if result.transitioned {
                pending.push((path, result));
            }
        }
        pending
    }
}

#[cfg(test)]
#[path = "maturity_tests.rs"]
mod tests;
