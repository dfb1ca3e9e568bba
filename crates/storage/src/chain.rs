// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The ratchet chain: an append-only lifecycle ledger with step gates and
//! provenance tracing.

use crate::jsonl::{append_record, read_records, JsonlError};
use ao_core::ratchet::{ChainEntry, Step, StepStatus};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from chain operations.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("IO error: {0}")]
    Jsonl(#[from] JsonlError),
    #[error("state error: step {step} output {output:?} is already locked")]
    LockedConflict { step: Step, output: String },
}

/// Result of checking a step gate.
#[derive(Debug, Clone, serde::Serialize)]
pub struct GateResult {
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub message: String,
}

/// The append-only ratchet chain at `.agents/ao/chain.jsonl`.
#[derive(Debug, Clone)]
pub struct Chain {
    path: PathBuf,
    pub entries: Vec<ChainEntry>,
}

impl Chain {
    /// Load the chain for a project directory, creating nothing on disk.
    pub fn load(base_dir: &Path) -> Result<Self, ChainError> {
        let path = base_dir.join(super::AO_DIR).join("chain.jsonl");
        let entries = read_records(&path)?;
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry, enforcing the ratchet rule: once an entry for a
    /// `(step, output)` pair is locked, an unlocked entry for the same pair
    /// is rejected.
    pub fn append(&mut self, entry: ChainEntry) -> Result<(), ChainError> {
        if !entry.locked {
            let locked_before = self
                .entries
                .iter()
                .any(|e| e.step == entry.step && e.output == entry.output && e.locked);
            if locked_before {
                return Err(ChainError::LockedConflict {
                    step: entry.step,
                    output: entry.output,
                });
            }
        }
        append_record(&self.path, &entry)?;
        self.entries.push(entry);
        Ok(())
    }

    /// Latest entry for a step, if any.
    pub fn latest(&self, step: Step) -> Option<&ChainEntry> {
        self.entries.iter().rev().find(|e| e.step == step)
    }

    /// Derived status for a step.
    pub fn status(&self, step: Step) -> StepStatus {
        match self.latest(step) {
            None => StepStatus::Pending,
            Some(entry) if entry.skipped => StepStatus::Skipped,
            Some(entry) if entry.locked => StepStatus::Locked,
            Some(_) => StepStatus::InProgress,
        }
    }

    /// Status for every ladder step, in order.
    pub fn all_status(&self) -> Vec<(Step, StepStatus)> {
        Step::ladder()
            .iter()
            .map(|s| (*s, self.status(*s)))
            .collect()
    }

    /// Walk the chain backward from an artifact: collect each entry whose
    /// output matches the cursor, then move the cursor to its input.
    /// Returns the provenance chain oldest-first.
    pub fn trace(&self, artifact: &str) -> Vec<&ChainEntry> {
        let mut chain: Vec<&ChainEntry> = Vec::new();
        let mut cursor = artifact.to_string();

        for entry in self.entries.iter().rev() {
            let matches = entry.output == cursor || entry.output.ends_with(&cursor);
            if matches && !entry.output.is_empty() {
                chain.insert(0, entry);
                match &entry.input {
                    Some(input) if !input.is_empty() => cursor = input.clone(),
                    _ => break,
                }
            }
        }

        chain
    }

    /// Check whether the gate for a step is met.
    ///
    /// A step passes when its prerequisite's latest entry is locked or an
    /// intentional skip; the prerequisite's output becomes the step input.
    pub fn check_gate(&self, step: Step) -> GateResult {
        let Some(prereq) = step.prerequisite() else {
            return GateResult {
                passed: true,
                input: None,
                location: None,
                message: format!("{step} has no prerequisite"),
            };
        };

        match self.latest(prereq) {
            None => GateResult {
                passed: false,
                input: None,
                location: None,
                message: format!("{prereq} has not been recorded; run it before {step}"),
            },
            Some(entry) if entry.skipped => GateResult {
                passed: true,
                input: None,
                location: entry.location.clone(),
                message: format!(
                    "{prereq} was skipped ({})",
                    entry.reason.as_deref().unwrap_or("no reason recorded")
                ),
            },
            Some(entry) if entry.locked => GateResult {
                passed: true,
                input: Some(entry.output.clone()),
                location: entry.location.clone(),
                message: format!("{prereq} locked: {}", entry.output),
            },
            Some(_) => GateResult {
                passed: false,
                input: None,
                location: None,
                message: format!("{prereq} is in progress but not locked"),
            },
        }
    }
}

#[cfg(test)]
#[path = "chain_tests.rs"]
mod tests;
