// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only feedback ledger at `.agents/ao/feedback.jsonl`.

use crate::jsonl::{append_record, read_records, JsonlError};
use ao_core::FeedbackEvent;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Records every utility update applied by the feedback loop.
#[derive(Debug, Clone)]
pub struct FeedbackLog {
    path: PathBuf,
}

impl FeedbackLog {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            path: base_dir.join(super::AO_DIR).join("feedback.jsonl"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, event: &FeedbackEvent) -> Result<(), JsonlError> {
        append_record(&self.path, event)
    }

    pub fn record_all(&self, events: &[FeedbackEvent]) -> Result<(), JsonlError> {
        for event in events {
            self.record(event)?;
        }
        Ok(())
    }

    pub fn load(&self) -> Result<Vec<FeedbackEvent>, JsonlError> {
        read_records(&self.path)
    }

    /// Session ids that already have feedback recorded.
    pub fn processed_sessions(&self) -> Result<HashSet<String>, JsonlError> {
        Ok(self.load()?.into_iter().map(|e| e.session_id).collect())
    }
}

#[cfg(test)]
#[path = "feedback_tests.rs"]
mod tests;
