// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only citation ledger at `.agents/ao/citations.jsonl`.

use crate::jsonl::{append_record, read_records, JsonlError};
use ao_core::{CitationEvent, CitationType};
use std::path::{Path, PathBuf};

/// Records every retrieval and application of an artifact by a session.
#[derive(Debug, Clone)]
pub struct CitationLog {
    path: PathBuf,
}

impl CitationLog {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            path: base_dir.join(super::AO_DIR).join("citations.jsonl"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one citation event.
    pub fn record(&self, event: &CitationEvent) -> Result<(), JsonlError> {
        append_record(&self.path, event)
    }

    /// Load every citation event on disk.
    pub fn load(&self) -> Result<Vec<CitationEvent>, JsonlError> {
        read_records(&self.path)
    }

    /// Load citations for one session, optionally filtered by type.
    pub fn load_for_session(
        &self,
        session_id: &str,
        citation_type: Option<CitationType>,
    ) -> Result<Vec<CitationEvent>, JsonlError> {
        let all = self.load()?;
        Ok(all
            .into_iter()
            .filter(|c| c.session_id == session_id)
            .filter(|c| citation_type.map_or(true, |t| c.citation_type == t))
            .collect())
    }
}

#[cfg(test)]
#[path = "citations_tests.rs"]
mod tests;
