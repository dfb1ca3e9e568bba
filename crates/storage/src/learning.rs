// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Learning record store.
//!
//! A learning lives in `.agents/learnings/<id>.jsonl`; the first line is
//! its record, later lines are free-form history. Updates rewrite the
//! first line only, via temp file + atomic rename. Unknown fields are
//! preserved across rewrites.

use ao_core::knowledge::{Maturity, INITIAL_UTILITY};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LearningError {
    #[error("learning not found: {0}")]
    NotFound(String),
    #[error("empty learning file: {0}")]
    Empty(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse learning: {0}")]
    Json(#[from] serde_json::Error),
}

/// First-line record of a learning file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
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
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reward: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maturity_changed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maturity_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_utility() -> f64 {
    INITIAL_UTILITY
}

impl Default for LearningRecord {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            summary: String::new(),
            content: String::new(),
            utility: INITIAL_UTILITY,
            confidence: 0.0,
            maturity: Maturity::Provisional,
            reward_count: 0,
            helpful_count: 0,
            harmful_count: 0,
            superseded_by: None,
            valid_until: None,
            last_reward: None,
            maturity_changed_at: None,
            maturity_reason: None,
            created_at: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// Store over a learnings directory.
#[derive(Debug, Clone)]
pub struct LearningStore {
    dir: PathBuf,
}

impl LearningStore {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            dir: base_dir.join(super::AGENTS_DIR).join("learnings"),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All learning files in the store: `*.jsonl` plus `*.md` companions.
    pub fn list_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = Vec::new();
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return files;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            match path.extension().and_then(|e| e.to_str()) {
                Some("jsonl") | Some("md") => files.push(path),
                _ => {}
            }
        }
        files.sort();
        files
    }

    /// Read the first-line record of a learning file.
    pub fn read(&self, path: &Path) -> Result<LearningRecord, LearningError> {
        let content = std::fs::read_to_string(path)?;
        let first = content
            .lines()
            .next()
            .filter(|l| !l.trim().is_empty())
            .ok_or_else(|| LearningError::Empty(path.display().to_string()))?;
        let mut record: LearningRecord = serde_json::from_str(first)?;
        if record.id.is_empty() {
            record.id = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
        }
        Ok(record)
    }

    /// Atomically read-modify-write the first record line of a learning.
    ///
    /// Trailing lines are preserved byte for byte.
    pub fn update<F>(&self, path: &Path, mutate: F) -> Result<LearningRecord, LearningError>
    where
        F: FnOnce(&mut LearningRecord),
    {
        let content = std::fs::read_to_string(path)?;
        let mut lines = content.lines();
        let first = lines
            .next()
            .filter(|l| !l.trim().is_empty())
            .ok_or_else(|| LearningError::Empty(path.display().to_string()))?;

        let mut record: LearningRecord = serde_json::from_str(first)?;
        mutate(&mut record);

        let mut out = serde_json::to_string(&record)?;
        for line in lines {
            out.push('\n');
            out.push_str(line);
        }
        out.push('\n');

        crate::jsonl::atomic_write(path, out.as_bytes())?;
        Ok(record)
    }

    /// Write a new learning record as `<id>.jsonl` in the store.
    pub fn create(&self, record: &LearningRecord) -> Result<PathBuf, LearningError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.jsonl", record.id));
        let mut bytes = serde_json::to_vec(record)?;
        bytes.push(b'\n');
        crate::jsonl::atomic_write(&path, &bytes)?;
        Ok(path)
    }

    /// Find a learning file by its file name.
    pub fn find_by_name(&self, name: &str) -> Result<PathBuf, LearningError> {
        let direct = self.dir.join(name);
        if direct.is_file() {
            return Ok(direct);
        }
        self.list_files()
            .into_iter()
            .find(|p| p.file_name().map(|n| n.to_string_lossy() == name).unwrap_or(false))
            .ok_or_else(|| LearningError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
#[path = "learning_tests.rs"]
mod tests;
