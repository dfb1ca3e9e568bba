// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-side adapter for the external issue queue (`.beads/issues.jsonl`).
//!
//! The queue tool owns this file; the farm only counts, validates, and
//! requeues orphans. The ready set is the set of issues whose
//! dependencies are all closed.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("issue queue not found at {0}")]
    NotFound(String),
    #[error("malformed issue queue at line {line}: {message}")]
    Malformed { line: usize, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Jsonl(#[from] ao_storage::JsonlError),
}

/// Issue status as maintained by the queue tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Ready,
    InProgress,
    Closed,
    Blocked,
    #[serde(other)]
    #[default]
    Unknown,
}

/// One issue, with only the fields the farm consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Issue {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: IssueStatus,
    #[serde(default)]
    pub deps: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The on-disk issue queue.
#[derive(Debug, Clone)]
pub struct IssueQueue {
    path: PathBuf,
}

impl IssueQueue {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            path: base_dir.join(".beads").join("issues.jsonl"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Strict well-formedness check: every line must be a JSON object.
    /// Returns the line count.
    pub fn validate(&self) -> Result<usize, QueueError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                QueueError::NotFound(self.path.display().to_string())
            } else {
                QueueError::Io(e)
            }
        })?;

        let mut count = 0;
        for (i, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(line).map_err(
                |e| QueueError::Malformed {
                    line: i + 1,
                    message: e.to_string(),
                },
            )?;
            count += 1;
        }
        Ok(count)
    }

    pub fn load(&self) -> Result<Vec<Issue>, QueueError> {
        Ok(ao_storage::read_records(&self.path)?)
    }

    pub fn count_ready(&self) -> Result<usize, QueueError> {
        Ok(self
            .load()?
            .iter()
            .filter(|i| i.status == IssueStatus::Ready)
            .count())
    }

    pub fn count_in_progress(&self) -> Result<usize, QueueError> {
        Ok(self
            .load()?
            .iter()
            .filter(|i| i.status == IssueStatus::InProgress)
            .count())
    }

    /// Find a dependency cycle, if one exists. Returns the cycle as an
    /// ordered id path.
    pub fn detect_cycle(&self) -> Result<Option<Vec<String>>, QueueError> {
        let issues = self.load()?;
        let deps: HashMap<&str, &[String]> = issues
            .iter()
            .map(|i| (i.id.as_str(), i.deps.as_slice()))
            .collect();

        let mut visited: HashSet<&str> = HashSet::new();
        for issue in &issues {
            if visited.contains(issue.id.as_str()) {
                continue;
            }
            let mut stack: Vec<&str> = Vec::new();
            let mut on_stack: HashSet<&str> = HashSet::new();
            if let Some(cycle) =
                walk(issue.id.as_str(), &deps, &mut visited, &mut stack, &mut on_stack)
            {
                return Ok(Some(cycle));
            }
        }
        Ok(None)
    }

    /// Requeue every in-progress issue to ready. Atomic rewrite.
    /// Returns how many issues changed.
    pub fn requeue_in_progress(&self) -> Result<usize, QueueError> {
        let mut issues = self.load()?;
        let mut changed = 0;
        for issue in issues.iter_mut() {
            if issue.status == IssueStatus::InProgress {
                issue.status = IssueStatus::Ready;
                changed += 1;
            }
        }
        if changed > 0 {
            ao_storage::jsonl::rewrite_records(&self.path, &issues)?;
        }
        Ok(changed)
    }
}

fn walk<'a>(
    id: &'a str,
    deps: &HashMap<&'a str, &'a [String]>,
    visited: &mut HashSet<&'a str>,
    stack: &mut Vec<&'a str>,
    on_stack: &mut HashSet<&'a str>,
) -> Option<Vec<String>> {
    if on_stack.contains(id) {
        let start = stack.iter().position(|s| *s == id).unwrap_or(0);
        let mut cycle: Vec<String> = stack[start..].iter().map(|s| s.to_string()).collect();
        cycle.push(id.to_string());
        return Some(cycle);
    }
    if visited.contains(id) {
        return None;
    }

    visited.insert(id);
    stack.push(id);
    on_stack.insert(id);

    if let Some(children) = deps.get(id) {
        for dep in children.iter() {
            if let Some(cycle) = walk(dep.as_str(), deps, visited, stack, on_stack) {
                return Some(cycle);
            }
        }
    }

    stack.pop();
    on_stack.remove(id);
    None
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
