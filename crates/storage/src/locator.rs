// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifact locator: pattern search across layered artifact roots.
//!
//! Roots form a closed, priority-ordered set. The same logical name
//! resolving in more than one root is a consistency warning, never an
//! error.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// A layered artifact root, in priority order (highest first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactRoot {
    /// `.agents/` under the project directory.
    Project,
    /// `.agents/` under the nearest enclosing workspace (marked by `.beads/`).
    Workspace,
    /// `.agents/` under the user's home directory.
    Home,
}

impl ArtifactRoot {
    /// All roots, highest priority first.
    pub fn ordered() -> &'static [ArtifactRoot] {
        &[
            ArtifactRoot::Project,
            ArtifactRoot::Workspace,
            ArtifactRoot::Home,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            ArtifactRoot::Project => "project",
            ArtifactRoot::Workspace => "workspace",
            ArtifactRoot::Home => "home",
        }
    }
}

impl std::fmt::Display for ArtifactRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One located artifact.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Match {
    pub root: ArtifactRoot,
    pub path: PathBuf,
}

/// All matches for a pattern plus duplicate warnings.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct FindResult {
    pub matches: Vec<Match>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("invalid pattern {pattern:?}: {message}")]
    Pattern { pattern: String, message: String },
    #[error("no artifact matches {0:?}")]
    NotFound(String),
}

/// Searches a prioritized list of artifact roots for glob patterns.
#[derive(Debug, Clone)]
pub struct Locator {
    roots: Vec<(ArtifactRoot, PathBuf)>,
}

impl Locator {
    /// Build a locator for a project directory. Roots that do not exist on
    /// disk are dropped up front.
    pub fn new(project_dir: &Path) -> Self {
        let mut roots = Vec::new();
        for root in ArtifactRoot::ordered() {
            if let Some(dir) = root_dir(*root, project_dir) {
                if dir.is_dir() {
                    roots.push((*root, dir));
                }
            }
        }
        Self { roots }
    }

    /// Build a locator over explicit root directories (tests, overrides).
    pub fn with_roots(roots: Vec<(ArtifactRoot, PathBuf)>) -> Self {
        Self { roots }
    }

    /// Find all artifacts matching a glob pattern, in root priority order.
    ///
    /// Warns when the same file name resolves under more than one root.
    pub fn find(&self, pattern: &str) -> Result<FindResult, LocatorError> {
        let mut result = FindResult::default();
        let mut seen_names: Vec<(String, ArtifactRoot)> = Vec::new();

        for (root, dir) in &self.roots {
            let full = dir.join(pattern);
            let full_str = full.to_string_lossy();
            let paths = glob::glob(&full_str).map_err(|e| LocatorError::Pattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;

            for path in paths.flatten() {
                if !path.is_file() {
                    continue;
                }
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                if let Some((_, first_root)) =
                    seen_names.iter().find(|(seen, _)| *seen == name)
                {
                    result.warnings.push(format!(
                        "{} found in both {} and {}",
                        name, first_root, root
                    ));
                } else {
                    seen_names.push((name, *root));
                }
                result.matches.push(Match {
                    root: *root,
                    path,
                });
            }
        }

        Ok(result)
    }

    /// Find the single match from the highest-priority root.
    pub fn find_first(&self, pattern: &str) -> Result<Match, LocatorError> {
        let result = self.find(pattern)?;
        result
            .matches
            .into_iter()
            .next()
            .ok_or_else(|| LocatorError::NotFound(pattern.to_string()))
    }

    /// Resolve the directory for a root, if present.
    pub fn root_path(&self, root: ArtifactRoot) -> Option<&Path> {
        self.roots
            .iter()
            .find(|(r, _)| *r == root)
            .map(|(_, p)| p.as_path())
    }
}

fn root_dir(root: ArtifactRoot, project_dir: &Path) -> Option<PathBuf> {
    match root {
        ArtifactRoot::Project => Some(project_dir.join(super::AGENTS_DIR)),
        ArtifactRoot::Workspace => {
            // Walk up looking for a .beads marker; its .agents is the
            // workspace root. Stop before re-selecting the project dir.
            let mut dir = project_dir.parent()?;
            loop {
                if dir.join(".beads").is_dir() {
                    return Some(dir.join(super::AGENTS_DIR));
                }
                dir = dir.parent()?;
            }
        }
        ArtifactRoot::Home => std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(super::AGENTS_DIR)),
    }
}

#[cfg(test)]
#[path = "locator_tests.rs"]
mod tests;
