// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Farm metadata and witness PID persistence.
//!
//! Single-writer files owned by the supervisor process. Writes are atomic
//! and mode 0600; loss of either file degrades `stop` to cleanup by
//! conventional session names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the farm metadata, relative to the project root.
pub const FARM_META_FILE: &str = ".farm.meta";

/// File name of the witness PID file.
pub const WITNESS_PID_FILE: &str = ".witness.pid";

/// File name of the witness heartbeat (epoch seconds).
pub const WITNESS_HEARTBEAT_FILE: &str = ".witness.heartbeat";

/// Lock file excluding concurrent supervisors in one project.
pub const FARM_LOCK_FILE: &str = ".farm.lock";

#[derive(Debug, Error)]
pub enum FarmMetaError {
    #[error("farm metadata not found at {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse farm metadata: {0}")]
    Json(#[from] serde_json::Error),
    #[error("another supervisor holds {0}")]
    Locked(String),
}

/// Lifecycle state of a farm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FarmStatus {
    #[default]
    Running,
    Stopped,
    Completed,
}

/// Persistent state of one farm run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FarmMeta {
    pub farm_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epic_id: Option<String>,
    pub agent_count: usize,
    pub tmux_session: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness_session: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness_pid: Option<i32>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub agent_pids: Vec<i32>,
    #[serde(default)]
    pub status: FarmStatus,
}

impl FarmMeta {
    /// Save atomically with owner-only permissions.
    pub fn save(&self, base_dir: &Path) -> Result<(), FarmMetaError> {
        let path = base_dir.join(FARM_META_FILE);
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        crate::jsonl::atomic_write(&path, &bytes)?;
        restrict_permissions(&path)?;
        Ok(())
    }

    pub fn load(base_dir: &Path) -> Result<FarmMeta, FarmMetaError> {
        let path = base_dir.join(FARM_META_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FarmMetaError::NotFound(path.display().to_string())
            } else {
                FarmMetaError::Io(e)
            }
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn remove(base_dir: &Path) {
        let _ = std::fs::remove_file(base_dir.join(FARM_META_FILE));
    }
}

/// Write the witness PID file (plain text, 0600).
pub fn write_witness_pid(base_dir: &Path, pid: i32) -> Result<(), FarmMetaError> {
    let path = base_dir.join(WITNESS_PID_FILE);
    crate::jsonl::atomic_write(&path, format!("{pid}\n").as_bytes())?;
    restrict_permissions(&path)?;
    Ok(())
}

/// Read the witness PID file if present and parseable.
pub fn read_witness_pid(base_dir: &Path) -> Option<i32> {
    let content = std::fs::read_to_string(base_dir.join(WITNESS_PID_FILE)).ok()?;
    content.trim().parse().ok()
}

pub fn remove_witness_pid(base_dir: &Path) {
    let _ = std::fs::remove_file(base_dir.join(WITNESS_PID_FILE));
}

/// Age of the witness heartbeat in seconds, if one exists.
pub fn witness_heartbeat_age(base_dir: &Path, now: DateTime<Utc>) -> Option<i64> {
    let content = std::fs::read_to_string(base_dir.join(WITNESS_HEARTBEAT_FILE)).ok()?;
    let epoch: i64 = content.trim().parse().ok()?;
    Some(now.timestamp() - epoch)
}

/// Acquire the supervisor lock. Fails when another supervisor holds it.
pub fn acquire_farm_lock(base_dir: &Path, farm_id: &str) -> Result<PathBuf, FarmMetaError> {
    let path = base_dir.join(FARM_LOCK_FILE);
    let result = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path);
    match result {
        Ok(mut file) => {
            use std::io::Write as _;
            let _ = writeln!(file, "{farm_id}");
            Ok(path)
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(FarmMetaError::Locked(path.display().to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Release the supervisor lock. Safe to call when already released.
pub fn release_farm_lock(base_dir: &Path) {
    let _ = std::fs::remove_file(base_dir.join(FARM_LOCK_FILE));
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
#[path = "farm_meta_tests.rs"]
mod tests;
