// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tmux session adapter

use super::{SessionAdapter, SessionError};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

/// Tmux-based session adapter
#[derive(Clone, Default)]
pub struct TmuxAdapter;

impl TmuxAdapter {
    pub fn new() -> Self {
        Self
    }

    /// True when the tmux binary is on PATH.
    pub async fn binary_available() -> bool {
        Command::new("tmux")
            .arg("-V")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

async fn run_tmux(args: &[&str]) -> Result<std::process::Output, SessionError> {
    Command::new("tmux")
        .args(args)
        .output()
        .await
        .map_err(|e| SessionError::CommandFailed(e.to_string()))
}

#[async_trait]
impl SessionAdapter for TmuxAdapter {
    async fn new_session(
        &self,
        name: &str,
        cwd: &Path,
        command: &str,
    ) -> Result<(), SessionError> {
        // Precondition: cwd must exist
        if !cwd.exists() {
            return Err(SessionError::SpawnFailed(format!(
                "working directory does not exist: {}",
                cwd.display()
            )));
        }

        let cwd_str = cwd.to_string_lossy();
        let output = run_tmux(&[
            "new-session",
            "-d",
            "-s",
            name,
            "-c",
            cwd_str.as_ref(),
            command,
        ])
        .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(session = name, stderr = %stderr, "tmux new-session failed");
            return Err(SessionError::SpawnFailed(stderr.to_string()));
        }

        // Log stderr even on success - may contain useful warnings
        if !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(session = name, stderr = %stderr, "tmux spawn stderr (non-fatal)");
        }

        Ok(())
    }

    async fn split_window(
        &self,
        session: &str,
        cwd: &Path,
        command: &str,
    ) -> Result<(), SessionError> {
        let cwd_str = cwd.to_string_lossy();
        let output = run_tmux(&[
            "split-window",
            "-t",
            session,
            "-h",
            "-c",
            cwd_str.as_ref(),
            command,
        ])
        .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SessionError::SpawnFailed(stderr.to_string()));
        }

        // Rebalance panes; styling failures are non-fatal
        let tiled = run_tmux(&["select-layout", "-t", session, "tiled"]).await?;
        if !tiled.status.success() {
            tracing::warn!(session, "tmux select-layout failed (non-fatal)");
        }

        Ok(())
    }

    async fn has_session(&self, name: &str) -> Result<bool, SessionError> {
        let output = run_tmux(&["has-session", "-t", name]).await?;
        Ok(output.status.success())
    }

    async fn kill_session(&self, name: &str) -> Result<(), SessionError> {
        let output = run_tmux(&["kill-session", "-t", name]).await?;
        if !output.status.success() {
            // Session might already be dead, which is fine
        }
        Ok(())
    }

    async fn send_key(&self, target: &str, key: &str) -> Result<(), SessionError> {
        let output = run_tmux(&["send-keys", "-t", target, key]).await?;
        if !output.status.success() {
            return Err(SessionError::NotFound(target.to_string()));
        }
        Ok(())
    }

    async fn send_literal(&self, target: &str, text: &str) -> Result<(), SessionError> {
        // -l = literal mode (no key name interpretation)
        // -- = end of options (handles text starting with -)
        let output = run_tmux(&["send-keys", "-t", target, "-l", "--", text]).await?;
        if !output.status.success() {
            return Err(SessionError::NotFound(target.to_string()));
        }
        Ok(())
    }

    async fn pane_command(&self, target: &str) -> Result<String, SessionError> {
        let output =
            run_tmux(&["display-message", "-t", target, "-p", "#{pane_current_command}"]).await?;
        if !output.status.success() {
            return Err(SessionError::NotFound(target.to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn pane_pid(&self, target: &str) -> Result<Option<i32>, SessionError> {
        let output = run_tmux(&["list-panes", "-t", target, "-F", "#{pane_pid}"]).await?;
        if !output.status.success() {
            return Err(SessionError::NotFound(target.to_string()));
        }
        let first = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or("")
            .trim()
            .to_string();
        Ok(first.parse().ok())
    }

    async fn capture_output(&self, target: &str, lines: u32) -> Result<String, SessionError> {
        let start = format!("-{}", lines);
        let output = run_tmux(&["capture-pane", "-t", target, "-p", "-S", &start]).await?;
        if !output.status.success() {
            return Err(SessionError::NotFound(target.to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
