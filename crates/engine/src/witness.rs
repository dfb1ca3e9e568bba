// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Witness: a side worker that polls the farm session, posts progress to
//! the mailbox, escalates blockers, and announces farm completion.

use crate::farm::FarmError;
use crate::spawn::{self, SpawnTuning};
use ao_adapters::{ProcessControl, SessionAdapter, SessionError};
use ao_storage::farm_meta;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Witness configuration.
#[derive(Debug, Clone)]
pub struct WitnessConfig {
    /// Seconds between farm polls.
    pub poll_interval_secs: u64,
    /// Seconds between progress summaries to the mayor.
    pub summary_interval_secs: u64,
    pub worker_command: String,
    pub worker_binary: String,
    pub tuning: SpawnTuning,
}

impl Default for WitnessConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            summary_interval_secs: 300,
            worker_command: "claude --dangerously-skip-permissions".to_string(),
            worker_binary: "claude".to_string(),
            tuning: SpawnTuning::default(),
        }
    }
}

/// Result of `witness status`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct WitnessStatusReport {
    pub pid: Option<i32>,
    pub running: bool,
    pub session_alive: bool,
    pub heartbeat_age_secs: Option<i64>,
}

/// Supervises the witness session.
pub struct Witness<S: SessionAdapter, P: ProcessControl> {
    sessions: S,
    procs: P,
    base_dir: PathBuf,
    pub config: WitnessConfig,
}

impl<S: SessionAdapter, P: ProcessControl> Witness<S, P> {
    pub fn new(sessions: S, procs: P, base_dir: &Path, config: WitnessConfig) -> Self {
        Self {
            sessions,
            procs,
            base_dir: base_dir.to_path_buf(),
            config,
        }
    }

    pub fn session_name(&self) -> String {
        let project = self
            .base_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "project".to_string());
        format!("ao-farm-witness-{project}")
    }

    /// Spawn the witness against a farm session and record its PID.
    pub async fn start(&self, farm_session: &str) -> Result<i32, FarmError> {
        let session = self.session_name();
        if self.sessions.has_session(&session).await? {
            return Err(FarmError::AlreadyRunning(session));
        }

        let command = spawn::worker_command("witness", farm_session, &self.config.worker_command);
        self.sessions
            .new_session(&session, &self.base_dir, &command)
            .await?;
        let pane = format!("{session}:0");

        if !spawn::wait_for_worker(
            &self.sessions,
            &pane,
            &self.config.worker_binary,
            &self.config.tuning,
        )
        .await
        {
            return Err(FarmError::Session(SessionError::SpawnFailed(
                "witness did not become ready within timeout".to_string(),
            )));
        }

        spawn::dismiss_permission_dialog(&self.sessions, &pane, &self.config.tuning).await?;
        let prompt = build_witness_prompt(
            farm_session,
            self.config.poll_interval_secs,
            self.config.summary_interval_secs,
        );
        spawn::send_nudge(&self.sessions, &pane, &prompt, &self.config.tuning).await?;

        let pid = self
            .sessions
            .pane_pid(&pane)
            .await?
            .unwrap_or(std::process::id() as i32);
        farm_meta::write_witness_pid(&self.base_dir, pid)?;
        tracing::info!(session = %session, pid, "witness started");
        Ok(pid)
    }

    /// Stop the witness. Returns true when something was actually torn
    /// down; a second call is a no-op.
    pub async fn stop(&self) -> bool {
        let mut stopped = false;

        if let Some(pid) = farm_meta::read_witness_pid(&self.base_dir) {
            if self.procs.is_running(pid) {
                self.procs.terminate(pid);
                stopped = true;
            }
        }

        let session = self.session_name();
        if self.sessions.has_session(&session).await.unwrap_or(false) {
            let _ = self.sessions.kill_session(&session).await;
            stopped = true;
        }

        farm_meta::remove_witness_pid(&self.base_dir);
        stopped
    }

    /// Liveness and heartbeat staleness.
    pub async fn status(&self, now: DateTime<Utc>) -> WitnessStatusReport {
        let pid = farm_meta::read_witness_pid(&self.base_dir);
        WitnessStatusReport {
            pid,
            running: pid.map(|p| self.procs.is_running(p)).unwrap_or(false),
            session_alive: self
                .sessions
                .has_session(&self.session_name())
                .await
                .unwrap_or(false),
            heartbeat_age_secs: farm_meta::witness_heartbeat_age(&self.base_dir, now),
        }
    }
}

/// The nudge prompt that turns a worker into the witness.
pub fn build_witness_prompt(farm_session: &str, poll_secs: u64, summary_secs: u64) -> String {
    format!(
        "You are the Witness monitoring Agent Farm session '{farm_session}'.\n\n\
         Your tasks (run continuously):\n\
         1. Every {poll_secs}s: check agent states with 'tmux capture-pane -t {farm_session} -p | tail -50'\n\
         2. Every {poll_secs}s: check progress with 'bd ready | wc -l' and 'bd list --status in_progress | wc -l'\n\
         3. Every {summary_secs}s: send a summary via 'ao mail send --to mayor --body \"Progress: X/Y issues done\"'\n\
         4. Immediately: escalate blockers via 'ao mail send --to mayor --type blocker --body \"BLOCKER: ...\"'\n\
         5. On completion: send 'ao mail send --to mayor --type farm_complete --body \"FARM COMPLETE: N issues in M min\"'\n\n\
         The farm is complete when 'bd ready' returns 0, 'bd list --status in_progress' returns 0, and agents are idle.\n\
         Write a heartbeat every poll: echo $(date +%s) > .witness.heartbeat\n\n\
         Start monitoring now."
    )
}

#[cfg(test)]
#[path = "witness_tests.rs"]
mod tests;
