// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Farm supervisor: pre-flight validation, staggered spawn with a circuit
//! breaker, cleanup, stop, status, and resume/reconcile.
//!
//! One supervisor process owns the farm. Each spawn failure is counted,
//! not raised, until the circuit breaker fires; metadata write failures
//! are warn-only and the farm continues.

use crate::queue::{IssueQueue, QueueError};
use crate::spawn::{self, SpawnTuning};
use crate::witness::{Witness, WitnessConfig};
use ao_adapters::{available_disk_space, ProcessControl, SessionAdapter, SessionError};
use ao_storage::farm_meta::{
    self, FarmMeta, FarmMetaError, FarmStatus,
};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Hard cap on spawned agents.
pub const MAX_AGENTS: usize = 10;

/// Pre-flight wants at least this much free disk.
const MIN_DISK_BYTES: u64 = 5 * 1024 * 1024 * 1024;

/// Spawn attempts before the circuit breaker may fire.
const CIRCUIT_BREAKER_MIN_ATTEMPTS: usize = 3;

#[derive(Debug, Error)]
pub enum FarmError {
    #[error("pre-flight failed: {0}")]
    Preflight(String),
    #[error("farm already running in session {0} - stop it first")]
    AlreadyRunning(String),
    #[error("circuit breaker triggered")]
    CircuitBreaker,
    #[error("interrupted during spawn")]
    Interrupted,
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Meta(#[from] FarmMetaError),
}

/// Outcome of one pre-flight check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Ok,
    Warn,
    Fail,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct PreflightCheck {
    pub name: &'static str,
    pub status: CheckStatus,
    pub detail: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct PreflightReport {
    pub checks: Vec<PreflightCheck>,
    pub passed: bool,
}

/// Supervisor configuration.
#[derive(Debug, Clone)]
pub struct FarmConfig {
    pub agents: usize,
    pub epic: Option<String>,
    pub stagger: Duration,
    pub witness: bool,
    /// Full worker invocation appended to `exec env ...`.
    pub worker_command: String,
    /// Binary name used by the readiness heuristic and pre-flight.
    pub worker_binary: String,
    pub tuning: SpawnTuning,
    /// Grace period between killing sessions and force-killing PIDs.
    pub cleanup_grace: Duration,
}

impl Default for FarmConfig {
    fn default() -> Self {
        Self {
            agents: 5,
            epic: None,
            stagger: Duration::from_secs(30),
            witness: true,
            worker_command: "claude --dangerously-skip-permissions".to_string(),
            worker_binary: "claude".to_string(),
            tuning: SpawnTuning::default(),
            cleanup_grace: Duration::from_secs(2),
        }
    }
}

/// Result of `stop`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StopReport {
    pub farm_id: Option<String>,
    /// True when metadata was missing and cleanup fell back to
    /// conventional session names.
    pub fallback: bool,
}

/// Result of `status`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FarmStatusReport {
    pub meta: Option<FarmMeta>,
    pub session_alive: bool,
    pub witness_alive: bool,
    pub live_agents: usize,
    pub dead_agents: usize,
    pub ready: usize,
    pub in_progress: usize,
}

/// Result of `resume`.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ResumeReport {
    pub agent_session_alive: bool,
    pub witness_session_alive: bool,
    pub in_progress: usize,
    pub requeued: usize,
    pub meta_recreated: bool,
    pub stale_pid_removed: bool,
}

/// The farm supervisor.
pub struct FarmSupervisor<S: SessionAdapter, P: ProcessControl> {
    sessions: S,
    procs: P,
    base_dir: PathBuf,
    pub config: FarmConfig,
}

impl<S: SessionAdapter, P: ProcessControl> FarmSupervisor<S, P> {
    pub fn new(sessions: S, procs: P, base_dir: &Path, config: FarmConfig) -> Self {
        Self {
            sessions,
            procs,
            base_dir: base_dir.to_path_buf(),
            config,
        }
    }

    /// Agent session name, derived from the project directory.
    pub fn session_name(&self) -> String {
        format!("ao-farm-{}", project_name(&self.base_dir))
    }

    /// Witness session name.
    pub fn witness_session_name(&self) -> String {
        format!("ao-farm-witness-{}", project_name(&self.base_dir))
    }

    /// Full pre-flight validation. Disk space is warn-only.
    pub async fn preflight(&self) -> PreflightReport {
        let mut checks = Vec::new();
        let queue = IssueQueue::new(&self.base_dir);

        match queue.validate() {
            Ok(count) => checks.push(PreflightCheck {
                name: "issue queue",
                status: CheckStatus::Ok,
                detail: format!("{count} issues at {}", queue.path().display()),
            }),
            Err(e) => checks.push(PreflightCheck {
                name: "issue queue",
                status: CheckStatus::Fail,
                detail: e.to_string(),
            }),
        }

        match queue.count_ready() {
            Ok(0) => checks.push(PreflightCheck {
                name: "ready issues",
                status: CheckStatus::Fail,
                detail: "0 issues ready (all blocked?)".to_string(),
            }),
            Ok(n) => checks.push(PreflightCheck {
                name: "ready issues",
                status: CheckStatus::Ok,
                detail: format!("{n} available"),
            }),
            Err(e) => checks.push(PreflightCheck {
                name: "ready issues",
                status: CheckStatus::Fail,
                detail: e.to_string(),
            }),
        }

        match queue.detect_cycle() {
            Ok(None) => checks.push(PreflightCheck {
                name: "dependencies",
                status: CheckStatus::Ok,
                detail: "no cycles".to_string(),
            }),
            Ok(Some(cycle)) => checks.push(PreflightCheck {
                name: "dependencies",
                status: CheckStatus::Fail,
                detail: format!("circular: {}", cycle.join(" -> ")),
            }),
            Err(e) => checks.push(PreflightCheck {
                name: "dependencies",
                status: CheckStatus::Fail,
                detail: e.to_string(),
            }),
        }

        match available_disk_space(&self.base_dir).await {
            Some(bytes) if bytes < MIN_DISK_BYTES => checks.push(PreflightCheck {
                name: "disk space",
                status: CheckStatus::Warn,
                detail: format!(
                    "{:.1} GB available (< 5GB)",
                    bytes as f64 / (1024.0 * 1024.0 * 1024.0)
                ),
            }),
            Some(bytes) => checks.push(PreflightCheck {
                name: "disk space",
                status: CheckStatus::Ok,
                detail: format!("{:.1} GB available", bytes as f64 / (1024.0 * 1024.0 * 1024.0)),
            }),
            None => checks.push(PreflightCheck {
                name: "disk space",
                status: CheckStatus::Warn,
                detail: "could not probe".to_string(),
            }),
        }

        // The multiplexer is reachable when session queries answer at all.
        match self.sessions.has_session("ao-preflight-probe").await {
            Ok(_) => checks.push(PreflightCheck {
                name: "multiplexer",
                status: CheckStatus::Ok,
                detail: "available".to_string(),
            }),
            Err(e) => checks.push(PreflightCheck {
                name: "multiplexer",
                status: CheckStatus::Fail,
                detail: e.to_string(),
            }),
        }

        if spawn::binary_on_path(&self.config.worker_binary) {
            checks.push(PreflightCheck {
                name: "worker binary",
                status: CheckStatus::Ok,
                detail: format!("{} on PATH", self.config.worker_binary),
            });
        } else {
            checks.push(PreflightCheck {
                name: "worker binary",
                status: CheckStatus::Fail,
                detail: format!("{} not found in PATH", self.config.worker_binary),
            });
        }

        let passed = checks.iter().all(|c| c.status != CheckStatus::Fail);
        PreflightReport { checks, passed }
    }

    /// Start the farm: pre-flight, staggered spawn, witness, metadata.
    ///
    /// `interrupt` carries termination signals; one received mid-spawn
    /// runs cleanup and fails with an interruption error.
    pub async fn start(
        &self,
        interrupt: &mut mpsc::Receiver<()>,
    ) -> Result<FarmMeta, FarmError> {
        let queue = IssueQueue::new(&self.base_dir);
        if !queue.exists() {
            return Err(FarmError::Preflight(format!(
                "issue queue not found at {}",
                queue.path().display()
            )));
        }
        let ready = queue.count_ready()?;
        if ready == 0 {
            return Err(FarmError::Preflight(
                "no ready issues - check dependencies".to_string(),
            ));
        }

        let session = self.session_name();
        if self.sessions.has_session(&session).await? {
            return Err(FarmError::AlreadyRunning(session));
        }

        let agents = self.config.agents.min(ready).min(MAX_AGENTS);
        let farm_id = generate_farm_id();
        farm_meta::acquire_farm_lock(&self.base_dir, &farm_id)?;

        let mut meta = FarmMeta {
            farm_id: farm_id.clone(),
            epic_id: self.config.epic.clone(),
            agent_count: agents,
            tmux_session: session.clone(),
            witness_session: self.config.witness.then(|| self.witness_session_name()),
            witness_pid: None,
            started_at: Some(Utc::now()),
            agent_pids: Vec::new(),
            status: FarmStatus::Running,
        };

        tracing::info!(farm_id = %farm_id, agents, "spawning farm");
        let mut failed = 0usize;

        for index in 1..=agents {
            if interrupt.try_recv().is_ok() {
                tracing::warn!("interrupted - cleaning up");
                self.cleanup(&meta).await;
                return Err(FarmError::Interrupted);
            }

            let agent_name = format!("agent-{index}");
            match self.spawn_agent(&session, &agent_name, index).await {
                Ok(pid) => {
                    meta.agent_pids.push(pid);
                }
                Err(e) => {
                    failed += 1;
                    tracing::warn!(agent = %agent_name, error = %e, "spawn failed");
                }
            }

            if index >= CIRCUIT_BREAKER_MIN_ATTEMPTS && failed * 2 > index {
                tracing::error!("circuit breaker: more than half of spawns failed");
                self.cleanup(&meta).await;
                return Err(FarmError::CircuitBreaker);
            }

            // Last agent does not sleep.
            if index < agents {
                tokio::time::sleep(self.config.stagger).await;
            }
        }

        if self.config.witness {
            let witness = self.witness();
            match witness.start(&session).await {
                Ok(pid) => {
                    meta.witness_pid = Some(pid);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to spawn witness");
                }
            }
        }

        if let Err(e) = meta.save(&self.base_dir) {
            tracing::warn!(error = %e, "failed to save farm metadata");
        }
        farm_meta::release_farm_lock(&self.base_dir);

        Ok(meta)
    }

    async fn spawn_agent(
        &self,
        session: &str,
        agent_name: &str,
        index: usize,
    ) -> Result<i32, FarmError> {
        let command = spawn::worker_command(agent_name, session, &self.config.worker_command);

        let pane = if index == 1 {
            self.sessions
                .new_session(session, &self.base_dir, &command)
                .await?;
            format!("{session}:0")
        } else {
            self.sessions
                .split_window(session, &self.base_dir, &command)
                .await?;
            format!("{session}:0.{}", index - 1)
        };

        if !spawn::wait_for_worker(
            &self.sessions,
            &pane,
            &self.config.worker_binary,
            &self.config.tuning,
        )
        .await
        {
            return Err(FarmError::Session(SessionError::SpawnFailed(format!(
                "{agent_name} did not become ready within timeout"
            ))));
        }

        spawn::dismiss_permission_dialog(&self.sessions, &pane, &self.config.tuning).await?;
        spawn::send_nudge(
            &self.sessions,
            &pane,
            &agent_prompt(agent_name),
            &self.config.tuning,
        )
        .await?;

        let pid = self
            .sessions
            .pane_pid(&pane)
            .await?
            .unwrap_or(std::process::id() as i32);
        tracing::info!(agent = %agent_name, pane = %pane, pid, "agent ready");
        Ok(pid)
    }

    /// Tear down farm resources. Idempotent: tolerates missing sessions,
    /// dead PIDs, and absent metadata.
    pub async fn cleanup(&self, meta: &FarmMeta) {
        tracing::info!("cleaning up farm resources");

        if let Some(pid) = meta.witness_pid {
            if self.procs.is_running(pid) {
                self.procs.terminate(pid);
            }
        }

        if let Some(witness_session) = &meta.witness_session {
            if self.sessions.has_session(witness_session).await.unwrap_or(false) {
                let _ = self.sessions.kill_session(witness_session).await;
            }
        }

        if !meta.tmux_session.is_empty()
            && self.sessions.has_session(&meta.tmux_session).await.unwrap_or(false)
        {
            let _ = self.sessions.kill_session(&meta.tmux_session).await;
        }

        tokio::time::sleep(self.config.cleanup_grace).await;

        for pid in &meta.agent_pids {
            if self.procs.is_running(*pid) {
                self.procs.force_kill(*pid);
            }
        }

        farm_meta::release_farm_lock(&self.base_dir);
    }

    /// Stop the farm. Falls back to conventional session names when
    /// metadata is missing; a second stop is a no-op.
    pub async fn stop(&self, reason: &str) -> Result<StopReport, FarmError> {
        match FarmMeta::load(&self.base_dir) {
            Ok(mut meta) => {
                tracing::info!(farm_id = %meta.farm_id, reason, "stopping farm");
                self.cleanup(&meta).await;
                meta.status = FarmStatus::Stopped;
                if let Err(e) = meta.save(&self.base_dir) {
                    tracing::warn!(error = %e, "failed to update farm metadata");
                }
                Ok(StopReport {
                    farm_id: Some(meta.farm_id),
                    fallback: false,
                })
            }
            Err(FarmMetaError::NotFound(_)) => {
                tracing::info!("no farm metadata, cleaning up by session names");
                for name in [self.session_name(), self.witness_session_name()] {
                    if self.sessions.has_session(&name).await.unwrap_or(false) {
                        let _ = self.sessions.kill_session(&name).await;
                    }
                }
                farm_meta::remove_witness_pid(&self.base_dir);
                farm_meta::release_farm_lock(&self.base_dir);
                Ok(StopReport {
                    farm_id: None,
                    fallback: true,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Current farm health.
    pub async fn status(&self) -> FarmStatusReport {
        let meta = FarmMeta::load(&self.base_dir).ok();
        let session = meta
            .as_ref()
            .map(|m| m.tmux_session.clone())
            .unwrap_or_else(|| self.session_name());

        let session_alive = self.sessions.has_session(&session).await.unwrap_or(false);
        let witness_alive = meta
            .as_ref()
            .and_then(|m| m.witness_pid)
            .map(|pid| self.procs.is_running(pid))
            .unwrap_or(false);

        let (live, dead) = match &meta {
            Some(m) => {
                let live = m
                    .agent_pids
                    .iter()
                    .filter(|pid| self.procs.is_running(**pid))
                    .count();
                (live, m.agent_pids.len() - live)
            }
            None => (0, 0),
        };

        let queue = IssueQueue::new(&self.base_dir);
        FarmStatusReport {
            meta,
            session_alive,
            witness_alive,
            live_agents: live,
            dead_agents: dead,
            ready: queue.count_ready().unwrap_or(0),
            in_progress: queue.count_in_progress().unwrap_or(0),
        }
    }

    /// Reconcile after a disconnect: requeue orphaned issues, rebuild
    /// metadata for live sessions, and drop stale witness PID files.
    pub async fn resume(&self) -> Result<ResumeReport, FarmError> {
        let session = self.session_name();
        let witness_session = self.witness_session_name();
        let queue = IssueQueue::new(&self.base_dir);

        let mut report = ResumeReport {
            agent_session_alive: self.sessions.has_session(&session).await.unwrap_or(false),
            witness_session_alive: self
                .sessions
                .has_session(&witness_session)
                .await
                .unwrap_or(false),
            in_progress: queue.count_in_progress().unwrap_or(0),
            ..ResumeReport::default()
        };

        // Dead sessions with in-progress issues: requeue them.
        if !report.agent_session_alive && report.in_progress > 0 {
            report.requeued = queue.requeue_in_progress()?;
            tracing::info!(requeued = report.requeued, "requeued orphaned issues");
        }

        // Live session without metadata: reconstruct it.
        if report.agent_session_alive && FarmMeta::load(&self.base_dir).is_err() {
            let meta = FarmMeta {
                farm_id: generate_farm_id(),
                epic_id: None,
                agent_count: 0,
                tmux_session: session,
                witness_session: Some(witness_session),
                witness_pid: farm_meta::read_witness_pid(&self.base_dir),
                started_at: Some(Utc::now()),
                agent_pids: Vec::new(),
                status: FarmStatus::Running,
            };
            if let Err(e) = meta.save(&self.base_dir) {
                tracing::warn!(error = %e, "failed to recreate farm metadata");
            } else {
                report.meta_recreated = true;
            }
        }

        // Stale witness PID file: remove it.
        if let Some(pid) = farm_meta::read_witness_pid(&self.base_dir) {
            if !self.procs.is_running(pid) {
                farm_meta::remove_witness_pid(&self.base_dir);
                report.stale_pid_removed = true;
            }
        }

        Ok(report)
    }

    fn witness(&self) -> Witness<S, P> {
        Witness::new(
            self.sessions.clone(),
            self.procs.clone(),
            &self.base_dir,
            WitnessConfig {
                worker_command: self.config.worker_command.clone(),
                worker_binary: self.config.worker_binary.clone(),
                tuning: self.config.tuning.clone(),
                ..WitnessConfig::default()
            },
        )
    }
}

/// Nudge prompt for a farm agent.
fn agent_prompt(agent_name: &str) -> String {
    format!(
        "You are {agent_name} in the Agent Farm. Your task: claim the next ready issue \
         atomically with 'bd update <id> --status in_progress', implement it, close it \
         with 'bd update <id> --status closed' and commit. Repeat until 'bd ready' \
         returns no issues. Report completions via 'ao mail send --to mayor --body \
         \"Completed <issue-id>\"'. Start now."
    )
}

fn generate_farm_id() -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    let suffix: String = (0..8).map(|_| format!("{:x}", rng.random::<u8>() % 16)).collect();
    format!("farm-{suffix}")
}

fn project_name(base_dir: &Path) -> String {
    base_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "project".to_string())
}

#[cfg(test)]
#[path = "farm_tests.rs"]
mod tests;
