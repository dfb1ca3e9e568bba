// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker spawn plumbing shared by the farm supervisor and the witness:
//! readiness probing, permission-dialog dismissal, and nudge delivery.

use ao_adapters::{SessionAdapter, SessionError};
use std::time::Duration;

/// Sentinel a worker may print to declare readiness explicitly. The
/// process-name heuristic remains as the fallback.
pub const READY_SENTINEL: &str = "AO_WORKER_READY";

/// Timing knobs for spawn. Tests zero these out.
#[derive(Debug, Clone)]
pub struct SpawnTuning {
    pub readiness_timeout: Duration,
    pub readiness_poll: Duration,
    pub dialog_delay: Duration,
    pub post_dialog_delay: Duration,
    pub submit_delay: Duration,
}

impl Default for SpawnTuning {
    fn default() -> Self {
        Self {
            readiness_timeout: Duration::from_secs(30),
            readiness_poll: Duration::from_millis(500),
            dialog_delay: Duration::from_secs(1),
            post_dialog_delay: Duration::from_secs(2),
            submit_delay: Duration::from_millis(100),
        }
    }
}

impl SpawnTuning {
    /// All-zero tuning for tests.
    pub fn immediate() -> Self {
        Self {
            readiness_timeout: Duration::ZERO,
            readiness_poll: Duration::ZERO,
            dialog_delay: Duration::ZERO,
            post_dialog_delay: Duration::ZERO,
            submit_delay: Duration::ZERO,
        }
    }
}

/// Build the pane startup command.
///
/// `exec env ...` replaces the shell so the pane's current-process name is
/// the worker itself, which the readiness probe depends on.
pub fn worker_command(agent_name: &str, farm_session: &str, worker_command: &str) -> String {
    format!(
        "exec env AO_AGENT_NAME={agent_name} AO_FARM_SESSION={farm_session} {worker_command}"
    )
}

/// Process-name readiness heuristic: the pane command contains the worker
/// binary name, contains "node", or looks like a bare version string.
pub fn looks_ready(pane_command: &str, worker_binary: &str) -> bool {
    let cmd = pane_command.trim();
    if cmd.is_empty() {
        return false;
    }
    if cmd.contains(worker_binary) || cmd.contains("node") {
        return true;
    }
    cmd.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) && cmd.contains('.')
}

/// Poll a pane until the worker is ready or the timeout lapses.
///
/// The explicit sentinel in the pane output wins; the process-name
/// heuristic is the fallback.
pub async fn wait_for_worker<S: SessionAdapter>(
    sessions: &S,
    pane: &str,
    worker_binary: &str,
    tuning: &SpawnTuning,
) -> bool {
    let poll = tuning.readiness_poll.max(Duration::from_millis(1));
    let attempts = (tuning.readiness_timeout.as_millis() / poll.as_millis()).max(1) as u64;

    for attempt in 0..attempts {
        if attempt > 0 {
            tokio::time::sleep(tuning.readiness_poll).await;
        }

        if let Ok(output) = sessions.capture_output(pane, 20).await {
            if output.contains(READY_SENTINEL) {
                return true;
            }
        }
        if let Ok(cmd) = sessions.pane_command(pane).await {
            if looks_ready(&cmd, worker_binary) {
                return true;
            }
        }
    }
    false
}

/// Dismiss the worker's one-time permission dialog by pressing Enter
/// after a short render delay.
pub async fn dismiss_permission_dialog<S: SessionAdapter>(
    sessions: &S,
    pane: &str,
    tuning: &SpawnTuning,
) -> Result<(), SessionError> {
    tokio::time::sleep(tuning.dialog_delay).await;
    sessions.send_key(pane, "Enter").await?;
    tokio::time::sleep(tuning.post_dialog_delay).await;
    Ok(())
}

/// Deliver a nudge prompt: Escape to clear any partial buffer, the prompt
/// body as literal text, then Enter as a separate send.
///
/// The literal/Enter split is required: collapsing them makes the
/// multiplexer treat the prompt as raw input instead of submitting it.
pub async fn send_nudge<S: SessionAdapter>(
    sessions: &S,
    pane: &str,
    prompt: &str,
    tuning: &SpawnTuning,
) -> Result<(), SessionError> {
    sessions.send_key(pane, "Escape").await?;
    tokio::time::sleep(tuning.submit_delay).await;

    sessions.send_literal(pane, prompt).await?;
    tokio::time::sleep(tuning.submit_delay).await;

    sessions.send_key(pane, "Enter").await
}

/// True when a binary is resolvable on PATH.
pub fn binary_on_path(name: &str) -> bool {
    let Some(path) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path).any(|dir| dir.join(name).is_file())
}

#[cfg(test)]
#[path = "spawn_tests.rs"]
mod tests;
