// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scriptable in-memory session adapter for tests.

use super::{SessionAdapter, SessionError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Default)]
struct FakeState {
    /// session name -> pane count
    sessions: BTreeMap<String, usize>,
    killed: Vec<String>,
    sent: Vec<(String, String)>,
    pane_command: String,
    capture: String,
    /// 1-based spawn attempts scripted to fail
    fail_attempts: std::collections::BTreeSet<usize>,
    spawn_attempts: usize,
    next_pid: i32,
}

/// In-memory [`SessionAdapter`] with scriptable behavior.
#[derive(Clone, Default)]
pub struct FakeSessionAdapter {
    state: Arc<Mutex<FakeState>>,
}

impl FakeSessionAdapter {
    pub fn new() -> Self {
        let adapter = Self::default();
        {
            let mut state = adapter.state.lock();
            state.pane_command = "node".to_string();
            state.next_pid = 1000;
        }
        adapter
    }

    /// Script what `pane_command` reports (readiness probe input).
    pub fn set_pane_command(&self, command: &str) {
        self.state.lock().pane_command = command.to_string();
    }

    /// Script what `capture_output` returns.
    pub fn set_capture(&self, text: &str) {
        self.state.lock().capture = text.to_string();
    }

    /// Make the next `n` spawn attempts fail.
    pub fn fail_next_spawns(&self, n: usize) {
        let mut state = self.state.lock();
        let from = state.spawn_attempts;
        state.fail_attempts.extend(from + 1..=from + n);
    }

    /// Make specific 1-based spawn attempts fail.
    pub fn fail_spawn_attempts(&self, attempts: &[usize]) {
        self.state.lock().fail_attempts.extend(attempts.iter().copied());
    }

    /// Names of live sessions.
    pub fn sessions(&self) -> Vec<String> {
        self.state.lock().sessions.keys().cloned().collect()
    }

    /// Pane count of a live session.
    pub fn pane_count(&self, name: &str) -> usize {
        self.state.lock().sessions.get(name).copied().unwrap_or(0)
    }

    /// Sessions that were explicitly killed.
    pub fn killed(&self) -> Vec<String> {
        self.state.lock().killed.clone()
    }

    /// Every key/literal send, in order: `(target, payload)` where the
    /// payload is `key:<name>` or `literal:<text>`.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.state.lock().sent.clone()
    }

    /// Pre-seed a live session (for resume/stop tests).
    pub fn seed_session(&self, name: &str, panes: usize) {
        self.state.lock().sessions.insert(name.to_string(), panes);
    }

    fn take_spawn_failure(&self) -> bool {
        let mut state = self.state.lock();
        state.spawn_attempts += 1;
        state.fail_attempts.contains(&state.spawn_attempts)
    }
}

#[async_trait]
impl SessionAdapter for FakeSessionAdapter {
    async fn new_session(
        &self,
        name: &str,
        _cwd: &Path,
        _command: &str,
    ) -> Result<(), SessionError> {
        if self.take_spawn_failure() {
            return Err(SessionError::SpawnFailed("scripted failure".to_string()));
        }
        self.state.lock().sessions.insert(name.to_string(), 1);
        Ok(())
    }

    async fn split_window(
        &self,
        session: &str,
        _cwd: &Path,
        _command: &str,
    ) -> Result<(), SessionError> {
        if self.take_spawn_failure() {
            return Err(SessionError::SpawnFailed("scripted failure".to_string()));
        }
        let mut state = self.state.lock();
        match state.sessions.get_mut(session) {
            Some(panes) => {
                *panes += 1;
                Ok(())
            }
            None => Err(SessionError::NotFound(session.to_string())),
        }
    }

    async fn has_session(&self, name: &str) -> Result<bool, SessionError> {
        Ok(self.state.lock().sessions.contains_key(name))
    }

    async fn kill_session(&self, name: &str) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        state.sessions.remove(name);
        state.killed.push(name.to_string());
        Ok(())
    }

    async fn send_key(&self, target: &str, key: &str) -> Result<(), SessionError> {
        self.state
            .lock()
            .sent
            .push((target.to_string(), format!("key:{key}")));
        Ok(())
    }

    async fn send_literal(&self, target: &str, text: &str) -> Result<(), SessionError> {
        self.state
            .lock()
            .sent
            .push((target.to_string(), format!("literal:{text}")));
        Ok(())
    }

    async fn pane_command(&self, _target: &str) -> Result<String, SessionError> {
        Ok(self.state.lock().pane_command.clone())
    }

    async fn pane_pid(&self, _target: &str) -> Result<Option<i32>, SessionError> {
        let mut state = self.state.lock();
        state.next_pid += 1;
        Ok(Some(state.next_pid))
    }

    async fn capture_output(&self, _target: &str, _lines: u32) -> Result<String, SessionError> {
        Ok(self.state.lock().capture.clone())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
