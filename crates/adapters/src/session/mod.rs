// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal-multiplexer session adapter.

mod tmux;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use tmux::TmuxAdapter;

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeSessionAdapter;

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("session not found: {0}")]
    NotFound(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
}

/// Abstraction over a terminal multiplexer.
///
/// Targets are either session names or `session:pane` pane ids, passed
/// through verbatim.
#[async_trait]
pub trait SessionAdapter: Clone + Send + Sync + 'static {
    /// Create a detached session running `command` in `cwd`.
    async fn new_session(
        &self,
        name: &str,
        cwd: &Path,
        command: &str,
    ) -> Result<(), SessionError>;

    /// Split a window of an existing session, running `command` in the new
    /// pane, then re-tile the layout.
    async fn split_window(
        &self,
        session: &str,
        cwd: &Path,
        command: &str,
    ) -> Result<(), SessionError>;

    /// True when the named session exists.
    async fn has_session(&self, name: &str) -> Result<bool, SessionError>;

    /// Kill a session. Killing a dead session is not an error.
    async fn kill_session(&self, name: &str) -> Result<(), SessionError>;

    /// Send a named key (e.g. `Enter`, `Escape`) to a target pane.
    async fn send_key(&self, target: &str, key: &str) -> Result<(), SessionError>;

    /// Send literal text to a target pane, with no key-name interpretation.
    ///
    /// This never submits: pressing Enter is a separate [`Self::send_key`]
    /// call by contract, so prompt text is typed, not executed piecemeal.
    async fn send_literal(&self, target: &str, text: &str) -> Result<(), SessionError>;

    /// The current foreground command of a target pane.
    async fn pane_command(&self, target: &str) -> Result<String, SessionError>;

    /// PID of a target pane's process, when the pane exists.
    async fn pane_pid(&self, target: &str) -> Result<Option<i32>, SessionError>;

    /// Capture the last `lines` lines of a target pane.
    async fn capture_output(&self, target: &str, lines: u32) -> Result<String, SessionError>;
}
