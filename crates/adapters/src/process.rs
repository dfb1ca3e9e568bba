// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PID-level process control for farm cleanup.

/// Liveness checks and signal delivery for worker PIDs.
pub trait ProcessControl: Clone + Send + Sync + 'static {
    /// True when the PID refers to a live process.
    fn is_running(&self, pid: i32) -> bool;

    /// Deliver SIGTERM. Missing processes are ignored.
    fn terminate(&self, pid: i32);

    /// Deliver SIGKILL. Missing processes are ignored.
    fn force_kill(&self, pid: i32);
}

/// Real process control via signal delivery.
#[derive(Clone, Default)]
pub struct NixProcessControl;

impl NixProcessControl {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessControl for NixProcessControl {
    fn is_running(&self, pid: i32) -> bool {
        // Signal 0 probes liveness without delivering anything.
        nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), None).is_ok()
    }

    fn terminate(&self, pid: i32) {
        let _ = nix::sys::signal::kill(
            nix::unistd::Pid::from_raw(pid),
            nix::sys::signal::Signal::SIGTERM,
        );
    }

    fn force_kill(&self, pid: i32) {
        let _ = nix::sys::signal::kill(
            nix::unistd::Pid::from_raw(pid),
            nix::sys::signal::Signal::SIGKILL,
        );
    }
}

/// Scriptable process control for tests.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone, Default)]
pub struct FakeProcessControl {
    state: std::sync::Arc<parking_lot::Mutex<FakeProcState>>,
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
struct FakeProcState {
    live: std::collections::BTreeSet<i32>,
    terminated: Vec<i32>,
    killed: Vec<i32>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeProcessControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_live(&self, pid: i32) {
        self.state.lock().live.insert(pid);
    }

    pub fn terminated(&self) -> Vec<i32> {
        self.state.lock().terminated.clone()
    }

    pub fn killed(&self) -> Vec<i32> {
        self.state.lock().killed.clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl ProcessControl for FakeProcessControl {
    fn is_running(&self, pid: i32) -> bool {
        self.state.lock().live.contains(&pid)
    }

    fn terminate(&self, pid: i32) {
        let mut state = self.state.lock();
        state.terminated.push(pid);
        state.live.remove(&pid);
    }

    fn force_kill(&self, pid: i32) {
        let mut state = self.state.lock();
        state.killed.push(pid);
        state.live.remove(&pid);
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
