// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ao-adapters: process-boundary adapters for the farm supervisor.
//!
//! The supervisor talks to the outside world only through the traits in
//! this crate: a terminal-multiplexer session adapter, PID-level process
//! control, and a disk-space probe.

pub mod disk;
pub mod process;
pub mod session;

pub use disk::available_disk_space;
pub use process::{NixProcessControl, ProcessControl};
pub use session::{SessionAdapter, SessionError, TmuxAdapter};

#[cfg(any(test, feature = "test-support"))]
pub use process::FakeProcessControl;
#[cfg(any(test, feature = "test-support"))]
pub use session::FakeSessionAdapter;
