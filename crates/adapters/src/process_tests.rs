// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn own_pid_is_running() {
    let control = NixProcessControl::new();
    assert!(control.is_running(std::process::id() as i32));
}

#[test]
fn bogus_pid_is_not_running() {
    let control = NixProcessControl::new();
    // PID max on Linux defaults to 4194304; this is far above it.
    assert!(!control.is_running(99_999_999));
}

#[test]
fn fake_tracks_signals() {
    let fake = FakeProcessControl::new();
    fake.mark_live(42);
    assert!(fake.is_running(42));

    fake.terminate(42);
    assert!(!fake.is_running(42));
    assert_eq!(fake.terminated(), vec![42]);

    fake.force_kill(43);
    assert_eq!(fake.killed(), vec![43]);
}
