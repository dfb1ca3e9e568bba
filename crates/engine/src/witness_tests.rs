// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ao_adapters::{FakeProcessControl, FakeSessionAdapter};

fn witness(
    dir: &tempfile::TempDir,
) -> (
    Witness<FakeSessionAdapter, FakeProcessControl>,
    FakeSessionAdapter,
    FakeProcessControl,
) {
    let sessions = FakeSessionAdapter::new();
    let procs = FakeProcessControl::new();
    let config = WitnessConfig {
        worker_command: "sh".to_string(),
        worker_binary: "sh".to_string(),
        tuning: SpawnTuning::immediate(),
        ..WitnessConfig::default()
    };
    let w = Witness::new(sessions.clone(), procs.clone(), dir.path(), config);
    (w, sessions, procs)
}

#[tokio::test]
async fn start_spawns_session_and_writes_pid() {
    let dir = tempfile::tempdir().unwrap();
    let (w, sessions, _) = witness(&dir);

    let pid = w.start("ao-farm-proj").await.unwrap();
    assert!(sessions.sessions().contains(&w.session_name()));
    assert_eq!(farm_meta::read_witness_pid(dir.path()), Some(pid));

    // The witness nudge names the farm session it watches.
    let sent = sessions.sent();
    let literal = sent.iter().find(|(_, p)| p.starts_with("literal:")).unwrap();
    assert!(literal.1.contains("ao-farm-proj"));
    assert!(literal.1.contains("FARM COMPLETE"));
    assert!(literal.1.contains(".witness.heartbeat"));
}

#[tokio::test]
async fn start_refuses_when_already_running() {
    let dir = tempfile::tempdir().unwrap();
    let (w, sessions, _) = witness(&dir);
    sessions.seed_session(&w.session_name(), 1);

    assert!(matches!(
        w.start("ao-farm-proj").await,
        Err(FarmError::AlreadyRunning(_))
    ));
}

#[tokio::test]
async fn stop_terminates_and_removes_pid_file() {
    let dir = tempfile::tempdir().unwrap();
    let (w, sessions, procs) = witness(&dir);
    let pid = w.start("ao-farm-proj").await.unwrap();
    procs.mark_live(pid);

    assert!(w.stop().await);
    assert_eq!(procs.terminated(), vec![pid]);
    assert!(sessions.killed().contains(&w.session_name()));
    assert_eq!(farm_meta::read_witness_pid(dir.path()), None);

    // Second stop is a clean no-op.
    assert!(!w.stop().await);
}

#[tokio::test]
async fn status_reports_heartbeat_age() {
    let dir = tempfile::tempdir().unwrap();
    let (w, _, procs) = witness(&dir);
    let now = Utc::now();
    farm_meta::write_witness_pid(dir.path(), 4242).unwrap();
    procs.mark_live(4242);
    std::fs::write(
        dir.path().join(".witness.heartbeat"),
        format!("{}\n", now.timestamp() - 30),
    )
    .unwrap();

    let status = w.status(now).await;
    assert_eq!(status.pid, Some(4242));
    assert!(status.running);
    assert_eq!(status.heartbeat_age_secs, Some(30));
}

#[test]
fn prompt_includes_intervals() {
    let prompt = build_witness_prompt("ao-farm-x", 60, 300);
    assert!(prompt.contains("Every 60s"));
    assert!(prompt.contains("Every 300s"));
}
