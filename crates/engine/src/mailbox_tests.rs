// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ao_core::ParsedPayload;
use chrono::TimeZone;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 25, 9, 0, 0).unwrap()
}

#[test]
fn send_classifies_and_appends() {
    let dir = tempfile::tempdir().unwrap();
    let mailbox = Mailbox::new(dir.path());

    let sent = mailbox
        .send(
            Some("agent-1"),
            "mayor",
            "[gt-12] PROGRESS",
            "Bead: gt-12\nStep: tests\n",
            None,
            now(),
        )
        .unwrap();
    assert_eq!(sent.kind, MessageType::Progress);
    assert!(matches!(sent.parsed, ParsedPayload::Progress { .. }));

    let inbox = mailbox.inbox(&InboxFilter::default(), now()).unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].from, "agent-1");
}

#[cfg(unix)]
#[test]
fn mailbox_files_are_private() {
    use std::os::unix::fs::PermissionsExt;
    let dir = tempfile::tempdir().unwrap();
    let mailbox = Mailbox::new(dir.path());
    mailbox
        .send(Some("a"), "mayor", "", "hello", None, now())
        .unwrap();

    let file_mode = std::fs::metadata(mailbox.path())
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(file_mode & 0o777, 0o600);
    let dir_mode = std::fs::metadata(mailbox.path().parent().unwrap())
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(dir_mode & 0o777, 0o700);
}

#[test]
fn inbox_defaults_to_mayor_and_all() {
    let dir = tempfile::tempdir().unwrap();
    let mailbox = Mailbox::new(dir.path());
    mailbox.send(Some("a"), "mayor", "", "to mayor", None, now()).unwrap();
    mailbox.send(Some("a"), "all", "", "to all", None, now()).unwrap();
    mailbox.send(Some("a"), "agent-2", "", "direct", None, now()).unwrap();

    let inbox = mailbox.inbox(&InboxFilter::default(), now()).unwrap();
    assert_eq!(inbox.len(), 2);

    let direct = mailbox
        .inbox(
            &InboxFilter {
                to: Some("agent-2".to_string()),
                ..InboxFilter::default()
            },
            now(),
        )
        .unwrap();
    assert_eq!(direct.len(), 1);
}

#[test]
fn inbox_since_filters_old_messages() {
    let dir = tempfile::tempdir().unwrap();
    let mailbox = Mailbox::new(dir.path());
    let old = now() - chrono::Duration::hours(3);
    mailbox.send(Some("a"), "mayor", "", "old", None, old).unwrap();
    mailbox.send(Some("a"), "mayor", "", "recent", None, now()).unwrap();

    let inbox = mailbox
        .inbox(
            &InboxFilter {
                since: Some(Duration::from_secs(3600)),
                ..InboxFilter::default()
            },
            now(),
        )
        .unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].body, "recent");
}

#[test]
fn inbox_filters_by_sender_and_unread() {
    let dir = tempfile::tempdir().unwrap();
    let mailbox = Mailbox::new(dir.path());
    let a = mailbox.send(Some("witness"), "mayor", "", "one", None, now()).unwrap();
    mailbox.send(Some("agent-1"), "mayor", "", "two", None, now()).unwrap();

    let from_witness = mailbox
        .inbox(
            &InboxFilter {
                from: Some("witness".to_string()),
                ..InboxFilter::default()
            },
            now(),
        )
        .unwrap();
    assert_eq!(from_witness.len(), 1);

    mailbox.mark_read(&[a.id.as_str()]).unwrap();
    let unread = mailbox
        .inbox(
            &InboxFilter {
                unread_only: true,
                ..InboxFilter::default()
            },
            now(),
        )
        .unwrap();
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0].body, "two");
}

#[test]
fn mark_read_is_atomic_and_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let mailbox = Mailbox::new(dir.path());
    let a = mailbox.send(Some("x"), "mayor", "", "one", None, now()).unwrap();
    let b = mailbox.send(Some("x"), "mayor", "", "two", None, now()).unwrap();

    assert_eq!(mailbox.mark_read(&[a.id.as_str()]).unwrap(), 1);
    assert_eq!(mailbox.mark_read(&[a.id.as_str()]).unwrap(), 0);

    let inbox = mailbox.inbox(&InboxFilter::default(), now()).unwrap();
    let read_flags: Vec<bool> = inbox.iter().map(|m| m.read).collect();
    assert_eq!(read_flags, vec![true, false]);
    assert!(inbox.iter().any(|m| m.id == b.id));
}

#[test]
fn empty_mailbox_reads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let mailbox = Mailbox::new(dir.path());
    assert!(mailbox.inbox(&InboxFilter::default(), now()).unwrap().is_empty());
    assert_eq!(mailbox.mark_read(&["nothing"]).unwrap(), 0);
}

#[test]
fn explicit_type_is_respected() {
    let dir = tempfile::tempdir().unwrap();
    let mailbox = Mailbox::new(dir.path());
    let sent = mailbox
        .send(
            Some("witness"),
            "mayor",
            "",
            "FARM COMPLETE: 9 issues in 80 min",
            Some(MessageType::FarmComplete),
            now(),
        )
        .unwrap();
    assert_eq!(sent.kind, MessageType::FarmComplete);
}
