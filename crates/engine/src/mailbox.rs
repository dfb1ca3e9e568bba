// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mailbox: the typed inter-agent message log at
//! `.agents/mail/messages.jsonl`.

use ao_core::{MailParser, Message, MessageId, MessageType};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailboxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Jsonl(#[from] ao_storage::JsonlError),
}

/// Inbox filters. With no explicit recipient, messages addressed to the
/// mayor, to all, or to nobody in particular are shown.
#[derive(Debug, Clone, Default)]
pub struct InboxFilter {
    pub since: Option<Duration>,
    pub from: Option<String>,
    pub unread_only: bool,
    pub to: Option<String>,
}

/// The on-disk mailbox.
#[derive(Debug, Clone)]
pub struct Mailbox {
    path: PathBuf,
    parser: MailParser,
}

impl Mailbox {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            path: base_dir
                .join(ao_storage::AGENTS_DIR)
                .join("mail")
                .join("messages.jsonl"),
            parser: MailParser::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Compose, classify, and append a message. The sender defaults to
    /// `AO_AGENT_NAME`, then to the mayor.
    pub fn send(
        &self,
        from: Option<&str>,
        to: &str,
        subject: &str,
        body: &str,
        explicit_type: Option<MessageType>,
        now: DateTime<Utc>,
    ) -> Result<Message, MailboxError> {
        let sender = from
            .map(String::from)
            .or_else(crate::env::agent_name)
            .unwrap_or_else(|| "mayor".to_string());

        let message = self.parser.compose(
            MessageId::new(uuid::Uuid::new_v4().to_string()),
            sender,
            to,
            subject,
            body,
            explicit_type,
            now,
        );

        self.ensure_private_dir()?;
        ao_storage::append_record(&self.path, &message)?;
        restrict_file(&self.path)?;
        Ok(message)
    }

    /// Load all messages, filtered.
    pub fn inbox(&self, filter: &InboxFilter, now: DateTime<Utc>) -> Result<Vec<Message>, MailboxError> {
        let messages: Vec<Message> = ao_storage::read_records(&self.path)?;
        let cutoff = filter
            .since
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .map(|d| now - d);

        Ok(messages
            .into_iter()
            .filter(|m| cutoff.map_or(true, |c| m.timestamp >= c))
            .filter(|m| {
                filter
                    .from
                    .as_deref()
                    .map_or(true, |sender| m.from == sender)
            })
            .filter(|m| !filter.unread_only || !m.read)
            .filter(|m| match filter.to.as_deref() {
                Some(recipient) => m.to == recipient,
                None => m.to == "mayor" || m.to == "all" || m.to.is_empty(),
            })
            .collect())
    }

    /// Mark messages read by id. Rewrites the file atomically and returns
    /// how many messages changed.
    pub fn mark_read(&self, ids: &[&str]) -> Result<usize, MailboxError> {
        let mut messages: Vec<Message> = ao_storage::read_records(&self.path)?;
        let mut changed = 0;
        for message in messages.iter_mut() {
            if !message.read && ids.contains(&message.id.as_str()) {
                message.read = true;
                changed += 1;
            }
        }
        if changed > 0 {
            ao_storage::jsonl::rewrite_records(&self.path, &messages)?;
            restrict_file(&self.path)?;
        }
        Ok(changed)
    }

    fn ensure_private_dir(&self) -> std::io::Result<()> {
        let Some(dir) = self.path.parent() else {
            return Ok(());
        };
        if dir.is_dir() {
            return Ok(());
        }
        std::fs::create_dir_all(dir)?;
        restrict_dir(dir)
    }
}

#[cfg(unix)]
fn restrict_dir(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
}

#[cfg(unix)]
fn restrict_file(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(not(unix))]
fn restrict_file(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
#[path = "mailbox_tests.rs"]
mod tests;
