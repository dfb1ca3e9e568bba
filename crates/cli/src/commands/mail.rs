// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::context::Context;
use crate::output::{format_age, print_json, truncate};
use anyhow::{bail, Result};
use ao_core::MessageType;
use ao_engine::{InboxFilter, Mailbox};
use chrono::Utc;
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct MailArgs {
    #[command(subcommand)]
    command: MailCommand,
}

#[derive(Subcommand)]
enum MailCommand {
    /// Send a message to another agent or the mayor
    Send {
        #[arg(long)]
        to: String,
        #[arg(long, default_value = "")]
        subject: String,
        #[arg(long)]
        body: String,
        /// Explicit message type (otherwise classified from the subject)
        #[arg(long = "type")]
        kind: Option<String>,
        /// Sender override (defaults to AO_AGENT_NAME, then mayor)
        #[arg(long)]
        from: Option<String>,
    },
}

#[derive(Args)]
pub struct InboxArgs {
    /// Show messages from the last duration (e.g. 5m, 1h)
    #[arg(long)]
    since: Option<String>,
    /// Filter by sender
    #[arg(long)]
    from: Option<String>,
    /// Only unread messages
    #[arg(long)]
    unread: bool,
    /// Recipient filter (defaults to mayor/all)
    #[arg(long)]
    to: Option<String>,
    /// Mark listed messages as read
    #[arg(long = "mark-read")]
    mark_read: bool,
}

pub fn run_send(ctx: &Context, args: MailArgs) -> Result<()> {
    let MailCommand::Send {
        to,
        subject,
        body,
        kind,
        from,
    } = args.command;

    let explicit = match kind.as_deref() {
        None => None,
        Some(raw) => match MessageType::parse(raw) {
            Some(t) => Some(t),
            None => bail!("unknown message type {raw:?}"),
        },
    };

    if ctx.dry_run {
        println!("[dry-run] Would send mail to {to}");
        return Ok(());
    }

    let mailbox = Mailbox::new(&ctx.base_dir);
    let message = mailbox.send(from.as_deref(), &to, &subject, &body, explicit, Utc::now())?;
    println!("Sent {} to {}", message.id.short(8), message.to);
    Ok(())
}

pub fn run_inbox(ctx: &Context, args: InboxArgs) -> Result<()> {
    let since = args.since.as_deref().map(parse_duration).transpose()?;
    let filter = InboxFilter {
        since,
        from: args.from,
        unread_only: args.unread,
        to: args.to,
    };

    let now = Utc::now();
    let mailbox = Mailbox::new(&ctx.base_dir);
    let messages = mailbox.inbox(&filter, now)?;

    if ctx.json() {
        print_json(&messages)?;
    } else if messages.is_empty() {
        println!("Inbox empty");
    } else {
        for message in &messages {
            let unread_mark = if message.read { " " } else { "*" };
            println!(
                "{}{:<6} {:<10} {:<14} {}",
                unread_mark,
                format_age(message.timestamp, now),
                message.from,
                message.kind.as_str(),
                truncate(&message.body, 60)
            );
        }
    }

    if args.mark_read && !ctx.dry_run {
        let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
        let marked = mailbox.mark_read(&ids)?;
        if marked > 0 {
            println!("Marked {marked} read");
        }
    }
    Ok(())
}

/// Parse durations like "5m", "1h", "30s".
fn parse_duration(s: &str) -> Result<std::time::Duration> {
    let s = s.trim();
    let (value, unit) = s.split_at(s.len().saturating_sub(1));
    let n: u64 = value
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid duration {s:?}"))?;
    let secs = match unit {
        "h" => n * 3600,
        "m" => n * 60,
        "s" => n,
        _ => bail!("invalid duration {s:?} (use h/m/s)"),
    };
    Ok(std::time::Duration::from_secs(secs))
}
