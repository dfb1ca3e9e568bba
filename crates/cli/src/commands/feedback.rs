// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::context::Context;
use crate::output::print_json;
use anyhow::{bail, Result};
use ao_core::{CitationType, SessionId};
use ao_engine::{FeedbackLoop, OutcomeRewardSource};
use chrono::Utc;
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct FeedbackLoopArgs {
    /// Session id to process
    #[arg(long)]
    session: Option<String>,

    /// Explicit reward in [0, 1]; omitted = derive from transcript
    #[arg(long)]
    reward: Option<f64>,

    /// Transcript for reward derivation
    #[arg(long)]
    transcript: Option<PathBuf>,

    /// EMA learning rate
    #[arg(long, default_value_t = ao_core::knowledge::DEFAULT_ALPHA)]
    alpha: f64,

    /// Citation type filter: retrieved, applied, bypass, or all
    #[arg(long, default_value = "retrieved")]
    citation_type: String,

    /// Process every unprocessed session from the last N days
    #[arg(long)]
    batch: bool,

    /// Days of history for batch mode
    #[arg(long, default_value_t = 7)]
    days: i64,
}

pub fn run(ctx: &Context, args: FeedbackLoopArgs) -> Result<()> {
    let now = Utc::now();
    let feedback = FeedbackLoop::new(&ctx.base_dir).with_alpha(args.alpha);
    let source = OutcomeRewardSource;

    if args.batch {
        if ctx.dry_run {
            println!("[dry-run] Would process unprocessed sessions from the last {} days", args.days);
            return Ok(());
        }
        let summaries = feedback.run_batch(args.days, &source, now)?;
        if ctx.json() {
            print_json(&summaries)?;
        } else {
            println!("Processed {} sessions", summaries.len());
            for s in &summaries {
                println!("  {}: {} updated (reward {:.2})", s.session_id, s.updated, s.reward);
            }
        }
        return Ok(());
    }

    let Some(session) = args.session else {
        bail!("--session is required (or use --batch)");
    };
    let session_id = SessionId::canonical(&session, now);
    let citation_type = match args.citation_type.as_str() {
        "all" => None,
        other => match CitationType::parse(other) {
            Some(t) => Some(t),
            None => bail!("unknown citation type {other:?}"),
        },
    };

    if ctx.dry_run {
        println!("[dry-run] Would close the feedback loop for {session_id}");
        return Ok(());
    }

    // Without an explicit reward the transcript drives it; fall back to
    // the most recent worker transcript when none is named.
    let transcript = args.transcript.or_else(|| {
        if args.reward.is_none() {
            ao_engine::feedback::find_latest_transcript()
        } else {
            None
        }
    });

    let summary = feedback.run(
        session_id.as_str(),
        args.reward,
        citation_type,
        transcript.as_deref(),
        &source,
        now,
    )?;

    if ctx.json() {
        print_json(&summary)?;
    } else if summary.citations == 0 {
        println!("No citations found for session {}", summary.session_id);
    } else {
        println!("Feedback Loop Complete");
        println!("Session:   {}", summary.session_id);
        println!("Reward:    {:.2}", summary.reward);
        println!("Citations: {} ({} unique)", summary.citations, summary.unique);
        println!("Updated:   {}", summary.updated);
        if summary.failed > 0 {
            println!("Failed:    {}", summary.failed);
        }
    }
    Ok(())
}
