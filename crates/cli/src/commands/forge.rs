// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::context::Context;
use crate::output::print_json;
use anyhow::{bail, Context as _, Result};
use ao_core::knowledge::Scoring;
use ao_engine::Forge;
use chrono::Utc;
use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Args)]
pub struct ForgeArgs {
    #[command(subcommand)]
    command: ForgeCommand,
}

#[derive(Subcommand)]
enum ForgeCommand {
    /// Extract knowledge from one transcript
    Transcript {
        /// Transcript file path
        path: PathBuf,
        /// Skip writing candidates into the pool
        #[arg(long)]
        no_pool: bool,
    },
    /// Extract from every transcript matching a glob, with cross-session dedup
    Batch {
        /// Glob pattern (e.g. ~/.claude/projects/**/*.jsonl)
        pattern: String,
        #[arg(long)]
        no_pool: bool,
    },
}

pub async fn run(ctx: &Context, args: ForgeArgs) -> Result<()> {
    match args.command {
        ForgeCommand::Transcript { path, no_pool } => {
            if ctx.dry_run {
                println!("[dry-run] Would forge transcript {}", path.display());
                return Ok(());
            }
            let outcome = Forge::new().process_transcript(&path).await?;
            admit(ctx, &outcome.candidates, no_pool)?;
            if ctx.json() {
                print_json(&outcome.session)?;
            } else {
                println!("{}", outcome.session.summary);
                println!(
                    "Extracted {} candidates from {} lines",
                    outcome.candidates.len(),
                    outcome.session.lines
                );
            }
            Ok(())
        }
        ForgeCommand::Batch { pattern, no_pool } => {
            let mut paths: Vec<PathBuf> = glob::glob(&pattern)
                .context("invalid glob pattern")?
                .flatten()
                .filter(|p| p.is_file())
                .collect();
            paths.sort();
            if paths.is_empty() {
                bail!("no transcripts match {pattern:?}");
            }
            if ctx.dry_run {
                println!("[dry-run] Would forge {} transcripts", paths.len());
                return Ok(());
            }

            let batch = Forge::new().process_batch(&paths).await?;
            admit(ctx, &batch.candidates, no_pool)?;
            if ctx.json() {
                print_json(&serde_json::json!({
                    "files": batch.files,
                    "candidates": batch.candidates.len(),
                    "duplicates": batch.duplicates,
                }))?;
            } else {
                println!(
                    "Forged {} files: {} candidates, {} duplicates removed",
                    batch.files,
                    batch.candidates.len(),
                    batch.duplicates
                );
            }
            Ok(())
        }
    }
}

fn admit(ctx: &Context, candidates: &[ao_core::Candidate], no_pool: bool) -> Result<()> {
    if no_pool {
        return Ok(());
    }
    let pool = ao_storage::Pool::new(&ctx.base_dir);
    let now = Utc::now();
    for candidate in candidates {
        pool.add(candidate.clone(), Scoring::default(), now)?;
    }
    Ok(())
}
