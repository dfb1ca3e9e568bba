// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::context::Context;
use crate::output::{format_age, print_json, truncate};
use anyhow::{bail, Result};
use ao_core::knowledge::Tier;
use ao_storage::{ListOptions, Pool, PoolStatus};
use chrono::Utc;
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct PoolArgs {
    #[command(subcommand)]
    command: PoolCommand,
}

#[derive(Subcommand)]
enum PoolCommand {
    /// List pool entries
    List {
        #[arg(long)]
        tier: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show one entry
    Show { id: String },
    /// Stage a candidate that meets the minimum tier
    Stage {
        id: String,
        #[arg(long = "min-tier", default_value = "bronze")]
        min_tier: String,
    },
    /// Promote a candidate to its artifact tier
    Promote { id: String },
    /// Reject a candidate (terminal)
    Reject {
        id: String,
        #[arg(long)]
        reason: String,
        #[arg(long, default_value = "reviewer")]
        reviewer: String,
    },
    /// Approve a candidate (one review per candidate)
    Approve {
        id: String,
        #[arg(long, default_value = "")]
        note: String,
        #[arg(long, default_value = "reviewer")]
        reviewer: String,
    },
    /// Promote silver candidates older than a threshold
    AutoPromote {
        /// Minimum age, e.g. 24h or 90m (at least 1h)
        #[arg(long)]
        threshold: String,
        #[arg(long, default_value = "auto")]
        reviewer: String,
    },
}

pub fn run(ctx: &Context, args: PoolArgs) -> Result<()> {
    let pool = Pool::new(&ctx.base_dir);
    let now = Utc::now();

    match args.command {
        PoolCommand::List {
            tier,
            status,
            limit,
        } => {
            let opts = ListOptions {
                tier: tier.as_deref().map(parse_tier).transpose()?,
                status: status.as_deref().map(parse_status).transpose()?,
                limit: Some(limit),
            };
            let entries = pool.list(&opts)?;
            if ctx.json() {
                return print_json(&entries);
            }
            if entries.is_empty() {
                println!("Pool is empty");
                return Ok(());
            }
            println!("{:<20} {:<8} {:<10} {:<6} CONTENT", "ID", "TIER", "STATUS", "AGE");
            for entry in entries {
                println!(
                    "{:<20} {:<8} {:<10} {:<6} {}",
                    truncate(entry.candidate.id.as_str(), 20),
                    entry.candidate.tier,
                    status_str(entry.status),
                    format_age(entry.added_at, now),
                    truncate(&entry.candidate.content, 50)
                );
            }
            Ok(())
        }
        PoolCommand::Show { id } => {
            let entry = pool.get(&id)?;
            print_json(&entry)
        }
        PoolCommand::Stage { id, min_tier } => {
            let min = parse_tier(&min_tier)?;
            if ctx.dry_run {
                println!("[dry-run] Would stage {id}");
                return Ok(());
            }
            pool.stage(&id, min, now)?;
            println!("Staged: {id}");
            Ok(())
        }
        PoolCommand::Promote { id } => {
            if ctx.dry_run {
                println!("[dry-run] Would promote {id}");
                return Ok(());
            }
            let artifact = pool.promote(&id, now)?;
            println!("Promoted: {id} -> {}", artifact.display());
            Ok(())
        }
        PoolCommand::Reject {
            id,
            reason,
            reviewer,
        } => {
            if ctx.dry_run {
                println!("[dry-run] Would reject {id}");
                return Ok(());
            }
            pool.reject(&id, &reason, &reviewer, now)?;
            println!("Rejected: {id}");
            Ok(())
        }
        PoolCommand::Approve { id, note, reviewer } => {
            if ctx.dry_run {
                println!("[dry-run] Would approve {id}");
                return Ok(());
            }
            pool.approve(&id, &note, &reviewer, now)?;
            println!("Approved: {id}");
            Ok(())
        }
        PoolCommand::AutoPromote {
            threshold,
            reviewer,
        } => {
            let threshold = parse_duration(&threshold)?;
            let promoted = pool.bulk_approve(threshold, &reviewer, ctx.dry_run, now)?;
            if ctx.dry_run {
                println!("[dry-run] Would promote {} silver candidates", promoted.len());
            } else {
                println!("Auto-promoted {} silver candidates", promoted.len());
                for id in promoted {
                    println!("  {id}");
                }
            }
            Ok(())
        }
    }
}

fn parse_tier(s: &str) -> Result<Tier> {
    match Tier::parse(s) {
        Some(tier) => Ok(tier),
        None => bail!("unknown tier {s:?} (gold, silver, bronze, discard)"),
    }
}

fn parse_status(s: &str) -> Result<PoolStatus> {
    match s.to_ascii_lowercase().as_str() {
        "pending" => Ok(PoolStatus::Pending),
        "staged" => Ok(PoolStatus::Staged),
        "promoted" => Ok(PoolStatus::Promoted),
        "rejected" => Ok(PoolStatus::Rejected),
        _ => bail!("unknown status {s:?}"),
    }
}

fn status_str(status: PoolStatus) -> &'static str {
    match status {
        PoolStatus::Pending => "pending",
        PoolStatus::Staged => "staged",
        PoolStatus::Promoted => "promoted",
        PoolStatus::Rejected => "rejected",
    }
}

/// Parse durations like "24h", "90m", "3600s".
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

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
