// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::context::Context;
use crate::output::print_json;
use anyhow::Result;
use ao_core::{CitationType, SessionId};
use ao_engine::metrics::FlywheelMetrics;
use ao_engine::MetricsEngine;
use chrono::Utc;
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct MetricsArgs {
    #[command(subcommand)]
    command: MetricsCommand,
}

#[derive(Subcommand)]
enum MetricsCommand {
    /// Capture and persist a flywheel baseline
    Baseline {
        #[arg(long, default_value_t = 7)]
        days: i64,
    },
    /// Report current flywheel metrics
    Report {
        #[arg(long, default_value_t = 7)]
        days: i64,
    },
    /// Record a manual citation for an artifact
    Cite {
        artifact: String,
        #[arg(long)]
        session: Option<String>,
    },
}

#[derive(Args)]
pub struct FlywheelArgs {
    #[command(subcommand)]
    command: FlywheelCommand,
}

#[derive(Subcommand)]
enum FlywheelCommand {
    /// Escape-velocity summary
    Status,
}

pub fn run(ctx: &Context, args: MetricsArgs) -> Result<()> {
    let engine = MetricsEngine::new(&ctx.base_dir);
    let now = Utc::now();

    match args.command {
        MetricsCommand::Baseline { days } => {
            if ctx.dry_run {
                println!("[dry-run] Would capture a baseline for a {days} day period");
                return Ok(());
            }
            let metrics = engine.compute(days, now)?;
            let path = engine.save_baseline(&metrics)?;
            if ctx.json() {
                print_json(&metrics)?;
            } else {
                print_metrics(&metrics);
            }
            println!("\nBaseline saved: {}", path.display());
            Ok(())
        }
        MetricsCommand::Report { days } => {
            let metrics = engine.compute(days, now)?;
            if ctx.json() {
                print_json(&metrics)?;
            } else {
                print_metrics(&metrics);
            }
            Ok(())
        }
        MetricsCommand::Cite { artifact, session } => {
            let session_id = SessionId::canonical(session.as_deref().unwrap_or(""), now);
            if ctx.dry_run {
                println!("[dry-run] Would record a citation for {artifact}");
                return Ok(());
            }
            engine.record_citation(&artifact, session_id.as_str(), CitationType::Bypass, now)?;
            println!("Cited: {artifact} (session {session_id})");
            Ok(())
        }
    }
}

pub fn run_flywheel(ctx: &Context, args: FlywheelArgs) -> Result<()> {
    let FlywheelCommand::Status = args.command;
    let engine = MetricsEngine::new(&ctx.base_dir);
    let metrics = engine.compute(7, Utc::now())?;

    if ctx.json() {
        return print_json(&serde_json::json!({
            "status": metrics.escape_velocity_status(),
            "delta": metrics.delta,
            "sigma": metrics.sigma,
            "rho": metrics.rho,
            "sigma_rho": metrics.sigma_rho,
            "compounding": metrics.above_escape_velocity,
            "loop": metrics.loop_status(),
        }));
    }

    println!("Flywheel: {}", metrics.escape_velocity_status());
    println!(
        "  sigma*rho = {:.3} vs delta = {:.2}/week",
        metrics.sigma_rho, metrics.delta
    );
    println!(
        "  Loop closure: {:.2} ({})",
        metrics.loop_closure_ratio,
        metrics.loop_status()
    );
    Ok(())
}

fn print_metrics(m: &FlywheelMetrics) {
    println!("Flywheel Metrics ({}d period)", m.period_days);
    println!("  delta (decay):   {:.2}/week", m.delta);
    println!("  sigma:           {:.3} ({} of {} artifacts cited)", m.sigma, m.unique_cited, m.total_artifacts);
    println!("  rho:             {:.3} citations/artifact/week", m.rho);
    println!(
        "  escape velocity: {} (sigma*rho = {:.3})",
        m.escape_velocity_status(),
        m.sigma_rho
    );
    println!(
        "  loop closure:    {:.2} ({}; {} found / {} created)",
        m.loop_closure_ratio,
        m.loop_status(),
        m.learnings_found,
        m.learnings_created
    );
    println!(
        "  utility:         mean {:.2}, stdev {:.2}, {} high, {} low (n={})",
        m.utility.mean, m.utility.stdev, m.utility.high, m.utility.low, m.utility.count
    );
}
