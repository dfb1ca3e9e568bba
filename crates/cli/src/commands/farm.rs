// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::context::Context;
use crate::output::{format_age, print_json};
use anyhow::{bail, Result};
use ao_adapters::{NixProcessControl, TmuxAdapter};
use ao_engine::farm::{CheckStatus, FarmConfig, FarmSupervisor};
use chrono::Utc;
use clap::{Args, Subcommand};
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;

#[derive(Args)]
pub struct FarmArgs {
    #[command(subcommand)]
    command: FarmCommand,
}

#[derive(Subcommand)]
enum FarmCommand {
    /// Spawn agents and the witness
    Start {
        /// Number of agents to spawn (max 10)
        #[arg(long, default_value_t = 5)]
        agents: usize,
        /// Epic id to work on
        #[arg(long)]
        epic: Option<String>,
        /// Seconds between agent spawns
        #[arg(long, default_value_t = 30)]
        stagger: u64,
        /// Skip the witness
        #[arg(long = "no-witness")]
        no_witness: bool,
    },
    /// Graceful shutdown
    Stop {
        #[arg(long, default_value = "manual")]
        reason: String,
    },
    /// Show running farm state
    Status,
    /// Pre-flight checks
    Validate,
    /// Recover from a disconnected session
    Resume,
}

fn supervisor(ctx: &Context, config: FarmConfig) -> FarmSupervisor<TmuxAdapter, NixProcessControl> {
    FarmSupervisor::new(
        TmuxAdapter::new(),
        NixProcessControl::new(),
        &ctx.base_dir,
        config,
    )
}

/// Forward SIGINT/SIGTERM into an interrupt channel for the spawn loop.
fn interrupt_channel() -> Result<mpsc::Receiver<()>> {
    let (tx, rx) = mpsc::channel(1);
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
        let _ = tx.send(()).await;
    });
    Ok(rx)
}

pub async fn run(ctx: &Context, args: FarmArgs) -> Result<()> {
    match args.command {
        FarmCommand::Start {
            agents,
            epic,
            stagger,
            no_witness,
        } => {
            let config = FarmConfig {
                agents,
                epic,
                stagger: Duration::from_secs(stagger),
                witness: !no_witness,
                ..FarmConfig::default()
            };
            let supervisor = supervisor(ctx, config);

            println!("Running pre-flight validation...");
            let report = supervisor.preflight().await;
            print_preflight(ctx, &report)?;
            if !report.passed {
                bail!("pre-flight validation failed");
            }

            if ctx.dry_run {
                println!("[dry-run] Would start farm with {agents} agents");
                return Ok(());
            }

            let mut interrupt = interrupt_channel()?;
            let meta = supervisor.start(&mut interrupt).await?;

            println!();
            println!(
                "Farm started: {} agents{}",
                meta.agent_pids.len(),
                if meta.witness_pid.is_some() {
                    ", 1 witness"
                } else {
                    ""
                }
            );
            println!("Session: {}", meta.tmux_session);
            println!();
            println!("Commands:");
            println!("  ao inbox          - check messages");
            println!("  ao farm status    - show agent states");
            println!("  ao farm stop      - graceful shutdown");
            println!("  tmux attach -t {}  - view agents", meta.tmux_session);
            Ok(())
        }
        FarmCommand::Stop { reason } => {
            if ctx.dry_run {
                println!("[dry-run] Would stop the farm (reason: {reason})");
                return Ok(());
            }
            let supervisor = supervisor(ctx, FarmConfig::default());
            let report = supervisor.stop(&reason).await?;
            match report.farm_id {
                Some(id) => println!("Farm {id} stopped"),
                None => println!("Cleanup complete (no farm metadata found)"),
            }
            Ok(())
        }
        FarmCommand::Status => {
            let supervisor = supervisor(ctx, FarmConfig::default());
            let status = supervisor.status().await;
            if ctx.json() {
                return print_json(&status);
            }
            match &status.meta {
                None if !status.session_alive => println!("No farm running"),
                None => {
                    println!("Farm session found without metadata");
                    println!("Run 'ao farm resume' to reconcile state");
                }
                Some(meta) => {
                    println!("Farm: {}", meta.farm_id);
                    println!("Status:   {:?}", meta.status);
                    if let Some(started) = meta.started_at {
                        println!("Uptime:   {}", format_age(started, Utc::now()));
                    }
                    println!(
                        "Session:  {} ({})",
                        meta.tmux_session,
                        if status.session_alive { "running" } else { "DEAD" }
                    );
                    println!(
                        "Agents:   {} live, {} dead",
                        status.live_agents, status.dead_agents
                    );
                    println!(
                        "Issues:   {} ready, {} in progress",
                        status.ready, status.in_progress
                    );
                }
            }
            Ok(())
        }
        FarmCommand::Validate => {
            let supervisor = supervisor(ctx, FarmConfig::default());
            println!("Running pre-flight validation...");
            let report = supervisor.preflight().await;
            print_preflight(ctx, &report)?;
            if !report.passed {
                bail!("pre-flight validation failed");
            }
            println!("All checks passed. Ready to start the farm.");
            Ok(())
        }
        FarmCommand::Resume => {
            if ctx.dry_run {
                println!("[dry-run] Would reconcile farm state");
                return Ok(());
            }
            let supervisor = supervisor(ctx, FarmConfig::default());
            let report = supervisor.resume().await?;
            if ctx.json() {
                return print_json(&report);
            }
            println!(
                "Agent session: {}",
                if report.agent_session_alive { "running" } else { "dead" }
            );
            println!("In-progress issues: {}", report.in_progress);
            if report.requeued > 0 {
                println!("Requeued {} orphaned issues to ready", report.requeued);
            }
            if report.meta_recreated {
                println!("Recreated farm metadata");
            }
            if report.stale_pid_removed {
                println!("Cleaned up stale witness PID file");
            }
            println!("Resume complete. Run 'ao farm status' to check state.");
            Ok(())
        }
    }
}

fn print_preflight(ctx: &Context, report: &ao_engine::farm::PreflightReport) -> Result<()> {
    if ctx.json() {
        return print_json(report);
    }
    for check in &report.checks {
        let tag = match check.status {
            CheckStatus::Ok => "OK",
            CheckStatus::Warn => "WARN",
            CheckStatus::Fail => "FAIL",
        };
        println!("  {:<14} {:<5} {}", check.name, tag, check.detail);
    }
    Ok(())
}
