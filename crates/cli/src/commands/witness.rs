// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::context::Context;
use crate::output::print_json;
use anyhow::Result;
use ao_adapters::{NixProcessControl, TmuxAdapter};
use ao_engine::witness::WitnessConfig;
use ao_engine::Witness;
use chrono::Utc;
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct WitnessArgs {
    #[command(subcommand)]
    command: WitnessCommand,
}

#[derive(Subcommand)]
enum WitnessCommand {
    /// Start the witness against the farm session
    Start {
        /// Farm session to watch (defaults to this project's farm)
        #[arg(long)]
        farm_session: Option<String>,
    },
    /// Stop the witness
    Stop,
    /// Witness liveness and heartbeat
    Status,
}

fn witness(ctx: &Context) -> Witness<TmuxAdapter, NixProcessControl> {
    Witness::new(
        TmuxAdapter::new(),
        NixProcessControl::new(),
        &ctx.base_dir,
        WitnessConfig::default(),
    )
}

pub async fn run(ctx: &Context, args: WitnessArgs) -> Result<()> {
    let witness = witness(ctx);
    match args.command {
        WitnessCommand::Start { farm_session } => {
            let farm_session = farm_session
                .or_else(ao_engine::env::farm_session)
                .unwrap_or_else(|| {
                    let project = ctx
                        .base_dir
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| "project".to_string());
                    format!("ao-farm-{project}")
                });
            if ctx.dry_run {
                println!("[dry-run] Would start the witness watching {farm_session}");
                return Ok(());
            }
            let pid = witness.start(&farm_session).await?;
            println!("Witness started (PID {pid}) watching {farm_session}");
            Ok(())
        }
        WitnessCommand::Stop => {
            if ctx.dry_run {
                println!("[dry-run] Would stop the witness");
                return Ok(());
            }
            if witness.stop().await {
                println!("Witness stopped");
            } else {
                println!("No witness running");
            }
            Ok(())
        }
        WitnessCommand::Status => {
            let status = witness.status(Utc::now()).await;
            if ctx.json() {
                return print_json(&status);
            }
            match status.pid {
                Some(pid) => {
                    println!(
                        "Witness: PID {pid} ({})",
                        if status.running { "running" } else { "DEAD" }
                    );
                    match status.heartbeat_age_secs {
                        Some(age) if age <= 120 => println!("Heartbeat: {age}s ago"),
                        Some(age) => println!("Heartbeat: {age}s ago (STALE)"),
                        None => println!("Heartbeat: none"),
                    }
                }
                None => println!("No witness PID file"),
            }
            Ok(())
        }
    }
}
