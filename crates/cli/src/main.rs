// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ao - knowledge flywheel and agent farm CLI

mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{farm, feedback, forge, inject, init, mail, metrics, pool, ratchet, witness};
use context::Context;
use output::OutputFormat;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ao",
    version,
    about = "ao - a knowledge-compounding control plane for agent farms"
)]
struct Cli {
    /// Base directory override (defaults to the current directory)
    #[arg(short = 'C', long = "base-dir", global = true, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// Output format
    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        global = true,
        default_value_t
    )]
    output: OutputFormat,

    /// Print what would happen without doing it
    #[arg(long = "dry-run", global = true)]
    dry_run: bool,

    /// Verbose diagnostics
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the .agents state directories
    Init,
    /// Extract knowledge from transcripts
    Forge(forge::ForgeArgs),
    /// Output relevant knowledge for session injection
    Inject(inject::InjectArgs),
    /// Close the feedback loop for a session
    FeedbackLoop(feedback::FeedbackLoopArgs),
    /// Quality pool management
    Pool(pool::PoolArgs),
    /// Ratchet chain tracking
    Ratchet(ratchet::RatchetArgs),
    /// Agent farm management
    Farm(farm::FarmArgs),
    /// Witness management
    Witness(witness::WitnessArgs),
    /// Send agent mail
    Mail(mail::MailArgs),
    /// Read the mailbox
    Inbox(mail::InboxArgs),
    /// Flywheel metrics
    Metrics(metrics::MetricsArgs),
    /// Flywheel status
    Flywheel(metrics::FlywheelArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let ctx = Context::build(cli.base_dir, cli.output, cli.dry_run, cli.verbose)?;
    ctx.init_tracing();

    match cli.command {
        Commands::Init => init::run(&ctx),
        Commands::Forge(args) => forge::run(&ctx, args).await,
        Commands::Inject(args) => inject::run(&ctx, args),
        Commands::FeedbackLoop(args) => feedback::run(&ctx, args),
        Commands::Pool(args) => pool::run(&ctx, args),
        Commands::Ratchet(args) => ratchet::run(&ctx, args),
        Commands::Farm(args) => farm::run(&ctx, args).await,
        Commands::Witness(args) => witness::run(&ctx, args).await,
        Commands::Mail(args) => mail::run_send(&ctx, args),
        Commands::Inbox(args) => mail::run_inbox(&ctx, args),
        Commands::Metrics(args) => metrics::run(&ctx, args),
        Commands::Flywheel(args) => metrics::run_flywheel(&ctx, args),
    }
}
