// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::context::Context;
use crate::output::{print_json, truncate};
use anyhow::{bail, Result};
use ao_core::ratchet::{ArtifactTier, ChainEntry, Step};
use ao_storage::{Chain, CitationLog, Locator, ValidateOptions, Validator};
use chrono::{Duration, Utc};
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct RatchetArgs {
    #[command(subcommand)]
    command: RatchetCommand,
}

#[derive(Subcommand)]
enum RatchetCommand {
    /// Show chain state per step
    Status,
    /// Check whether a step's gate is met (exit 1 if not)
    Check { step: String },
    /// Record step completion (engages the ratchet)
    Record {
        step: String,
        #[arg(long)]
        input: Option<String>,
        #[arg(long)]
        output: String,
        #[arg(long)]
        tier: Option<u8>,
        #[arg(long, default_value_t = true)]
        lock: bool,
    },
    /// Record an intentional skip
    Skip {
        step: String,
        #[arg(long)]
        reason: String,
    },
    /// Validate artifact structure for a step
    Validate {
        step: String,
        #[arg(long = "changes")]
        files: Vec<PathBuf>,
        /// Allow legacy artifacts without a schema marker
        #[arg(long)]
        lenient: bool,
        /// Days until the lenient bypass expires
        #[arg(long = "lenient-expiry", default_value_t = 90)]
        lenient_days: i64,
    },
    /// Trace provenance backward from an artifact
    Trace { artifact: String },
    /// Print the current spec artifact path
    Spec,
    /// Search for artifacts across layered roots
    Find { pattern: String },
    /// Record a tier promotion
    Promote {
        artifact: PathBuf,
        #[arg(long = "to")]
        tier: u8,
    },
    /// Add schema markers to legacy artifacts
    Migrate {
        #[arg(default_value = ".agents")]
        path: PathBuf,
    },
}

pub fn run(ctx: &Context, args: RatchetArgs) -> Result<()> {
    match args.command {
        RatchetCommand::Status => status(ctx),
        RatchetCommand::Check { step } => check(ctx, &step),
        RatchetCommand::Record {
            step,
            input,
            output,
            tier,
            lock,
        } => record(ctx, &step, input, output, tier, lock),
        RatchetCommand::Skip { step, reason } => skip(ctx, &step, &reason),
        RatchetCommand::Validate {
            step,
            files,
            lenient,
            lenient_days,
        } => validate(ctx, &step, files, lenient, lenient_days),
        RatchetCommand::Trace { artifact } => trace(ctx, &artifact),
        RatchetCommand::Spec => spec(ctx),
        RatchetCommand::Find { pattern } => find(ctx, &pattern),
        RatchetCommand::Promote { artifact, tier } => promote(ctx, &artifact, tier),
        RatchetCommand::Migrate { path } => migrate(ctx, &path),
    }
}

fn parse_step(name: &str) -> Result<Step> {
    match Step::parse(name) {
        Some(step) => Ok(step),
        None => bail!("unknown step: {name}"),
    }
}

fn status(ctx: &Context) -> Result<()> {
    let chain = Chain::load(&ctx.base_dir)?;
    let statuses = chain.all_status();

    if ctx.json() {
        let steps: Vec<serde_json::Value> = statuses
            .iter()
            .map(|(step, status)| {
                let latest = chain.latest(*step);
                serde_json::json!({
                    "step": step.as_str(),
                    "status": status.as_str(),
                    "output": latest.map(|e| e.output.clone()),
                    "time": latest.map(|e| e.timestamp.to_rfc3339()),
                })
            })
            .collect();
        return print_json(&serde_json::json!({
            "path": chain.path().display().to_string(),
            "steps": steps,
        }));
    }

    println!("Ratchet Chain Status");
    println!("{:<15} {:<12} OUTPUT", "STEP", "STATUS");
    for (step, status) in statuses {
        let output = chain
            .latest(step)
            .map(|e| truncate(&e.output, 40))
            .unwrap_or_default();
        println!("{:<15} {:<12} {}", step.as_str(), status.as_str(), output);
    }
    println!("\nPath: {}", chain.path().display());
    Ok(())
}

fn check(ctx: &Context, step_name: &str) -> Result<()> {
    let step = parse_step(step_name)?;
    let chain = Chain::load(&ctx.base_dir)?;
    let gate = chain.check_gate(step);

    if ctx.json() {
        print_json(&gate)?;
    } else if gate.passed {
        println!("GATE PASSED: {}", gate.message);
        if let Some(input) = &gate.input {
            println!("Input: {input}");
        }
    } else {
        println!("GATE FAILED: {}", gate.message);
    }

    if !gate.passed {
        std::process::exit(1);
    }
    Ok(())
}

fn record(
    ctx: &Context,
    step_name: &str,
    input: Option<String>,
    output: String,
    tier: Option<u8>,
    lock: bool,
) -> Result<()> {
    let step = parse_step(step_name)?;
    if ctx.dry_run {
        println!("[dry-run] Would record {step} -> {output}");
        return Ok(());
    }

    let mut entry = ChainEntry::recorded(step, output.clone(), Utc::now());
    if let Some(input) = input {
        entry = entry.with_input(input);
    }
    if let Some(index) = tier {
        let Some(tier) = ArtifactTier::from_index(index) else {
            bail!("tier must be 0-4, got {index}");
        };
        entry = entry.with_tier(tier);
    }
    if !lock {
        entry = entry.unlocked();
    }

    let mut chain = Chain::load(&ctx.base_dir)?;
    chain.append(entry)?;

    println!("Recorded: {step} -> {output}");
    if lock {
        println!("Ratchet engaged");
    }
    Ok(())
}

fn skip(ctx: &Context, step_name: &str, reason: &str) -> Result<()> {
    let step = parse_step(step_name)?;
    if reason.trim().is_empty() {
        bail!("--reason is required");
    }
    if ctx.dry_run {
        println!("[dry-run] Would skip {step}");
        return Ok(());
    }

    let mut chain = Chain::load(&ctx.base_dir)?;
    chain.append(ChainEntry::skip(step, reason, Utc::now()))?;
    println!("Skipped: {step} (reason: {reason})");
    Ok(())
}

fn validate(
    ctx: &Context,
    step_name: &str,
    files: Vec<PathBuf>,
    lenient: bool,
    lenient_days: i64,
) -> Result<()> {
    let step = parse_step(step_name)?;
    let now = Utc::now();

    let files = if files.is_empty() {
        resolve_expected_output(ctx, step)
    } else {
        files
    };
    if files.is_empty() {
        bail!("no files to validate (use --changes or ensure the step output exists)");
    }

    let opts = ValidateOptions {
        lenient,
        lenient_expiry: lenient.then(|| now + Duration::days(lenient_days)),
    };
    let validator = Validator::new();

    let mut all_valid = true;
    for file in &files {
        let result = validator.validate(step, file, &opts, now)?;
        if ctx.json() {
            print_json(&result)?;
        } else {
            println!(
                "Validation: {} -> {}",
                file.display(),
                if result.valid { "VALID" } else { "INVALID" }
            );
            for issue in &result.issues {
                println!("  issue: {issue}");
            }
            for warning in &result.warnings {
                println!("  warning: {warning}");
            }
            if result.expiring_soon {
                println!("  lenient bypass expiring soon; migrate this artifact");
            }
        }
        all_valid &= result.valid;
    }

    if !all_valid {
        std::process::exit(1);
    }
    Ok(())
}

fn resolve_expected_output(ctx: &Context, step: Step) -> Vec<PathBuf> {
    let Some(pattern) = step.expected_output() else {
        return Vec::new();
    };
    let locator = Locator::new(&ctx.base_dir);
    locator
        .find_first(pattern)
        .map(|m| vec![m.path])
        .unwrap_or_default()
}

fn trace(ctx: &Context, artifact: &str) -> Result<()> {
    let chain = Chain::load(&ctx.base_dir)?;
    let entries = chain.trace(artifact);

    if ctx.json() {
        return print_json(&entries);
    }

    println!("Provenance Trace: {artifact}");
    if entries.is_empty() {
        println!("No provenance chain found");
        return Ok(());
    }
    for (i, entry) in entries.iter().enumerate() {
        println!("{}. {}", i + 1, entry.step);
        if let Some(input) = &entry.input {
            println!("   Input:  {input}");
        }
        println!("   Output: {}", entry.output);
        println!("   Time:   {}", entry.timestamp.to_rfc3339());
    }
    Ok(())
}

fn spec(ctx: &Context) -> Result<()> {
    let locator = Locator::new(&ctx.base_dir);
    for pattern in ["specs/*-v*.md", "specs/*.md", "synthesis/*.md"] {
        if let Ok(found) = locator.find_first(pattern) {
            if ctx.json() {
                return print_json(&found);
            }
            println!("{}", found.path.display());
            return Ok(());
        }
    }
    eprintln!("No spec found");
    std::process::exit(1);
}

fn find(ctx: &Context, pattern: &str) -> Result<()> {
    let locator = Locator::new(&ctx.base_dir);
    let result = locator.find(pattern)?;

    if ctx.json() {
        return print_json(&result);
    }

    if result.matches.is_empty() {
        println!("No matches found");
        return Ok(());
    }
    println!("Found {} match(es) for: {pattern}", result.matches.len());
    for m in &result.matches {
        println!("[{}] {}", m.root, m.path.display());
    }
    for warning in &result.warnings {
        println!("  ! {warning}");
    }
    Ok(())
}

fn promote(ctx: &Context, artifact: &Path, tier_index: u8) -> Result<()> {
    let Some(tier) = ArtifactTier::from_index(tier_index) else {
        bail!("tier must be 0-4, got {tier_index}");
    };

    let citations = CitationLog::new(&ctx.base_dir).load()?;
    let artifact_str = artifact.display().to_string();
    let cited: Vec<_> = citations
        .iter()
        .filter(|c| c.artifact_path == artifact_str || c.artifact_path.ends_with(&artifact_str))
        .collect();
    let sessions = cited
        .iter()
        .map(|c| c.session_id.as_str())
        .collect::<std::collections::HashSet<_>>()
        .len();

    let result = Validator::new().validate_for_promotion(artifact, tier, cited.len(), sessions)?;
    if !result.valid {
        println!("Promotion blocked:");
        for issue in &result.issues {
            println!("  - {issue}");
        }
        std::process::exit(1);
    }

    if ctx.dry_run {
        println!("[dry-run] Would promote {} to {tier}", artifact.display());
        return Ok(());
    }

    let mut chain = Chain::load(&ctx.base_dir)?;
    chain.append(
        ChainEntry::recorded(Step::Promotion, tier.location(), Utc::now())
            .with_input(artifact_str)
            .with_tier(tier),
    )?;
    println!("Promoted: {} -> {tier}", artifact.display());
    Ok(())
}

fn migrate(ctx: &Context, path: &Path) -> Result<()> {
    let root = ctx.base_dir.join(path);
    let mut migrated = 0usize;
    let mut skipped = 0usize;
    walk_markdown(&root, &mut |file| {
        match migrate_file(ctx, file) {
            Ok(true) => migrated += 1,
            Ok(false) => skipped += 1,
            Err(e) => tracing::warn!(path = %file.display(), error = %e, "migration failed"),
        }
    })?;

    println!("Migration summary: {migrated} migrated, {skipped} skipped");
    Ok(())
}

fn walk_markdown(dir: &Path, visit: &mut impl FnMut(&Path)) -> Result<()> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Ok(());
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk_markdown(&path, visit)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("md") {
            visit(&path);
        }
    }
    Ok(())
}

/// Insert a schema marker after the title line. Returns true when the
/// file changed.
fn migrate_file(ctx: &Context, path: &Path) -> Result<bool> {
    let content = std::fs::read_to_string(path)?;
    if content.contains("Schema Version:") || content.contains("schema_version:") {
        return Ok(false);
    }

    let lines: Vec<&str> = content.lines().collect();
    let Some(insert_at) = lines.iter().position(|l| l.starts_with("# ")) else {
        return Ok(false);
    };

    if ctx.dry_run {
        println!("[dry-run] Would add schema marker to {}", path.display());
        return Ok(true);
    }

    let mut out: Vec<&str> = Vec::with_capacity(lines.len() + 1);
    out.extend(&lines[..=insert_at]);
    out.push("**Schema Version:** 1");
    out.extend(&lines[insert_at + 1..]);
    ao_storage::atomic_write(path, (out.join("\n") + "\n").as_bytes())?;
    Ok(true)
}

#[cfg(test)]
#[path = "ratchet_tests.rs"]
mod tests;
