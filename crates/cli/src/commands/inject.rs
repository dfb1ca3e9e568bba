// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::context::Context;
use crate::output::print_json;
use anyhow::Result;
use ao_core::SessionId;
use ao_engine::Retriever;
use chrono::Utc;
use clap::Args;

#[derive(Args)]
pub struct InjectArgs {
    /// Context query for filtering
    query: Option<String>,

    /// Maximum tokens to output
    #[arg(long, default_value_t = ao_engine::retriever::DEFAULT_MAX_TOKENS)]
    max_tokens: usize,

    /// Session id for citation tracking (auto-generated if empty)
    #[arg(long)]
    session: Option<String>,

    /// Skip citation recording
    #[arg(long)]
    no_cite: bool,
}

pub fn run(ctx: &Context, args: InjectArgs) -> Result<()> {
    let now = Utc::now();
    let session_id = SessionId::canonical(args.session.as_deref().unwrap_or(""), now);

    if ctx.dry_run {
        println!(
            "[dry-run] Would inject knowledge (max {} tokens) for {}",
            args.max_tokens, session_id
        );
        return Ok(());
    }

    if ao_engine::env::semantic_search_disabled() && ctx.verbose {
        eprintln!("semantic search disabled; using file search only");
    }

    let retriever = Retriever::new(&ctx.base_dir).with_max_tokens(args.max_tokens);
    let injection = retriever.retrieve(
        args.query.as_deref(),
        &session_id,
        !args.no_cite,
        now,
    )?;

    if ctx.json() {
        print_json(&injection)?;
    } else {
        let (rendered, _truncated) = retriever.render_markdown(&injection);
        println!("{rendered}");
    }
    Ok(())
}
