// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::context::Context;
use anyhow::Result;

/// Directories created under the project root.
const DIRS: [&str; 8] = [
    ".agents/ao",
    ".agents/ao/metrics",
    ".agents/ao/findings",
    ".agents/candidates",
    ".agents/learnings",
    ".agents/patterns",
    ".agents/retros",
    ".agents/mail",
];

pub fn run(ctx: &Context) -> Result<()> {
    if ctx.dry_run {
        println!("[dry-run] Would create .agents state directories");
        return Ok(());
    }

    for dir in DIRS {
        std::fs::create_dir_all(ctx.base_dir.join(dir))?;
    }
    ao_storage::Pool::new(&ctx.base_dir).init()?;

    println!("Initialized .agents in {}", ctx.base_dir.display());
    Ok(())
}
