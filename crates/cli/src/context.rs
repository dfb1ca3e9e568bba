// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command context threaded through every entry point in place of
//! process-wide globals.

use crate::output::OutputFormat;
use anyhow::{Context as _, Result};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Context {
    pub base_dir: PathBuf,
    pub output: OutputFormat,
    pub dry_run: bool,
    pub verbose: bool,
}

impl Context {
    /// Resolve the context from flags and environment. Flags win over
    /// `AO_BASE_DIR` / `AO_OUTPUT` / `AO_VERBOSE`.
    pub fn build(
        base_dir: Option<PathBuf>,
        output: OutputFormat,
        dry_run: bool,
        verbose: bool,
    ) -> Result<Self> {
        let base_dir = match base_dir {
            Some(dir) => dir,
            None => match std::env::var_os("AO_BASE_DIR") {
                Some(dir) => PathBuf::from(dir),
                None => std::env::current_dir().context("resolve working directory")?,
            },
        };

        let output = if output == OutputFormat::default() {
            std::env::var("AO_OUTPUT")
                .ok()
                .and_then(|v| OutputFormat::parse(&v))
                .unwrap_or(output)
        } else {
            output
        };

        let verbose = verbose
            || matches!(
                std::env::var("AO_VERBOSE").ok().as_deref(),
                Some("1") | Some("true")
            );

        Ok(Self {
            base_dir,
            output,
            dry_run,
            verbose,
        })
    }

    /// Install the tracing subscriber once per process.
    pub fn init_tracing(&self) {
        let default = if self.verbose { "debug" } else { "warn" };
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }

    pub fn json(&self) -> bool {
        self.output == OutputFormat::Json
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
