// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ao-storage: append-only logs and file stores for the knowledge flywheel.
//!
//! Everything here shares two durability rules: structural rewrites go
//! through temp-file + atomic rename, and append-only readers ignore a
//! trailing partial line so a crashed writer never wedges the log.

pub mod chain;
pub mod citations;
pub mod farm_meta;
pub mod feedback;
pub mod jsonl;
pub mod learning;
pub mod locator;
pub mod pool;
pub mod validate;

pub use chain::{Chain, ChainError, GateResult};
pub use citations::CitationLog;
pub use farm_meta::{FarmMeta, FarmMetaError, FarmStatus};
pub use feedback::FeedbackLog;
pub use jsonl::{append_record, atomic_write, atomic_write_json, read_records, JsonlError};
pub use learning::{LearningError, LearningRecord, LearningStore};
pub use locator::{ArtifactRoot, FindResult, Locator, LocatorError, Match};
pub use pool::{ListOptions, Pool, PoolEntry, PoolError, PoolStatus, MAX_REASON_LENGTH};
pub use validate::{ValidateError, ValidateOptions, ValidationResult, Validator};

/// Directory, relative to the project root, that holds control-plane state.
pub const AGENTS_DIR: &str = ".agents";

/// Subdirectory of [`AGENTS_DIR`] holding ao's own ledgers.
pub const AO_DIR: &str = ".agents/ao";
