// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the engine crate.

/// Agent name propagated into spawned workers (`AO_AGENT_NAME`).
pub fn agent_name() -> Option<String> {
    std::env::var("AO_AGENT_NAME").ok().filter(|s| !s.is_empty())
}

/// Farm session name propagated into spawned workers (`AO_FARM_SESSION`).
pub fn farm_session() -> Option<String> {
    std::env::var("AO_FARM_SESSION").ok().filter(|s| !s.is_empty())
}

/// Disable the semantic-search backend (`AO_NO_SEMANTIC`).
pub fn semantic_search_disabled() -> bool {
    matches!(
        std::env::var("AO_NO_SEMANTIC").ok().as_deref(),
        Some("1") | Some("true")
    )
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
