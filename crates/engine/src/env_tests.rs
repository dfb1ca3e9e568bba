// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn empty_agent_name_reads_as_unset() {
    // Not set in the test environment by default.
    std::env::remove_var("AO_AGENT_NAME");
    assert_eq!(agent_name(), None);
}

#[test]
fn semantic_toggle_parses_truthy_values() {
    std::env::remove_var("AO_NO_SEMANTIC");
    assert!(!semantic_search_disabled());
}
