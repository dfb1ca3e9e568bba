// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-delimited transcript records produced by worker sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One tool invocation recorded on a transcript line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ToolCall {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub input: serde_json::Value,
    #[serde(default)]
    pub output: String,
}

impl ToolCall {
    /// File path touched by this tool call, if any.
    ///
    /// Looks up the `file_path` and `path` input fields in that order.
    pub fn file_path(&self) -> Option<&str> {
        self.input
            .get("file_path")
            .or_else(|| self.input.get("path"))
            .and_then(|v| v.as_str())
    }
}

/// One record of a line-delimited transcript file.
///
/// Unknown fields are ignored; timestamps that fail to parse are dropped
/// rather than rejecting the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TranscriptRecord {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tools: Vec<ToolCall>,
    #[serde(default)]
    pub message_index: u64,
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

/// Parse a transcript timestamp in RFC3339 or date-only form.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw.trim()) {
        return Some(ts.with_timezone(&Utc));
    }
    let date = chrono::NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(DateTime::from_naive_utc_and_offset(midnight, Utc))
}

#[cfg(test)]
#[path = "transcript_tests.rs"]
mod tests;
