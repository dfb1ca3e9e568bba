// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed inter-agent mail messages and the subject/body parser.
//!
//! Subjects carry an optional `[bead-id]` or `bead-id:` prefix followed by
//! an upper-case type token. Bodies mix labeled single-line fields
//! (`Label: value`) with markdown sections (`## Section`).

use crate::id::MessageId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The type of a mail message, classified from its subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Progress,
    Completion,
    Blocker,
    FarmComplete,
    HelpRequest,
    Checkpoint,
    SpawnRequest,
    SpawnAck,
    BeadAccepted,
    OfferingReady,
    Done,
    Failed,
    #[default]
    Unknown,
}

impl MessageType {
    /// Classify a subject line by its upper-case type token.
    pub fn classify(subject: &str) -> MessageType {
        let upper = subject.to_uppercase();
        // Compound tokens first so FARM_COMPLETE does not read as COMPLETION
        // and HELP_REQUEST does not read as PROGRESS.
        if upper.contains("BEAD_ACCEPTED") {
            MessageType::BeadAccepted
        } else if upper.contains("OFFERING_READY") {
            MessageType::OfferingReady
        } else if upper.contains("HELP_REQUEST") {
            MessageType::HelpRequest
        } else if upper.contains("SPAWN_REQUEST") {
            MessageType::SpawnRequest
        } else if upper.contains("SPAWN_ACK") {
            MessageType::SpawnAck
        } else if upper.contains("FARM_COMPLETE") || upper.contains("FARM COMPLETE") {
            MessageType::FarmComplete
        } else if upper.contains("CHECKPOINT") {
            MessageType::Checkpoint
        } else if upper.contains("COMPLETION") {
            MessageType::Completion
        } else if upper.contains("BLOCKER") {
            MessageType::Blocker
        } else if upper.contains("PROGRESS") {
            MessageType::Progress
        } else if upper.contains("FAILED") {
            MessageType::Failed
        } else if upper.contains("DONE") {
            MessageType::Done
        } else {
            MessageType::Unknown
        }
    }

    /// True when this type signals task completion.
    pub fn is_completion(&self) -> bool {
        matches!(
            self,
            MessageType::OfferingReady
                | MessageType::Done
                | MessageType::Failed
                | MessageType::Checkpoint
                | MessageType::Completion
        )
    }

    /// True when this type signals successful completion.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            MessageType::OfferingReady | MessageType::Done | MessageType::Completion
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Progress => "progress",
            MessageType::Completion => "completion",
            MessageType::Blocker => "blocker",
            MessageType::FarmComplete => "farm_complete",
            MessageType::HelpRequest => "help_request",
            MessageType::Checkpoint => "checkpoint",
            MessageType::SpawnRequest => "spawn_request",
            MessageType::SpawnAck => "spawn_ack",
            MessageType::BeadAccepted => "bead_accepted",
            MessageType::OfferingReady => "offering_ready",
            MessageType::Done => "done",
            MessageType::Failed => "failed",
            MessageType::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Option<MessageType> {
        match s.to_ascii_lowercase().as_str() {
            "progress" => Some(MessageType::Progress),
            "completion" => Some(MessageType::Completion),
            "blocker" => Some(MessageType::Blocker),
            "farm_complete" => Some(MessageType::FarmComplete),
            "help_request" => Some(MessageType::HelpRequest),
            "checkpoint" => Some(MessageType::Checkpoint),
            "spawn_request" => Some(MessageType::SpawnRequest),
            "spawn_ack" => Some(MessageType::SpawnAck),
            "bead_accepted" => Some(MessageType::BeadAccepted),
            "offering_ready" => Some(MessageType::OfferingReady),
            "done" => Some(MessageType::Done),
            "failed" => Some(MessageType::Failed),
            "unknown" => Some(MessageType::Unknown),
            _ => None,
        }
    }
}

/// Why a help request was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueKind {
    Stuck,
    SpecUnclear,
    Blocked,
    Technical,
}

impl IssueKind {
    pub fn parse(s: &str) -> Option<IssueKind> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STUCK" => Some(IssueKind::Stuck),
            "SPEC_UNCLEAR" => Some(IssueKind::SpecUnclear),
            "BLOCKED" => Some(IssueKind::Blocked),
            "TECHNICAL" => Some(IssueKind::Technical),
            _ => None,
        }
    }
}

/// Why an implementation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    TestsFail,
    BuildFail,
    SpecImpossible,
    ContextHigh,
    Error,
}

impl FailureKind {
    pub fn parse(s: &str) -> Option<FailureKind> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TESTS_FAIL" => Some(FailureKind::TestsFail),
            "BUILD_FAIL" => Some(FailureKind::BuildFail),
            "SPEC_IMPOSSIBLE" => Some(FailureKind::SpecImpossible),
            "CONTEXT_HIGH" => Some(FailureKind::ContextHigh),
            "ERROR" => Some(FailureKind::Error),
            _ => None,
        }
    }
}

/// Why a checkpoint was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckpointReason {
    ContextHigh,
    Manual,
    Timeout,
}

impl CheckpointReason {
    pub fn parse(s: &str) -> Option<CheckpointReason> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CONTEXT_HIGH" => Some(CheckpointReason::ContextHigh),
            "MANUAL" => Some(CheckpointReason::Manual),
            "TIMEOUT" => Some(CheckpointReason::Timeout),
            _ => None,
        }
    }
}

/// Type-specific structured content extracted from a message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParsedPayload {
    BeadAccepted {
        bead_id: String,
        title: String,
    },
    Progress {
        bead_id: String,
        step: String,
        status: String,
        context_usage: Option<u8>,
        files_touched: Vec<String>,
    },
    HelpRequest {
        bead_id: String,
        issue_kind: Option<IssueKind>,
        problem: String,
        what_tried: String,
        question: String,
        files_touched: Vec<String>,
    },
    Completion {
        bead_id: String,
        status: String,
        commit_sha: String,
        files: Vec<String>,
        tests_pass: bool,
        lint_pass: bool,
        build_pass: bool,
        summary: String,
    },
    Failed {
        bead_id: String,
        failure_kind: Option<FailureKind>,
        reason: String,
        internal_attempts: u32,
        partial_commit_sha: String,
        files: Vec<String>,
        recommendation: String,
    },
    Checkpoint {
        bead_id: String,
        reason: Option<CheckpointReason>,
        partial_commit_sha: String,
        progress: String,
        context_usage: Option<u8>,
        next_steps: String,
    },
    SpawnRequest {
        issue_id: String,
        resume: bool,
        checkpoint_sha: String,
        orchestrator: String,
    },
    SpawnAck {
        issue_id: String,
        status: String,
    },
    Blocker {
        bead_id: String,
        summary: String,
    },
    FarmComplete {
        summary: String,
    },
    #[default]
    Unparsed,
}

impl ParsedPayload {
    /// Bead id carried by this payload, if any.
    pub fn bead_id(&self) -> Option<&str> {
        let id = match self {
            ParsedPayload::BeadAccepted { bead_id, .. }
            | ParsedPayload::Progress { bead_id, .. }
            | ParsedPayload::HelpRequest { bead_id, .. }
            | ParsedPayload::Completion { bead_id, .. }
            | ParsedPayload::Failed { bead_id, .. }
            | ParsedPayload::Checkpoint { bead_id, .. }
            | ParsedPayload::Blocker { bead_id, .. } => bead_id,
            ParsedPayload::SpawnRequest { issue_id, .. }
            | ParsedPayload::SpawnAck { issue_id, .. } => issue_id,
            ParsedPayload::FarmComplete { .. } | ParsedPayload::Unparsed => return None,
        };
        (!id.is_empty()).then_some(id.as_str())
    }
}

/// A typed mailbox message as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subject: String,
    pub body: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ack_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub parsed: ParsedPayload,
}

/// Parses subjects and bodies into typed messages.
#[derive(Debug, Clone, Default)]
pub struct MailParser;

impl MailParser {
    pub fn new() -> Self {
        Self
    }

    /// Build a fully-parsed message. When `explicit_type` is `None`, the
    /// type is classified from the subject (falling back to the body).
    pub fn compose(
        &self,
        id: MessageId,
        from: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        explicit_type: Option<MessageType>,
        timestamp: DateTime<Utc>,
    ) -> Message {
        let subject = subject.into();
        let body = body.into();
        let kind = explicit_type.unwrap_or_else(|| {
            let from_subject = MessageType::classify(&subject);
            if from_subject == MessageType::Unknown {
                MessageType::classify(&body)
            } else {
                from_subject
            }
        });
        let mut parsed = self.parse_body(kind, &body);
        if parsed.bead_id().is_none() {
            if let Some(bead) = extract_bead_id(&subject) {
                parsed = backfill_bead_id(parsed, bead);
            }
        }
        Message {
            id,
            from: from.into(),
            to: to.into(),
            subject,
            body,
            kind,
            timestamp,
            read: false,
            ack_required: false,
            thread_id: None,
            parsed,
        }
    }

    /// Extract type-specific fields from a message body.
    pub fn parse_body(&self, kind: MessageType, body: &str) -> ParsedPayload {
        match kind {
            MessageType::BeadAccepted => ParsedPayload::BeadAccepted {
                bead_id: field(body, "Accepted bead:")
                    .or_else(|| field(body, "Bead:"))
                    .unwrap_or_default(),
                title: field(body, "Title:").unwrap_or_default(),
            },
            MessageType::Progress => ParsedPayload::Progress {
                bead_id: field(body, "Bead:").unwrap_or_default(),
                step: field(body, "Step:").unwrap_or_default(),
                status: field(body, "Status:").unwrap_or_default(),
                context_usage: parse_percent(field(body, "Context usage:").as_deref()),
                files_touched: field(body, "Files touched:")
                    .map(|v| parse_list(&v))
                    .unwrap_or_default(),
            },
            MessageType::HelpRequest => ParsedPayload::HelpRequest {
                bead_id: field(body, "Bead:").unwrap_or_default(),
                issue_kind: field(body, "Issue Type:").as_deref().and_then(IssueKind::parse),
                problem: section(body, "Problem").unwrap_or_default(),
                what_tried: section(body, "What I Tried").unwrap_or_default(),
                question: section(body, "Question").unwrap_or_default(),
                files_touched: section(body, "Files Touched")
                    .map(|s| parse_list(&s))
                    .unwrap_or_default(),
            },
            MessageType::OfferingReady | MessageType::Done | MessageType::Completion => {
                let changes = section(body, "Changes").unwrap_or_default();
                let validation = section(body, "Self-Validation").unwrap_or_default();
                ParsedPayload::Completion {
                    bead_id: field(body, "Bead:").unwrap_or_default(),
                    status: field(body, "Status:").unwrap_or_default(),
                    commit_sha: field(&changes, "Commit:").unwrap_or_default(),
                    files: field(&changes, "Files:")
                        .map(|v| parse_list(&v))
                        .unwrap_or_default(),
                    tests_pass: is_pass(field(&validation, "Tests:").as_deref()),
                    lint_pass: is_pass(field(&validation, "Lint:").as_deref()),
                    build_pass: is_pass(field(&validation, "Build:").as_deref()),
                    summary: section(body, "Summary").unwrap_or_default(),
                }
            }
            MessageType::Failed => {
                let failure = section(body, "Failure").unwrap_or_default();
                let partial = section(body, "Partial Progress").unwrap_or_default();
                ParsedPayload::Failed {
                    bead_id: field(body, "Bead:").unwrap_or_default(),
                    failure_kind: field(&failure, "Type:").as_deref().and_then(FailureKind::parse),
                    reason: field(&failure, "Reason:").unwrap_or_default(),
                    internal_attempts: field(&failure, "Internal Attempts:")
                        .and_then(|v| v.trim().parse().ok())
                        .unwrap_or(0),
                    partial_commit_sha: field(&partial, "Commit:").unwrap_or_default(),
                    files: field(&partial, "Files:")
                        .map(|v| parse_list(&v))
                        .unwrap_or_default(),
                    recommendation: section(body, "Recommendation").unwrap_or_default(),
                }
            }
            MessageType::Checkpoint => {
                let progress = section(body, "Progress").unwrap_or_default();
                ParsedPayload::Checkpoint {
                    bead_id: field(body, "Bead:").unwrap_or_default(),
                    reason: field(body, "Reason:").as_deref().and_then(CheckpointReason::parse),
                    partial_commit_sha: field(&progress, "Commit:").unwrap_or_default(),
                    progress: field(&progress, "Description:").unwrap_or_default(),
                    context_usage: parse_percent(field(&progress, "Context usage:").as_deref()),
                    next_steps: section(body, "Next Steps for Successor")
                        .or_else(|| section(body, "Next Steps"))
                        .unwrap_or_default(),
                }
            }
            MessageType::SpawnRequest => ParsedPayload::SpawnRequest {
                issue_id: field(body, "Issue:")
                    .or_else(|| field(body, "Bead:"))
                    .unwrap_or_default(),
                resume: field(body, "Resume:")
                    .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "yes"))
                    .unwrap_or(false),
                checkpoint_sha: field(body, "Checkpoint:").unwrap_or_default(),
                orchestrator: field(body, "Orchestrator:").unwrap_or_default(),
            },
            MessageType::SpawnAck => ParsedPayload::SpawnAck {
                issue_id: field(body, "Issue:")
                    .or_else(|| field(body, "Bead:"))
                    .unwrap_or_default(),
                status: field(body, "Status:").unwrap_or_default(),
            },
            MessageType::Blocker => ParsedPayload::Blocker {
                bead_id: field(body, "Bead:").unwrap_or_default(),
                summary: first_nonempty_line(body),
            },
            MessageType::FarmComplete => ParsedPayload::FarmComplete {
                summary: first_nonempty_line(body),
            },
            MessageType::Unknown => ParsedPayload::Unparsed,
        }
    }
}

fn backfill_bead_id(parsed: ParsedPayload, bead: String) -> ParsedPayload {
    match parsed {
        ParsedPayload::BeadAccepted { title, .. } => {
            ParsedPayload::BeadAccepted { bead_id: bead, title }
        }
        ParsedPayload::Progress {
            step,
            status,
            context_usage,
            files_touched,
            ..
        } => ParsedPayload::Progress {
            bead_id: bead,
            step,
            status,
            context_usage,
            files_touched,
        },
        ParsedPayload::HelpRequest {
            issue_kind,
            problem,
            what_tried,
            question,
            files_touched,
            ..
        } => ParsedPayload::HelpRequest {
            bead_id: bead,
            issue_kind,
            problem,
            what_tried,
            question,
            files_touched,
        },
        ParsedPayload::Completion {
            status,
            commit_sha,
            files,
            tests_pass,
            lint_pass,
            build_pass,
            summary,
            ..
        } => ParsedPayload::Completion {
            bead_id: bead,
            status,
            commit_sha,
            files,
            tests_pass,
            lint_pass,
            build_pass,
            summary,
        },
        ParsedPayload::Failed {
            failure_kind,
            reason,
            internal_attempts,
            partial_commit_sha,
            files,
            recommendation,
            ..
        } => ParsedPayload::Failed {
            bead_id: bead,
            failure_kind,
            reason,
            internal_attempts,
            partial_commit_sha,
            files,
            recommendation,
        },
        ParsedPayload::Checkpoint {
            reason,
            partial_commit_sha,
            progress,
            context_usage,
            next_steps,
            ..
        } => ParsedPayload::Checkpoint {
            bead_id: bead,
            reason,
            partial_commit_sha,
            progress,
            context_usage,
            next_steps,
        },
        ParsedPayload::SpawnRequest {
            resume,
            checkpoint_sha,
            orchestrator,
            ..
        } => ParsedPayload::SpawnRequest {
            issue_id: bead,
            resume,
            checkpoint_sha,
            orchestrator,
        },
        ParsedPayload::SpawnAck { status, .. } => ParsedPayload::SpawnAck {
            issue_id: bead,
            status,
        },
        ParsedPayload::Blocker { summary, .. } => ParsedPayload::Blocker {
            bead_id: bead,
            summary,
        },
        other => other,
    }
}

/// Extract a bead id from a subject prefix: `[ol-527.1] ...` or `ol-527.1: ...`.
pub fn extract_bead_id(subject: &str) -> Option<String> {
    let trimmed = subject.trim_start();
    if let Some(rest) = trimmed.strip_prefix('[') {
        let end = rest.find(']')?;
        let id = rest[..end].trim();
        return (!id.is_empty()).then(|| id.to_string());
    }
    let colon = trimmed.find(':')?;
    let candidate = trimmed[..colon].trim();
    let valid = candidate.contains('-')
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
    valid.then(|| candidate.to_string())
}

/// Extract a single-line labeled field: for `Label: value`, returns `value`.
fn field(text: &str, label: &str) -> Option<String> {
    for line in text.lines() {
        if let Some(idx) = line.find(label) {
            return Some(line[idx + label.len()..].trim().to_string());
        }
    }
    None
}

/// State of the section scanner.
enum SectionState {
    Idle,
    InSection,
}

/// Extract the content of a `## name` section, up to the next `##` header.
///
/// Unterminated sections extend to end of input. Header matching is
/// case-insensitive.
fn section(text: &str, name: &str) -> Option<String> {
    let wanted = name.to_ascii_lowercase();
    let mut state = SectionState::Idle;
    let mut collected: Vec<&str> = Vec::new();

    for line in text.lines() {
        let header = line.trim_start().strip_prefix("##").map(str::trim);
        match (&state, header) {
            (SectionState::Idle, Some(title)) if title.to_ascii_lowercase() == wanted => {
                state = SectionState::InSection;
            }
            (SectionState::Idle, _) => {}
            (SectionState::InSection, Some(_)) => break,
            (SectionState::InSection, None) => collected.push(line),
        }
    }

    match state {
        SectionState::Idle => None,
        SectionState::InSection => Some(collected.join("\n").trim().to_string()),
    }
}

/// Parse a comma-separated, newline-separated, or markdown-bulleted list.
fn parse_list(s: &str) -> Vec<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed.contains(',') && !trimmed.contains('\n') {
        return trimmed
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect();
    }
    trimmed
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let item = line
                .strip_prefix('-')
                .or_else(|| line.strip_prefix('*'))
                .unwrap_or(line)
                .trim();
            (!item.is_empty()).then(|| item.to_string())
        })
        .collect()
}

fn parse_percent(value: Option<&str>) -> Option<u8> {
    value?.trim().trim_end_matches('%').trim().parse().ok()
}

fn is_pass(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_uppercase()).as_deref(),
        Some("PASS") | Some("TRUE") | Some("YES") | Some("OK")
    )
}

fn first_nonempty_line(body: &str) -> String {
    body.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
#[path = "mail_tests.rs"]
mod tests;
