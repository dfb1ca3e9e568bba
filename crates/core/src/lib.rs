// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ao-core: Domain types for the ao knowledge flywheel and agent farm.

pub mod finding;
pub mod flywheel;
pub mod id;
pub mod knowledge;
pub mod mail;
pub mod ratchet;
pub mod transcript;

pub use finding::{Finding, PodResult, Severity};
pub use flywheel::{ema_update, CitationEvent, CitationType, FeedbackEvent};
pub use id::{CandidateId, FarmId, MessageId, PlanId, SessionId};
pub use knowledge::{
    content_key, normalize_content, parse_valid_until, Candidate, KnowledgeType, Maturity,
    Scoring, Source, Tier, DECAY_RATE_PER_WEEK, DEFAULT_ALPHA, DEFAULT_LAMBDA, INITIAL_UTILITY,
};
pub use mail::{MailParser, Message, MessageType, ParsedPayload};
pub use ratchet::{ArtifactTier, ChainEntry, Step, StepStatus};
pub use transcript::{ToolCall, TranscriptRecord};
