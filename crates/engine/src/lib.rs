// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ao-engine: the knowledge flywheel and agent farm runtime.

pub mod consensus;
pub mod env;
pub mod extractor;
pub mod farm;
pub mod feedback;
pub mod forge;
pub mod mailbox;
pub mod maturity;
pub mod metrics;
pub mod queue;
pub mod retriever;
pub mod spawn;
pub mod witness;

pub use consensus::{Consensus, SynthesisResult};
pub use extractor::{Detection, Detector, Extractor};
pub use farm::{FarmConfig, FarmError, FarmSupervisor};
pub use feedback::{FeedbackLoop, FeedbackSummary, OutcomeRewardSource, RewardSource};
pub use forge::{BatchOutcome, Forge, ForgeError, ForgeOutcome, SessionSummary};
pub use mailbox::{InboxFilter, Mailbox};
pub use maturity::{MaturityEngine, TransitionResult};
pub use metrics::{FlywheelMetrics, MetricsEngine, UtilityStats};
pub use queue::{Issue, IssueQueue};
pub use retriever::{Injection, RetrievedLearning, Retriever};
pub use spawn::SpawnTuning;
pub use witness::Witness;
