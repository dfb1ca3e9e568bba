// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ratchet chain entries and the lifecycle step ladder.
//!
//! Each locked entry is a commitment that cannot be walked back; later
//! steps gate on earlier locked entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle steps, in gate order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    Research,
    PreMortem,
    Plan,
    Formulate,
    Implement,
    Crank,
    Vibe,
    PostMortem,
    /// Tier promotion entries, outside the step ladder.
    Promotion,
}

impl Step {
    /// All ladder steps, in order. Excludes [`Step::Promotion`].
    pub fn ladder() -> &'static [Step] {
        &[
            Step::Research,
            Step::PreMortem,
            Step::Plan,
            Step::Formulate,
            Step::Implement,
            Step::Crank,
            Step::Vibe,
            Step::PostMortem,
        ]
    }

    /// Parse a step name, accepting the documented aliases.
    pub fn parse(name: &str) -> Option<Step> {
        match name.trim().to_ascii_lowercase().as_str() {
            "research" => Some(Step::Research),
            "pre-mortem" | "premortem" => Some(Step::PreMortem),
            "plan" => Some(Step::Plan),
            "formulate" => Some(Step::Formulate),
            "implement" => Some(Step::Implement),
            "crank" | "autopilot" => Some(Step::Crank),
            "vibe" | "validate" | "review" => Some(Step::Vibe),
            "post-mortem" | "postmortem" | "retro" => Some(Step::PostMortem),
            "promotion" => Some(Step::Promotion),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Research => "research",
            Step::PreMortem => "pre-mortem",
            Step::Plan => "plan",
            Step::Formulate => "formulate",
            Step::Implement => "implement",
            Step::Crank => "crank",
            Step::Vibe => "vibe",
            Step::PostMortem => "post-mortem",
            Step::Promotion => "promotion",
        }
    }

    /// The step whose locked output gates this one.
    pub fn prerequisite(&self) -> Option<Step> {
        match self {
            Step::Research => None,
            Step::PreMortem => Some(Step::Research),
            Step::Plan => Some(Step::Research),
            Step::Formulate => Some(Step::Plan),
            Step::Implement => Some(Step::Plan),
            Step::Crank => Some(Step::Implement),
            Step::Vibe => Some(Step::Implement),
            Step::PostMortem => Some(Step::Vibe),
            Step::Promotion => None,
        }
    }

    /// Steps that may be skipped without breaking downstream gates.
    pub fn skippable(&self) -> bool {
        matches!(self, Step::PreMortem | Step::Crank)
    }

    /// Glob pattern of the artifact this step is expected to produce,
    /// relative to an artifact root. `None` for steps whose output is an
    /// external reference (`epic:`/`issue:` ids).
    pub fn expected_output(&self) -> Option<&'static str> {
        match self {
            Step::Research => Some("research/*.md"),
            Step::PreMortem => Some("premortems/*.md"),
            Step::Plan => None,
            Step::Formulate => Some("specs/*.md"),
            Step::Implement => None,
            Step::Crank => None,
            Step::Vibe => Some("ao/findings/*/result.json"),
            Step::PostMortem => Some("retros/*.md"),
            Step::Promotion => None,
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived status of a step, from the latest chain entry for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    InProgress,
    Locked,
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress => "in_progress",
            StepStatus::Locked => "locked",
            StepStatus::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Artifact tier ladder for promotions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ArtifactTier {
    Observation,
    Learning,
    Pattern,
    Skill,
    Core,
}

impl ArtifactTier {
    pub fn from_index(index: u8) -> Option<ArtifactTier> {
        match index {
            0 => Some(ArtifactTier::Observation),
            1 => Some(ArtifactTier::Learning),
            2 => Some(ArtifactTier::Pattern),
            3 => Some(ArtifactTier::Skill),
            4 => Some(ArtifactTier::Core),
            _ => None,
        }
    }

    pub fn index(&self) -> u8 {
        match self {
            ArtifactTier::Observation => 0,
            ArtifactTier::Learning => 1,
            ArtifactTier::Pattern => 2,
            ArtifactTier::Skill => 3,
            ArtifactTier::Core => 4,
        }
    }

    /// Directory this tier's artifacts live in, relative to `.agents/`.
    pub fn location(&self) -> &'static str {
        match self {
            ArtifactTier::Observation => "candidates",
            ArtifactTier::Learning => "learnings",
            ArtifactTier::Pattern => "patterns",
            ArtifactTier::Skill => "skills",
            ArtifactTier::Core => "core",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ArtifactTier::Observation => "observation",
            ArtifactTier::Learning => "learning",
            ArtifactTier::Pattern => "pattern",
            ArtifactTier::Skill => "skill",
            ArtifactTier::Core => "core",
        }
    }
}

impl From<ArtifactTier> for u8 {
    fn from(tier: ArtifactTier) -> u8 {
        tier.index()
    }
}

impl TryFrom<u8> for ArtifactTier {
    type Error = String;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        ArtifactTier::from_index(index).ok_or_else(|| format!("tier out of range: {}", index))
    }
}

impl std::fmt::Display for ArtifactTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.index(), self.label())
    }
}

/// One appended record of the ratchet chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainEntry {
    pub step: Step,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<ArtifactTier>,
    pub locked: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ChainEntry {
    pub fn recorded(step: Step, output: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            step,
            timestamp,
            input: None,
            output: output.into(),
            tier: None,
            locked: true,
            skipped: false,
            reason: None,
            location: None,
        }
    }

    pub fn skip(
        step: Step,
        reason: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            step,
            timestamp,
            input: None,
            output: String::new(),
            tier: None,
            // Skips are also locked
            locked: true,
            skipped: true,
            reason: Some(reason.into()),
            location: None,
        }
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn with_tier(mut self, tier: ArtifactTier) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn unlocked(mut self) -> Self {
        self.locked = false;
        self
    }
}

#[cfg(test)]
#[path = "ratchet_tests.rs"]
mod tests;
