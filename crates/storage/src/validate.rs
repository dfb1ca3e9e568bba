// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structural validation of step artifacts and tier promotions.
//!
//! Strict mode fails on missing markers. Lenient mode downgrades the
//! schema-version requirement to a warning until an expiry date, after
//! which lenient escalates back to failure.

use ao_core::ratchet::{ArtifactTier, Step};
use chrono::{DateTime, Duration, Utc};
use std::path::Path;
use thiserror::Error;

/// Marker lines that satisfy the schema-version requirement.
const SCHEMA_MARKERS: [&str; 2] = ["**Schema Version:**", "schema_version:"];

/// Days before lenient expiry at which results flag "expiring soon".
const EXPIRY_WARNING_DAYS: i64 = 14;

#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Options controlling strict/lenient validation.
#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    pub lenient: bool,
    pub lenient_expiry: Option<DateTime<Utc>>,
}

/// Outcome of validating one artifact.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub lenient: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lenient_expiry: Option<DateTime<Utc>>,
    pub expiring_soon: bool,
}

impl ValidationResult {
    fn clean(lenient: bool) -> Self {
        Self {
            valid: true,
            issues: Vec::new(),
            warnings: Vec::new(),
            lenient,
            lenient_expiry: None,
            expiring_soon: false,
        }
    }
}

/// Validates artifacts against per-step structural requirements.
#[derive(Debug, Clone, Default)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    /// Validate an artifact file for a step.
    pub fn validate(
        &self,
        step: Step,
        artifact: &Path,
        opts: &ValidateOptions,
        now: DateTime<Utc>,
    ) -> Result<ValidationResult, ValidateError> {
        let content = std::fs::read_to_string(artifact).map_err(|source| ValidateError::Read {
            path: artifact.display().to_string(),
            source,
        })?;

        let mut result = ValidationResult::clean(opts.lenient);

        self.check_schema_version(&content, opts, now, &mut result);

        if artifact.extension().and_then(|e| e.to_str()) == Some("json") {
            self.check_json_artifact(step, &content, &mut result);
        } else {
            for section in required_sections(step) {
                if !has_section(&content, section) {
                    result
                        .issues
                        .push(format!("missing required section: ## {section}"));
                }
            }
        }

        result.valid = result.issues.is_empty();
        Ok(result)
    }

    /// Validate the requirements for promoting an artifact to a tier.
    ///
    /// `citations` and `sessions` are supplied by the caller from the
    /// citation log.
    pub fn validate_for_promotion(
        &self,
        artifact: &Path,
        tier: ArtifactTier,
        citations: usize,
        sessions: usize,
    ) -> Result<ValidationResult, ValidateError> {
        let mut result = ValidationResult::clean(false);

        if !artifact.exists() {
            result
                .issues
                .push(format!("artifact not found: {}", artifact.display()));
            result.valid = false;
            return Ok(result);
        }

        match tier {
            ArtifactTier::Observation => {}
            ArtifactTier::Learning => {
                if citations < 2 {
                    result
                        .issues
                        .push(format!("tier 1 requires 2+ citations, found {citations}"));
                }
            }
            ArtifactTier::Pattern => {
                if sessions < 3 {
                    result
                        .issues
                        .push(format!("tier 2 requires 3+ sessions, found {sessions}"));
                }
            }
            ArtifactTier::Skill => {
                let content =
                    std::fs::read_to_string(artifact).map_err(|source| ValidateError::Read {
                        path: artifact.display().to_string(),
                        source,
                    })?;
                if !content.contains("# ") {
                    result
                        .issues
                        .push("tier 3 requires a titled skill document".to_string());
                }
            }
            ArtifactTier::Core => {
                if citations < 10 {
                    result
                        .issues
                        .push(format!("tier 4 requires 10+ citations, found {citations}"));
                }
            }
        }

        result.valid = result.issues.is_empty();
        Ok(result)
    }

    fn check_schema_version(
        &self,
        content: &str,
        opts: &ValidateOptions,
        now: DateTime<Utc>,
        result: &mut ValidationResult,
    ) {
        let has_marker = SCHEMA_MARKERS.iter().any(|m| content.contains(m));
        if has_marker {
            return;
        }

        if !opts.lenient {
            result
                .issues
                .push("missing schema version marker".to_string());
            return;
        }

        match opts.lenient_expiry {
            Some(expiry) if now > expiry => {
                result.issues.push(format!(
                    "missing schema version marker (lenient bypass expired {})",
                    expiry.format("%Y-%m-%d")
                ));
            }
            Some(expiry) => {
                result.lenient_expiry = Some(expiry);
                result.expiring_soon = expiry - now <= Duration::days(EXPIRY_WARNING_DAYS);
                result.warnings.push(format!(
                    "missing schema version marker (lenient until {})",
                    expiry.format("%Y-%m-%d")
                ));
            }
            None => {
                result
                    .warnings
                    .push("missing schema version marker (lenient)".to_string());
            }
        }
    }

    fn check_json_artifact(&self, step: Step, content: &str, result: &mut ValidationResult) {
        match serde_json::from_str::<serde_json::Value>(content) {
            Ok(value) => {
                if step == Step::Vibe && value.get("verdict").is_none() {
                    result
                        .issues
                        .push("synthesis result missing verdict".to_string());
                }
            }
            Err(e) => result.issues.push(format!("invalid JSON artifact: {e}")),
        }
    }
}

/// Sections an artifact must carry per step. Markdown artifacts only.
fn required_sections(step: Step) -> &'static [&'static str] {
    match step {
        Step::Research => &["Findings", "Sources"],
        Step::PreMortem => &["Risks"],
        Step::Formulate => &["Overview"],
        Step::PostMortem => &["Learnings"],
        _ => &[],
    }
}

fn has_section(content: &str, name: &str) -> bool {
    let wanted = name.to_ascii_lowercase();
    content.lines().any(|line| {
        line.trim_start()
            .strip_prefix("##")
            .map(str::trim)
            .map(|title| title.to_ascii_lowercase() == wanted)
            .unwrap_or(false)
    })
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
