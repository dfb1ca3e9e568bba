// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Consensus rules for multi-agent validation findings and the
//! hierarchical synthesis that merges them into a verdict.

use ao_core::{Finding, PodResult, Severity};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Consensus rules with their standard thresholds.
#[derive(Debug, Clone)]
pub struct Consensus {
    /// Minimum agreement for HIGH findings (fraction of agents).
    pub quorum_threshold: f64,
    /// Single-veto rule: any CRITICAL forces a CRITICAL verdict.
    pub veto_on_critical: bool,
    /// Drop low-severity findings when context is tight.
    pub drop_low_on_context_pressure: bool,
    /// Pods that must independently report the same CRITICAL before
    /// synthesis terminates early.
    pub early_termination_pods: usize,
}

impl Default for Consensus {
    fn default() -> Self {
        Self {
            quorum_threshold: 0.70,
            veto_on_critical: true,
            drop_low_on_context_pressure: true,
            early_termination_pods: 3,
        }
    }
}

/// Final synthesized result for a plan.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SynthesisResult {
    pub plan_id: String,
    pub verdict: Severity,
    pub grade: String,
    pub findings: Vec<Finding>,
    pub critical_count: usize,
    pub high_count: usize,
    pub medium_count: usize,
    pub low_count: usize,
    pub summary: String,
    pub early_terminated: bool,
    pub completed_at: DateTime<Utc>,
}

impl Consensus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group key for "the same finding": category plus normalized title.
    fn finding_key(finding: &Finding) -> String {
        let title = finding
            .title
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        format!("{}:{}", finding.category.to_lowercase(), title)
    }

    /// Merge duplicate findings: max severity wins, files and lines union,
    /// confidence averages, sources concatenate.
    pub fn deduplicate(&self, findings: Vec<Finding>) -> Vec<Finding> {
        let mut groups: BTreeMap<String, Vec<Finding>> = BTreeMap::new();
        for finding in findings {
            groups
                .entry(Self::finding_key(&finding))
                .or_default()
                .push(finding);
        }

        let mut merged: Vec<Finding> = groups.into_values().map(merge_group).collect();
        merged.sort_by(|a, b| b.severity.rank().cmp(&a.severity.rank()));
        merged
    }

    /// Single-veto verdict: any CRITICAL finding forces CRITICAL.
    pub fn verdict(&self, findings: &[Finding]) -> Severity {
        if self.veto_on_critical
            && findings.iter().any(|f| f.severity == Severity::Critical)
        {
            return Severity::Critical;
        }
        findings
            .iter()
            .map(|f| f.severity)
            .max_by_key(Severity::rank)
            .unwrap_or(Severity::Pass)
    }

    /// Apply quorum rules at the cluster level.
    ///
    /// HIGH needs >= 70% agreement else demotes to MEDIUM; MEDIUM needs
    /// >= 50% else demotes to LOW; LOW needs two sources else drops.
    /// CRITICAL always passes.
    pub fn apply_quorum(&self, findings: Vec<Finding>, total_agents: usize) -> Vec<Finding> {
        if total_agents == 0 {
            return findings;
        }

        let mut groups: BTreeMap<String, Vec<Finding>> = BTreeMap::new();
        for finding in findings {
            groups
                .entry(Self::finding_key(&finding))
                .or_default()
                .push(finding);
        }

        let mut result = Vec::new();
        for group in groups.into_values() {
            let agreement = group.len() as f64 / total_agents as f64;
            let count = group.len();
            let mut merged = merge_group(group);
            match merged.severity {
                Severity::Critical => result.push(merged),
                Severity::High => {
                    if agreement < self.quorum_threshold {
                        merged.severity = Severity::Medium;
                    }
                    result.push(merged);
                }
                Severity::Medium => {
                    if agreement < 0.5 {
                        merged.severity = Severity::Low;
                    }
                    result.push(merged);
                }
                Severity::Low => {
                    if count >= 2 {
                        result.push(merged);
                    }
                }
                Severity::Pass => result.push(merged),
            }
        }

        result.sort_by(|a, b| b.severity.rank().cmp(&a.severity.rank()));
        result
    }

    /// Drop findings under context pressure. The more restrictive rule is
    /// tested first: at >= 0.8 usage only CRITICAL and HIGH survive; at
    /// >= 0.6 LOW is dropped.
    pub fn filter_by_context_budget(
        &self,
        findings: Vec<Finding>,
        context_usage: f64,
    ) -> Vec<Finding> {
        if !self.drop_low_on_context_pressure {
            return findings;
        }
        if context_usage >= 0.8 {
            return findings
                .into_iter()
                .filter(|f| matches!(f.severity, Severity::Critical | Severity::High))
                .collect();
        }
        if context_usage >= 0.6 {
            return findings
                .into_iter()
                .filter(|f| f.severity != Severity::Low)
                .collect();
        }
        findings
    }

    /// Early termination: true when enough pods independently report the
    /// same CRITICAL finding. Returns the finding key.
    pub fn check_early_termination(&self, pods: &[PodResult]) -> Option<String> {
        let mut critical_pods: BTreeMap<String, usize> = BTreeMap::new();
        for pod in pods {
            let mut seen_in_pod = std::collections::BTreeSet::new();
            for finding in &pod.findings {
                if finding.severity == Severity::Critical {
                    let key = Self::finding_key(finding);
                    if seen_in_pod.insert(key.clone()) {
                        *critical_pods.entry(key).or_insert(0) += 1;
                    }
                }
            }
        }
        critical_pods
            .into_iter()
            .find(|(_, pods)| *pods >= self.early_termination_pods)
            .map(|(key, _)| key)
    }

    /// Letter grade for a verdict.
    pub fn grade(&self, verdict: Severity, critical_count: usize, high_count: usize) -> &'static str {
        match verdict {
            Severity::Pass => "A",
            Severity::Low => "A-",
            Severity::Medium => "B",
            Severity::High => {
                if high_count > 3 {
                    "D"
                } else {
                    "C"
                }
            }
            Severity::Critical => {
                if critical_count > 1 {
                    "F"
                } else {
                    "D"
                }
            }
        }
    }

    /// Full synthesis: merge pod findings, check early termination, apply
    /// dedup and verdict rules, and grade the result.
    pub fn synthesize(
        &self,
        plan_id: &str,
        pods: &[PodResult],
        now: DateTime<Utc>,
    ) -> SynthesisResult {
        if let Some(key) = self.check_early_termination(pods) {
            let matching: Vec<Finding> = pods
                .iter()
                .flat_map(|p| p.findings.iter())
                .filter(|f| {
                    f.severity == Severity::Critical && Self::finding_key(f) == key
                })
                .cloned()
                .collect();
            let findings = self.deduplicate(matching);
            let critical_count = findings.len();
            return SynthesisResult {
                plan_id: plan_id.to_string(),
                verdict: Severity::Critical,
                grade: self.grade(Severity::Critical, critical_count, 0).to_string(),
                summary: format!(
                    "early termination: {} pods agree on a critical finding",
                    self.early_termination_pods
                ),
                findings,
                critical_count,
                high_count: 0,
                medium_count: 0,
                low_count: 0,
                early_terminated: true,
                completed_at: now,
            };
        }

        let all: Vec<Finding> = pods.iter().flat_map(|p| p.findings.clone()).collect();
        let merged = self.deduplicate(all);

        let critical_count = count(&merged, Severity::Critical);
        let high_count = count(&merged, Severity::High);
        let medium_count = count(&merged, Severity::Medium);
        let low_count = count(&merged, Severity::Low);

        let verdict = self.verdict(&merged);
        let grade = self.grade(verdict, critical_count, high_count).to_string();
        let summary = format!(
            "{} findings: {} critical, {} high, {} medium, {} low",
            merged.len(),
            critical_count,
            high_count,
            medium_count,
            low_count
        );

        SynthesisResult {
            plan_id: plan_id.to_string(),
            verdict,
            grade,
            findings: merged,
            critical_count,
            high_count,
            medium_count,
            low_count,
            summary,
            early_terminated: false,
            completed_at: now,
        }
    }
}

fn count(findings: &[Finding], severity: Severity) -> usize {
    findings.iter().filter(|f| f.severity == severity).count()
}

fn merge_group(group: Vec<Finding>) -> Finding {
    let mut best = group
        .iter()
        .max_by_key(|f| f.severity.rank())
        .cloned()
        .unwrap_or_default();

    let mut files: Vec<String> = Vec::new();
    let mut lines: Vec<u32> = Vec::new();
    let mut sources: Vec<String> = Vec::new();
    let mut confidence_sum = 0.0;

    for finding in &group {
        for file in &finding.files {
            if !files.contains(file) {
                files.push(file.clone());
            }
        }
        for line in &finding.lines {
            if !lines.contains(line) {
                lines.push(*line);
            }
        }
        if !finding.source.is_empty() && !sources.contains(&finding.source) {
            sources.push(finding.source.clone());
        }
        confidence_sum += finding.confidence;
    }

    lines.sort_unstable();
    best.files = files;
    best.lines = lines;
    best.source = sources.join("+");
    if !group.is_empty() {
        best.confidence = confidence_sum / group.len() as f64;
    }
    best
}

#[cfg(test)]
#[path = "consensus_tests.rs"]
mod tests;
