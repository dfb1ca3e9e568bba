// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transcript forge: streams line-delimited transcripts through a
//! producer/consumer pair and extracts typed knowledge candidates.
//!
//! The producer reads and decodes lines; the consumer folds records into a
//! session accumulator. Records arrive in file order; malformed lines are
//! skipped; an empty file yields an empty session, not an error.

use crate::extractor::{snippet, Extractor, SNIPPET_MAX_LENGTH};
use ao_core::knowledge::{content_key, Candidate, KnowledgeType, Source};
use ao_core::{SessionId, TranscriptRecord};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Bound of the producer→consumer channel.
const CHANNEL_CAPACITY: usize = 256;

/// Rough characters-per-token estimate for session token accounting.
const CHARS_PER_TOKEN: u64 = 4;

#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("open transcript {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("read transcript: {0}")]
    Read(#[from] std::io::Error),
}

/// Accumulated metadata for one forged session.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SessionSummary {
    pub session_id: Option<SessionId>,
    pub date: Option<DateTime<Utc>>,
    pub summary: String,
    pub decisions: Vec<String>,
    pub knowledge: Vec<String>,
    pub files_changed: Vec<String>,
    pub issues: Vec<String>,
    pub tool_counts: BTreeMap<String, u32>,
    pub lines: u64,
    pub tokens_estimated: u64,
}

/// Result of forging one transcript.
#[derive(Debug, Clone, Default)]
pub struct ForgeOutcome {
    pub session: SessionSummary,
    pub candidates: Vec<Candidate>,
}

/// Result of forging a batch of transcripts.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub sessions: Vec<SessionSummary>,
    pub candidates: Vec<Candidate>,
    pub files: usize,
    pub duplicates: usize,
}

/// The transcript forge.
#[derive(Default)]
pub struct Forge {
    extractor: Extractor,
}

impl Forge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forge a single transcript file.
    pub async fn process_transcript(&self, path: &Path) -> Result<ForgeOutcome, ForgeError> {
        let mut seen = HashSet::new();
        let (outcome, _) = self.process_with_dedup(path, &mut seen).await?;
        Ok(outcome)
    }

    /// Forge a batch of transcripts with cross-session deduplication.
    ///
    /// The first occurrence of a normalized content key wins; later
    /// occurrences count as duplicates.
    pub async fn process_batch(&self, paths: &[PathBuf]) -> Result<BatchOutcome, ForgeError> {
        let mut batch = BatchOutcome {
            files: paths.len(),
            ..BatchOutcome::default()
        };
        let mut seen = HashSet::new();

        for path in paths {
            match self.process_with_dedup(path, &mut seen).await {
                Ok((outcome, duplicates)) => {
                    batch.duplicates += duplicates;
                    batch.candidates.extend(outcome.candidates);
                    batch.sessions.push(outcome.session);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping transcript");
                }
            }
        }
        Ok(batch)
    }

    async fn process_with_dedup(
        &self,
        path: &Path,
        seen: &mut HashSet<String>,
    ) -> Result<(ForgeOutcome, usize), ForgeError> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|source| ForgeError::Open {
                path: path.display().to_string(),
                source,
            })?;
        let file_size = file.metadata().await.map(|m| m.len()).unwrap_or(0);

        // Producer: decode lines into records. Closing the channel drains
        // the consumer cleanly.
        let (tx, mut rx) = mpsc::channel::<TranscriptRecord>(CHANNEL_CAPACITY);
        let reader_path = path.to_path_buf();
        let producer = tokio::spawn(async move {
            let mut lines = BufReader::new(file).lines();
            let mut read = 0u64;
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        read += 1;
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<TranscriptRecord>(trimmed) {
                            Ok(record) => {
                                if tx.send(record).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::debug!(
                                    path = %reader_path.display(),
                                    line = read,
                                    error = %e,
                                    "skipping malformed transcript line"
                                );
                            }
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(path = %reader_path.display(), error = %e, "transcript read stopped");
                        break;
                    }
                }
            }
            read
        });

        // Consumer: fold records in file order.
        let mut session = SessionSummary::default();
        let mut candidates = Vec::new();
        let mut duplicates = 0usize;
        let mut files_seen = HashSet::new();
        let mut issues_seen = HashSet::new();
        let mut index = 0u64;

        while let Some(record) = rx.recv().await {
            index += 1;
            self.fold_meta(&mut session, &record);
            duplicates += self.extract_candidates(
                path,
                &record,
                index,
                seen,
                &mut session,
                &mut candidates,
            );
            fold_tools(&record, &mut session, &mut files_seen);
            fold_issue_refs(&record.content, &mut session, &mut issues_seen);
        }

        session.lines = producer.await.unwrap_or(0);
        session.tokens_estimated = file_size / CHARS_PER_TOKEN;
        session.summary = summarize(&session);

        Ok((
            ForgeOutcome {
                session,
                candidates,
            },
            duplicates,
        ))
    }

    fn fold_meta(&self, session: &mut SessionSummary, record: &TranscriptRecord) {
        if session.session_id.is_none() && !record.session_id.is_empty() {
            session.session_id = Some(SessionId::new(record.session_id.clone()));
        }
        if let Some(ts) = record.timestamp {
            // Session date is the earliest timestamp observed.
            if session.date.map_or(true, |current| ts < current) {
                session.date = Some(ts);
            }
        }
    }

    fn extract_candidates(
        &self,
        path: &Path,
        record: &TranscriptRecord,
        index: u64,
        seen: &mut HashSet<String>,
        session: &mut SessionSummary,
        candidates: &mut Vec<Candidate>,
    ) -> usize {
        let mut duplicates = 0;
        for detection in self.extractor.detect(&record.content) {
            let text = snippet(&record.content, detection.start, SNIPPET_MAX_LENGTH);
            if text.is_empty() {
                continue;
            }
            let key = content_key(&text);
            if !seen.insert(key.clone()) {
                duplicates += 1;
                continue;
            }

            match detection.kind {
                KnowledgeType::Decision => session.decisions.push(text.clone()),
                KnowledgeType::Solution | KnowledgeType::Learning => {
                    session.knowledge.push(text.clone())
                }
                _ => {}
            }

            let id = format!("cand-{}", &key[..12]);
            let mut candidate = Candidate::new(
                id,
                detection.kind,
                text,
                Source {
                    transcript_path: path.display().to_string(),
                    message_index: index,
                    timestamp: record.timestamp,
                    session_id: record.session_id.clone(),
                },
                record.timestamp.unwrap_or_else(Utc::now),
            );
            candidate.confidence = 0.5;
            candidates.push(candidate);
        }
        duplicates
    }
}

fn fold_tools(
    record: &TranscriptRecord,
    session: &mut SessionSummary,
    files_seen: &mut HashSet<String>,
) {
    for tool in &record.tools {
        if !tool.name.is_empty() {
            *session.tool_counts.entry(tool.name.clone()).or_insert(0) += 1;
        }
        if let Some(path) = tool.file_path() {
            if files_seen.insert(path.to_string()) {
                session.files_changed.push(path.to_string());
            }
        }
    }
}

fn fold_issue_refs(
    content: &str,
    session: &mut SessionSummary,
    issues_seen: &mut HashSet<String>,
) {
    for capture in issue_id_re().find_iter(content) {
        let id = capture.as_str().to_string();
        if issues_seen.insert(id.clone()) {
            session.issues.push(id);
        }
    }
}

#[allow(clippy::expect_used)]
fn issue_id_re() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r"\b[a-z]{2,3}-[a-z0-9]{3,7}(?:-[a-z0-9]+)?\b")
            .expect("static pattern")
    })
}

fn summarize(session: &SessionSummary) -> String {
    let date = session
        .date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown date".to_string());
    if session.decisions.is_empty() && session.knowledge.is_empty() {
        return format!("Session {date}: no knowledge extracted");
    }
    let lead = session
        .decisions
        .first()
        .or_else(|| session.knowledge.first())
        .cloned()
        .unwrap_or_default();
    format!(
        "Session {date}: {} decisions, {} insights. {lead}",
        session.decisions.len(),
        session.knowledge.len()
    )
}

#[cfg(test)]
#[path = "forge_tests.rs"]
mod tests;
