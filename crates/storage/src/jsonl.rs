// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL append and replay primitives shared by every ledger.
//!
//! Files are opened O_APPEND so concurrent appenders do not clobber each
//! other at line granularity. Readers skip malformed lines and ignore a
//! trailing line with no newline (a crashed writer's partial record).

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Errors from JSONL ledger operations.
#[derive(Debug, Error)]
pub enum JsonlError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Append one record as a single line, creating parent directories.
///
/// The write is flushed and fsynced before returning.
pub fn append_record<T: Serialize>(path: &Path, record: &T) -> Result<(), JsonlError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(&line)?;
    file.sync_all()?;
    Ok(())
}

/// Read every well-formed record from a JSONL file.
///
/// A missing file yields an empty vec. Malformed lines are skipped with a
/// warning; a trailing partial line (no newline) is ignored entirely.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, JsonlError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut reader = BufReader::new(file);
    let mut records = Vec::new();
    let mut line = String::new();
    let mut line_no = 0u64;

    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::InvalidData => break,
            Err(e) => return Err(e.into()),
        }
        line_no += 1;

        if !line.ends_with('\n') {
            // Partial trailing line from an interrupted append.
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str(trimmed) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(path = %path.display(), line = line_no, error = %e, "skipping malformed line");
            }
        }
    }

    Ok(records)
}

/// Write bytes to a path via temp file + atomic rename.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    {
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(bytes)?;
        tmp.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)
}

/// Serialize a value to pretty JSON and write it atomically.
pub fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), JsonlError> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    atomic_write(path, &bytes)?;
    Ok(())
}

/// Rewrite a JSONL file from records, atomically.
pub fn rewrite_records<T: Serialize>(path: &Path, records: &[T]) -> Result<(), JsonlError> {
    let mut bytes = Vec::new();
    for record in records {
        bytes.extend(serde_json::to_vec(record)?);
        bytes.push(b'\n');
    }
    atomic_write(path, &bytes)?;
    Ok(())
}

#[cfg(test)]
#[path = "jsonl_tests.rs"]
mod tests;
