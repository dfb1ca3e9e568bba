// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Disk-space probe used by farm pre-flight.

use std::path::Path;
use tokio::process::Command;

/// Available disk space at a path, in bytes.
///
/// Returns `None` when the probe fails; pre-flight treats that as a
/// warning, never a failure.
pub async fn available_disk_space(path: &Path) -> Option<u64> {
    let output = Command::new("df")
        .arg("-k")
        .arg(path)
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let data_line = stdout.lines().nth(1)?;
    let fields: Vec<&str> = data_line.split_whitespace().collect();
    // Field 3 is available space in KB
    let kb: u64 = fields.get(3)?.parse().ok()?;
    Some(kb * 1024)
}

#[cfg(test)]
#[path = "disk_tests.rs"]
mod tests;
