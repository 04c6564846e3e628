// src/plan/snapshot.rs

//! Read-only plan snapshots for logging and diagnostics.
//!
//! When a snapshot directory is configured, every scheduling round writes
//! one JSON file:
//! an ordered list of `{name, status, priority}` entries, one per plan
//! node, with the status as its enum ordinal. The scheduler never reads
//! these back.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::plan::planner::Planner;

/// One plan node as it appears in a snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotEntry {
    pub name: String,
    /// Ordinal of the node's [`crate::plan::NodeStatus`].
    pub status: i8,
    pub priority: u32,
}

/// Snapshot entries for the current plan, in name order.
pub fn entries(planner: &Planner) -> Vec<SnapshotEntry> {
    planner
        .nodes()
        .map(|node| SnapshotEntry {
            name: node.name.clone(),
            status: node.status.ordinal(),
            priority: node.priority,
        })
        .collect()
}

/// Write a timestamped snapshot file into `dir`, creating the directory
/// if needed. Returns the path written.
pub fn write_snapshot(planner: &Planner, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("creating snapshot directory {:?}", dir))?;

    let stamp = Utc::now().format("%Y-%m-%dT%H-%M-%S%.3f");
    let path = dir.join(format!("plan_{stamp}.json"));
    let json = serde_json::to_string_pretty(&entries(planner))?;
    fs::write(&path, json).with_context(|| format!("writing plan snapshot to {:?}", path))?;
    Ok(path)
}
