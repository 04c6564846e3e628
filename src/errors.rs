// src/errors.rs

//! Crate-wide error types.
//!
//! Fatal scheduling conditions get their own [`PlanError`] variants so
//! callers can distinguish e.g. a monitor timeout (resumable: the plan is
//! left in its last fully-applied state) from a contract violation by the
//! remote platform. Everything at the config/CLI boundary stays on
//! `anyhow` with context.

use std::time::Duration;

pub use anyhow::{Error, Result};

/// Errors raised by graph construction and plan execution.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// The remote platform reported an operation state this crate does not
    /// know how to map to a node status. Not retried.
    #[error("unknown remote operation state: {0:?}")]
    UnknownOperationState(String),

    /// No monitored node changed status within the wall-clock bound.
    #[error("no status change within {timeout:?} while monitoring {monitored} node(s)")]
    MonitorTimeout { timeout: Duration, monitored: usize },

    /// The dependency graph contains a cycle; tiers and closures are only
    /// defined for DAGs, so construction refuses the input outright.
    #[error("cycle detected in dependency graph involving work item '{0}'")]
    CyclicDependency(String),

    /// A graph node has no corresponding work item in the catalog handed
    /// to `Planner::from_graph`.
    #[error("work item '{0}' appears in the graph but not in the catalog")]
    UnknownWorkItem(String),

    /// The step registry has no trigger for this (kind, step) pair.
    #[error("no trigger registered for {kind:?} step {step:?}")]
    MissingTrigger {
        kind: crate::steps::WorkItemKind,
        step: crate::steps::Step,
    },

    /// A step trigger must return exactly one operation handle.
    #[error("trigger for '{work_item}' step {step:?} returned {returned} handles (expected 1)")]
    TriggerContract {
        work_item: String,
        step: crate::steps::Step,
        returned: usize,
    },

    /// `run_next_step` was called on a node with no steps left.
    #[error("work item '{0}' has no steps remaining")]
    NoStepsRemaining(String),
}
