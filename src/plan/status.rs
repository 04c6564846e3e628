// src/plan/status.rs

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::remote::{OperationHandle, OperationState};
use crate::steps::Step;

/// Scheduling status of one plan node.
///
/// The ordering is load-bearing: reducing a set of statuses by minimum
/// yields "worst wins" semantics, so any failed or cancelled operation in
/// a node's history dominates its reported status. The explicit
/// discriminants are the ordinals written into plan snapshots.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[repr(i8)]
pub enum NodeStatus {
    Failed = -2,
    Canceled = -1,
    /// An upstream node failed or was cancelled; set only by plan
    /// propagation, never from within the node itself.
    Blocked = 0,
    Planned = 1,
    /// Below the starting tier; counts as satisfied for dependents.
    Skippable = 2,
    Runnable = 3,
    /// The latest operation succeeded but steps remain.
    PendingNextStep = 4,
    Running = 5,
    Succeeded = 6,
}

impl NodeStatus {
    /// Snapshot ordinal.
    pub fn ordinal(self) -> i8 {
        self as i8
    }

    /// Map one remote operation state to a node status.
    ///
    /// `OperationState` is a closed set (unknown remote states already
    /// failed at decode time), so this mapping is total.
    pub fn from_operation_state(state: OperationState) -> NodeStatus {
        match state {
            OperationState::Pending | OperationState::Running => NodeStatus::Running,
            OperationState::Succeeded => NodeStatus::Succeeded,
            OperationState::Failed => NodeStatus::Failed,
            OperationState::Canceled | OperationState::Canceling => NodeStatus::Canceled,
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeStatus::Failed => "failed",
            NodeStatus::Canceled => "canceled",
            NodeStatus::Blocked => "blocked",
            NodeStatus::Planned => "planned",
            NodeStatus::Skippable => "skippable",
            NodeStatus::Runnable => "runnable",
            NodeStatus::PendingNextStep => "pending_next_step",
            NodeStatus::Running => "running",
            NodeStatus::Succeeded => "succeeded",
        };
        f.write_str(s)
    }
}

/// Reduce a node's operation history to a status.
///
/// Every historical handle is mapped through
/// [`NodeStatus::from_operation_state`] and the minimum (worst) wins. A
/// reduction of `Succeeded` with steps still to run reports
/// [`NodeStatus::PendingNextStep`] instead: more work remains even though
/// the latest operation finished. Returns `None` for an empty history so
/// the caller can let the node's current status pass through.
pub fn reduce_operations(operations: &[OperationHandle], steps_to_run: &[Step]) -> Option<NodeStatus> {
    let min = operations
        .iter()
        .map(|op| NodeStatus::from_operation_state(op.state))
        .min()?;
    if min == NodeStatus::Succeeded && !steps_to_run.is_empty() {
        Some(NodeStatus::PendingNextStep)
    } else {
        Some(min)
    }
}

/// Aggregate status of a whole plan; derived on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Planned,
    Running,
    Failed,
    Succeeded,
}

impl PlanStatus {
    /// Derive the aggregate status from all node statuses.
    ///
    /// Failed only once nothing is runnable or running, so independent
    /// branches keep executing after a contained failure.
    pub fn from_node_statuses<I>(statuses: I) -> PlanStatus
    where
        I: IntoIterator<Item = NodeStatus>,
    {
        let statuses: Vec<NodeStatus> = statuses.into_iter().collect();

        let any_failed = statuses.iter().any(|s| *s == NodeStatus::Failed);
        let any_active = statuses
            .iter()
            .any(|s| matches!(s, NodeStatus::Runnable | NodeStatus::Running));
        if any_failed && !any_active {
            return PlanStatus::Failed;
        }
        if statuses.iter().any(|s| *s == NodeStatus::Running) {
            return PlanStatus::Running;
        }
        if statuses
            .iter()
            .all(|s| matches!(s, NodeStatus::Succeeded | NodeStatus::Skippable))
        {
            return PlanStatus::Succeeded;
        }
        PlanStatus::Planned
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlanStatus::Planned => "planned",
            PlanStatus::Running => "running",
            PlanStatus::Failed => "failed",
            PlanStatus::Succeeded => "succeeded",
        };
        f.write_str(s)
    }
}
