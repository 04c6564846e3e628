// src/plan/node.rs

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::PlanError;
use crate::plan::status::{self, NodeStatus};
use crate::remote::{OperationClient, OperationHandle};
use crate::steps::{Step, StepRegistry, WorkItem};

/// Scheduling state for one work item.
///
/// Invariants:
/// - `current_operation` is `None` iff the node has never been triggered
///   or is fully complete; there is never more than one in-flight
///   operation per node.
/// - `steps_to_run` is always the untouched suffix of the kind's fixed
///   sequence; the whole suffix advances by exactly one element per
///   trigger, never reordered or skipped.
/// - `operations` is append-only history; entries are only ever replaced
///   in place when a poll observes a state change.
///
/// All transitions return a new node value. Nothing here mutates shared
/// state, which is what makes the planner safe to reason about as a
/// sequence of immutable snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
    pub name: String,
    pub work_item: WorkItem,
    pub priority: u32,
    pub status: NodeStatus,
    pub current_step: Option<Step>,
    pub steps_to_run: Vec<Step>,
    pub current_operation: Option<OperationHandle>,
    pub operations: Vec<OperationHandle>,
}

impl PlanNode {
    pub fn new(work_item: WorkItem, priority: u32, status: NodeStatus) -> Self {
        Self {
            name: work_item.name.clone(),
            work_item,
            priority,
            status,
            current_step: None,
            steps_to_run: Vec::new(),
            current_operation: None,
            operations: Vec::new(),
        }
    }

    /// A copy of this node with a different status. Used by plan
    /// propagation (blocking/unblocking); the step machinery is untouched.
    pub fn with_status(&self, status: NodeStatus) -> Self {
        let mut node = self.clone();
        node.status = status;
        node
    }

    /// Advance this node by exactly one step and trigger it remotely.
    ///
    /// The first call pops the head of the kind's full step sequence (the
    /// `train` flag picks the sequence variant); later calls pop the head
    /// of `steps_to_run`. The returned handle becomes the current
    /// operation and joins the history, and the status is recomputed from
    /// the full history. This is the only place remote work is started.
    pub async fn run_next_step(
        &self,
        registry: &StepRegistry,
        train: bool,
    ) -> anyhow::Result<PlanNode> {
        let mut node = self.clone();

        let step = match node.current_step {
            None => {
                let sequence = StepRegistry::sequence(node.work_item.kind, train);
                let (head, rest) = sequence
                    .split_first()
                    .ok_or_else(|| PlanError::NoStepsRemaining(node.name.clone()))?;
                node.steps_to_run = rest.to_vec();
                *head
            }
            Some(_) => {
                if node.steps_to_run.is_empty() {
                    return Err(PlanError::NoStepsRemaining(node.name.clone()).into());
                }
                node.steps_to_run.remove(0)
            }
        };
        node.current_step = Some(step);

        debug!(work_item = %node.name, step = %step, "triggering step");
        let trigger = registry.trigger_for(node.work_item.kind, step)?;
        let mut handles = trigger.trigger(&node.work_item, step, true).await?;
        if handles.len() != 1 {
            return Err(PlanError::TriggerContract {
                work_item: node.name.clone(),
                step,
                returned: handles.len(),
            }
            .into());
        }
        let handle = handles.remove(0);

        node.operations.push(handle.clone());
        node.current_operation = Some(handle);
        node.status = node.reduced_status();
        Ok(node)
    }

    /// Re-poll the current operation and fold any state change in.
    ///
    /// A node with no current operation is returned unchanged, so a status
    /// forced from outside (e.g. `Blocked` set by propagation) sticks. A
    /// current operation in a terminal state is not re-polled; terminal
    /// states never change, so the round trip would be wasted. If the
    /// polled state matches the previous snapshot the node is likewise
    /// unchanged; otherwise the handle is replaced in the history and the
    /// status recomputed.
    pub async fn poll<C>(&self, client: &C) -> anyhow::Result<PlanNode>
    where
        C: OperationClient + ?Sized,
    {
        let Some(current) = &self.current_operation else {
            return Ok(self.clone());
        };
        if current.state.is_terminal() {
            return Ok(self.clone());
        }

        let polled = client.poll(current).await?;
        if polled.state == current.state {
            return Ok(self.clone());
        }

        debug!(
            work_item = %self.name,
            operation = %polled.id,
            from = %current.state,
            to = %polled.state,
            "operation changed state"
        );

        let mut node = self.clone();
        for op in node.operations.iter_mut() {
            if op.id == polled.id {
                *op = polled.clone();
            }
        }
        node.current_operation = Some(polled);
        node.status = node.reduced_status();
        Ok(node)
    }

    /// Current status as derived from the operation history; the stored
    /// status passes through while the history is empty.
    pub fn reduced_status(&self) -> NodeStatus {
        status::reduce_operations(&self.operations, &self.steps_to_run).unwrap_or(self.status)
    }
}
