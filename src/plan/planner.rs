// src/plan/planner.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::errors::PlanError;
use crate::graph::DependencyGraph;
use crate::plan::node::PlanNode;
use crate::plan::snapshot;
use crate::plan::status::{NodeStatus, PlanStatus};
use crate::remote::OperationClient;
use crate::steps::{StepRegistry, WorkItem};

/// Default wall-clock bound for the monitor wait: two days.
pub const DEFAULT_MONITOR_TIMEOUT: Duration = Duration::from_secs(2 * 24 * 60 * 60);

/// Knobs for [`Planner::execute`].
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Ceiling on remote jobs simultaneously in flight. Resuming
    /// multi-step nodes always takes precedence and may transiently exceed
    /// this.
    pub concurrency_level: usize,
    /// Sleep between polling rounds while waiting for a status change.
    pub polling_interval: Duration,
    /// Give up (fatally) if no monitored node changes status within this
    /// bound. The plan is left in its last fully-applied state.
    pub monitor_timeout: Duration,
    /// When set, write a plan snapshot into this directory after every
    /// scheduling round.
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            concurrency_level: 2,
            polling_interval: Duration::from_secs(30),
            monitor_timeout: DEFAULT_MONITOR_TIMEOUT,
            snapshot_dir: None,
        }
    }
}

/// The plan: a dependency graph plus one [`PlanNode`] per work item.
///
/// Created once from a graph and then only ever updated node-by-node;
/// every update returns a new `Planner` value. Nodes are never removed, so
/// a finished plan keeps its terminal statuses around for inspection.
#[derive(Debug, Clone)]
pub struct Planner {
    graph: DependencyGraph,
    starting_tier: u32,
    train: bool,
    plan: BTreeMap<String, PlanNode>,
}

impl Planner {
    /// Build the initial plan from a dependency graph.
    ///
    /// Each node gets priority `100 * tier + index_within_tier`, which
    /// makes submission order deterministic: earlier tiers first, then
    /// name order within a tier. Nodes below `starting_tier` start
    /// `Skippable`, nodes at it `Runnable`, everything later `Planned`.
    /// The `train` flag picks, per kind, whether the training step is part
    /// of the sequence.
    pub fn from_graph(
        graph: DependencyGraph,
        items: &BTreeMap<String, WorkItem>,
        starting_tier: u32,
        train: bool,
    ) -> Result<Planner, PlanError> {
        let mut plan = BTreeMap::new();

        for (tier, names) in graph.tiers() {
            for (index, name) in names.iter().enumerate() {
                let work_item = items
                    .get(name)
                    .cloned()
                    .ok_or_else(|| PlanError::UnknownWorkItem(name.clone()))?;
                let status = if tier < starting_tier {
                    NodeStatus::Skippable
                } else if tier == starting_tier {
                    NodeStatus::Runnable
                } else {
                    NodeStatus::Planned
                };
                let priority = 100 * tier + index as u32;
                plan.insert(name.clone(), PlanNode::new(work_item, priority, status));
            }
        }

        Ok(Planner {
            graph,
            starting_tier,
            train,
            plan,
        })
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn starting_tier(&self) -> u32 {
        self.starting_tier
    }

    pub fn train(&self) -> bool {
        self.train
    }

    pub fn nodes(&self) -> impl Iterator<Item = &PlanNode> {
        self.plan.values()
    }

    pub fn node(&self, name: &str) -> Option<&PlanNode> {
        self.plan.get(name)
    }

    /// Aggregate plan status, derived from all node statuses.
    pub fn plan_status(&self) -> PlanStatus {
        PlanStatus::from_node_statuses(self.plan.values().map(|n| n.status))
    }

    /// Fold one updated node into the plan and propagate the consequences.
    ///
    /// - `Failed` or `Canceled`: every node in the downstream closure is
    ///   blocked.
    /// - `Succeeded` or `Skippable`: each immediate successor becomes
    ///   `Runnable` once *all* of its predecessors are succeeded or
    ///   skippable. Unblocking is single-hop on purpose; a chain unblocks
    ///   one `update_plan` call at a time as each node transitions.
    /// - Anything else propagates nothing.
    pub fn update_plan(&self, node: PlanNode) -> Planner {
        let mut updated = self.clone();
        let name = node.name.clone();
        let node_status = node.status;
        info!(work_item = %name, status = %node_status, "updating plan with changed node");
        updated.plan.insert(name.clone(), node);

        match node_status {
            NodeStatus::Failed | NodeStatus::Canceled => {
                for downstream in updated.graph.downstream_closure(&name) {
                    if let Some(existing) = updated.plan.get(&downstream) {
                        debug!(work_item = %downstream, "blocking downstream node");
                        let blocked = existing.with_status(NodeStatus::Blocked);
                        updated.plan.insert(downstream, blocked);
                    }
                }
            }
            NodeStatus::Succeeded | NodeStatus::Skippable => {
                for successor in updated.graph.successors(&name) {
                    let all_satisfied = updated.graph.predecessors(&successor).iter().all(|p| {
                        updated.plan.get(p).is_some_and(|n| {
                            matches!(n.status, NodeStatus::Succeeded | NodeStatus::Skippable)
                        })
                    });
                    if all_satisfied {
                        if let Some(existing) = updated.plan.get(&successor) {
                            debug!(work_item = %successor, "all predecessors satisfied; marking runnable");
                            let runnable = existing.with_status(NodeStatus::Runnable);
                            updated.plan.insert(successor, runnable);
                        }
                    }
                }
            }
            _ => {}
        }

        updated
    }

    /// Drive the plan to completion.
    ///
    /// Each round: pick nodes to (re)submit under the concurrency ceiling,
    /// trigger them, then block until any in-flight node changes status
    /// (polling every `polling_interval`, bounded by `monitor_timeout`),
    /// and fold every change back into the plan. Loops until the plan is
    /// no longer `Planned` or `Running`.
    pub async fn execute<C>(
        self,
        registry: &StepRegistry,
        client: &C,
        options: &ExecuteOptions,
    ) -> anyhow::Result<Planner>
    where
        C: OperationClient + ?Sized,
    {
        let mut planner = self;

        loop {
            let plan_status = planner.plan_status();
            if !matches!(plan_status, PlanStatus::Planned | PlanStatus::Running) {
                info!(status = %plan_status, "plan is terminal; returning");
                return Ok(planner);
            }

            let mut by_priority: Vec<&PlanNode> = planner.plan.values().collect();
            by_priority.sort_by_key(|n| n.priority);

            let runnable: Vec<PlanNode> = by_priority
                .iter()
                .filter(|n| n.status == NodeStatus::Runnable)
                .map(|n| (*n).clone())
                .collect();
            let running: Vec<PlanNode> = by_priority
                .iter()
                .filter(|n| n.status == NodeStatus::Running)
                .map(|n| (*n).clone())
                .collect();
            let pending: Vec<PlanNode> = by_priority
                .iter()
                .filter(|n| n.status == NodeStatus::PendingNextStep)
                .map(|n| (*n).clone())
                .collect();

            info!(
                runnable = runnable.len(),
                running = running.len(),
                pending = pending.len(),
                "scheduling round"
            );

            // Pending nodes always resume; only leftover capacity goes to
            // new runnable work, lowest priority value first.
            let capacity = options.concurrency_level.saturating_sub(running.len());
            let new_slots = capacity.saturating_sub(pending.len());
            let to_submit: Vec<PlanNode> = pending
                .into_iter()
                .chain(runnable.into_iter().take(new_slots))
                .collect();

            debug!(
                submitting = ?to_submit.iter().map(|n| n.name.as_str()).collect::<Vec<_>>(),
                "submitting next steps"
            );

            let submitted = !to_submit.is_empty();
            let mut to_monitor = Vec::with_capacity(to_submit.len() + running.len());
            for node in to_submit {
                let triggered = node.run_next_step(registry, planner.train).await?;
                planner = planner.update_plan(triggered.clone());
                // A trigger can hand back an already-resolved handle. Such
                // a node has nothing in flight, so waiting on it for a
                // status change would never return; only nodes that are
                // actually running belong in the monitor set.
                if triggered.status == NodeStatus::Running {
                    to_monitor.push(triggered);
                }
            }
            to_monitor.extend(running);

            if to_monitor.is_empty() && !submitted {
                // Nothing in flight and nothing to submit, yet the plan is
                // not terminal. Returning is the only non-spinning option;
                // the caller gets the plan in its last applied state.
                warn!(status = %plan_status, "no nodes to run or monitor; returning plan as-is");
                return Ok(planner);
            }

            if !to_monitor.is_empty() {
                let changed = monitor(
                    to_monitor,
                    client,
                    options.polling_interval,
                    options.monitor_timeout,
                )
                .await?;

                for node in changed {
                    planner = planner.update_plan(node);
                }
            }

            debug!(status = %planner.plan_status(), "plan status after round");

            if let Some(dir) = &options.snapshot_dir {
                snapshot::write_snapshot(&planner, dir)?;
            }
        }
    }
}

/// Poll a set of in-flight nodes until at least one changes status.
///
/// Returns only the nodes whose status differs from the snapshot taken on
/// entry. An empty set is caller misuse (an already-terminal plan, most
/// likely) and is a warned no-op rather than an error.
async fn monitor<C>(
    nodes: Vec<PlanNode>,
    client: &C,
    polling_interval: Duration,
    timeout: Duration,
) -> anyhow::Result<Vec<PlanNode>>
where
    C: OperationClient + ?Sized,
{
    if nodes.is_empty() {
        warn!("monitor called with no nodes; nothing to wait for");
        return Ok(nodes);
    }

    let before: Vec<NodeStatus> = nodes.iter().map(|n| n.status).collect();
    let started = Instant::now();
    let mut current = nodes;

    loop {
        let mut polled = Vec::with_capacity(current.len());
        for node in &current {
            polled.push(node.poll(client).await?);
        }

        let changed: Vec<PlanNode> = polled
            .iter()
            .zip(&before)
            .filter(|(node, snapshot)| node.status != **snapshot)
            .map(|(node, _)| node.clone())
            .collect();
        if !changed.is_empty() {
            debug!(changed = changed.len(), "observed status change");
            return Ok(changed);
        }

        if started.elapsed() >= timeout {
            return Err(PlanError::MonitorTimeout {
                timeout,
                monitored: polled.len(),
            }
            .into());
        }

        current = polled;
        sleep(polling_interval).await;
    }
}
