// src/plan/mod.rs

//! The plan and the machinery that drives it.
//!
//! - [`status`] is the pure status engine: the ordered node status enum,
//!   operation-state mapping, worst-wins reduction, and the aggregate
//!   plan status.
//! - [`node`] couples one work item to its scheduling state and owns the
//!   per-node step state machine (`run_next_step` / `poll`).
//! - [`planner`] owns the plan, applies node updates with downstream
//!   propagation, and runs the bounded-concurrency scheduling loop.
//! - [`snapshot`] emits the optional read-only plan snapshot artifact.

pub mod node;
pub mod planner;
pub mod snapshot;
pub mod status;

pub use node::PlanNode;
pub use planner::{DEFAULT_MONITOR_TIMEOUT, ExecuteOptions, Planner};
pub use status::{NodeStatus, PlanStatus};
