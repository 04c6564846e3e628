// src/lib.rs

//! `workplan` schedules and drives execution of interdependent,
//! multi-step remote jobs ("work items") to completion, respecting
//! dependency order and a caller-supplied concurrency ceiling, while
//! tolerating partial failure.
//!
//! The moving parts:
//! - [`graph::DependencyGraph`] — the producer→consumer DAG and its
//!   tier/closure queries.
//! - [`steps::StepRegistry`] — fixed step sequences per work-item kind
//!   and the triggers that start each step remotely.
//! - [`plan::PlanNode`] / [`plan::status`] — the per-item step state
//!   machine and the ordered, worst-wins status engine.
//! - [`plan::Planner`] — owns the plan, propagates success/failure
//!   through the graph, and runs the bounded-concurrency polling loop
//!   ([`plan::Planner::execute`]).
//!
//! The remote platform sits behind the traits in [`remote`] and
//! [`steps::StepTrigger`]; embedders supply real implementations, the
//! bundled binary plans from a declarative `Workplan.toml`.

pub mod cli;
pub mod config;
pub mod errors;
pub mod graph;
pub mod logging;
pub mod plan;
pub mod remote;
pub mod steps;

use anyhow::Result;
use tracing::info;

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::graph::DependencyGraph;
use crate::plan::{Planner, snapshot};

/// High-level entry point used by `main.rs`.
///
/// Loads and validates the config, builds the dependency graph from the
/// declared upstream lists, computes the plan, prints it, and optionally
/// writes a snapshot. Live execution goes through [`plan::Planner::execute`]
/// with the embedding application's trigger/polling implementations.
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;

    let roots: Vec<String> = cfg.item.keys().cloned().collect();
    let resolver = cfg.resolver();
    let graph = DependencyGraph::build(&roots, &resolver).await?;

    let starting_tier = args.starting_tier.unwrap_or(cfg.plan.starting_tier);
    let train = args.train || cfg.plan.train;
    let planner = Planner::from_graph(graph, &cfg.catalog(), starting_tier, train)?;

    print_plan(&planner);

    let snapshot_dir = args.snapshot_dir.or_else(|| cfg.plan.snapshot_dir.clone());
    if let Some(dir) = snapshot_dir {
        let path = snapshot::write_snapshot(&planner, &dir)?;
        info!(path = %path.display(), "wrote plan snapshot");
    }

    Ok(())
}

/// Print tiers, priorities and initial statuses of the computed plan.
fn print_plan(planner: &Planner) {
    println!("workplan ({} work items)", planner.nodes().count());
    println!("  starting_tier = {}", planner.starting_tier());
    println!("  train = {}", planner.train());
    println!();

    for (tier, names) in planner.graph().tiers() {
        println!("tier {tier}:");
        for name in names {
            if let Some(node) = planner.node(&name) {
                println!(
                    "  - {name} [{:?}] priority={} status={}",
                    node.work_item.kind, node.priority, node.status
                );
            }
        }
    }
}
