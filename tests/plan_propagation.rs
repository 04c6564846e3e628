use std::collections::BTreeMap;

use workplan::graph::DependencyGraph;
use workplan::plan::{NodeStatus, PlanStatus, Planner};
use workplan::steps::{WorkItem, WorkItemKind};

fn graph(edges: &[(&str, &str)], extra_nodes: &[&str]) -> DependencyGraph {
    DependencyGraph::from_edges(
        edges
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string())),
        extra_nodes.iter().map(|n| n.to_string()),
    )
    .unwrap()
}

fn catalog(names: &[&str]) -> BTreeMap<String, WorkItem> {
    names
        .iter()
        .map(|n| (n.to_string(), WorkItem::new(*n, WorkItemKind::SingleStep)))
        .collect()
}

fn planner(edges: &[(&str, &str)], extra_nodes: &[&str], names: &[&str]) -> Planner {
    Planner::from_graph(graph(edges, extra_nodes), &catalog(names), 0, false).unwrap()
}

fn forced(planner: &Planner, name: &str, status: NodeStatus) -> Planner {
    let node = planner.node(name).unwrap().with_status(status);
    planner.update_plan(node)
}

#[test]
fn initial_statuses_follow_starting_tier() {
    let g = graph(&[("A", "B"), ("B", "C")], &[]);
    let p = Planner::from_graph(g, &catalog(&["A", "B", "C"]), 1, false).unwrap();

    assert_eq!(p.node("A").unwrap().status, NodeStatus::Skippable);
    assert_eq!(p.node("B").unwrap().status, NodeStatus::Runnable);
    assert_eq!(p.node("C").unwrap().status, NodeStatus::Planned);
}

#[test]
fn priorities_are_stable_within_tiers() {
    let p = planner(
        &[("A", "C"), ("B", "C")],
        &[],
        &["A", "B", "C"],
    );
    assert_eq!(p.node("A").unwrap().priority, 0);
    assert_eq!(p.node("B").unwrap().priority, 1);
    assert_eq!(p.node("C").unwrap().priority, 100);
}

#[test]
fn failure_blocks_whole_downstream_closure_but_not_siblings() {
    // A -> B -> C with sibling branch A -> D.
    let p = planner(&[("A", "B"), ("B", "C"), ("A", "D")], &[], &["A", "B", "C", "D"]);

    let p = forced(&p, "A", NodeStatus::Succeeded);
    assert_eq!(p.node("B").unwrap().status, NodeStatus::Runnable);
    assert_eq!(p.node("D").unwrap().status, NodeStatus::Runnable);

    let p = forced(&p, "B", NodeStatus::Failed);
    assert_eq!(p.node("C").unwrap().status, NodeStatus::Blocked);
    assert_eq!(p.node("D").unwrap().status, NodeStatus::Runnable);
}

#[test]
fn cancellation_blocks_downstream_like_failure() {
    let p = planner(&[("A", "B"), ("B", "C")], &[], &["A", "B", "C"]);
    let p = forced(&p, "A", NodeStatus::Canceled);
    assert_eq!(p.node("B").unwrap().status, NodeStatus::Blocked);
    assert_eq!(p.node("C").unwrap().status, NodeStatus::Blocked);
}

#[test]
fn successor_waits_for_all_predecessors() {
    // B has two producers: A and D.
    let p = planner(&[("A", "B"), ("D", "B"), ("B", "C")], &[], &["A", "B", "C", "D"]);

    let p = forced(&p, "A", NodeStatus::Succeeded);
    assert_eq!(
        p.node("B").unwrap().status,
        NodeStatus::Planned,
        "B must stay non-runnable while D is unfinished"
    );

    let p = forced(&p, "D", NodeStatus::Succeeded);
    assert_eq!(p.node("B").unwrap().status, NodeStatus::Runnable);
}

#[test]
fn skippable_predecessors_satisfy_successors() {
    let g = graph(&[("A", "B"), ("B", "C")], &[]);
    // starting_tier 1: A is skippable, B runnable.
    let p = Planner::from_graph(g, &catalog(&["A", "B", "C"]), 1, false).unwrap();

    let p = forced(&p, "B", NodeStatus::Succeeded);
    assert_eq!(p.node("C").unwrap().status, NodeStatus::Runnable);
}

#[test]
fn unblocking_is_single_hop() {
    let p = planner(&[("A", "B"), ("B", "C")], &[], &["A", "B", "C"]);
    let p = forced(&p, "A", NodeStatus::Succeeded);
    // Only the immediate successor is re-evaluated per call.
    assert_eq!(p.node("B").unwrap().status, NodeStatus::Runnable);
    assert_eq!(p.node("C").unwrap().status, NodeStatus::Planned);
}

#[test]
fn plan_status_aggregation() {
    let p = planner(&[("A", "B")], &[], &["A", "B"]);
    assert_eq!(p.plan_status(), PlanStatus::Planned);

    let running = forced(&p, "A", NodeStatus::Running);
    assert_eq!(running.plan_status(), PlanStatus::Running);

    let done = forced(&forced(&p, "A", NodeStatus::Succeeded), "B", NodeStatus::Succeeded);
    assert_eq!(done.plan_status(), PlanStatus::Succeeded);

    // A failure only becomes terminal once nothing is runnable or running.
    let failed = forced(&p, "A", NodeStatus::Failed);
    assert_eq!(failed.node("B").unwrap().status, NodeStatus::Blocked);
    assert_eq!(failed.plan_status(), PlanStatus::Failed);
}

#[test]
fn missing_catalog_entry_is_rejected() {
    let g = graph(&[("A", "B")], &[]);
    let err = Planner::from_graph(g, &catalog(&["A"]), 0, false).unwrap_err();
    assert!(format!("{err}").contains("B"));
}
