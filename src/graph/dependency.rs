// src/graph/dependency.rs

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::errors::PlanError;
use crate::remote::DependencyResolver;

/// Directed acyclic graph of work-item dependencies, keyed by name.
///
/// Edges run producer → consumer. The representation is a plain pair of
/// adjacency maps; graph-library machinery is deliberately avoided except
/// for the acyclicity check at construction. All construction points
/// reject cyclic input with [`PlanError::CyclicDependency`], so every
/// query below may assume a DAG.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    nodes: BTreeSet<String>,
    successors: BTreeMap<String, BTreeSet<String>>,
    predecessors: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Build a graph directly from (producer, consumer) edges plus any
    /// extra nodes (so singletons with no dependencies are retained).
    pub fn from_edges<E, N>(edges: E, nodes: N) -> Result<Self, PlanError>
    where
        E: IntoIterator<Item = (String, String)>,
        N: IntoIterator<Item = String>,
    {
        let mut graph = Self::default();
        for node in nodes {
            graph.nodes.insert(node);
        }
        for (producer, consumer) in edges {
            graph.insert_edge(producer, consumer);
        }
        graph.ensure_acyclic()?;
        Ok(graph)
    }

    /// Discover the dependency graph for a set of root work items by
    /// walking a [`DependencyResolver`].
    ///
    /// For each root this repeatedly asks for immediate upstream items and
    /// accumulates edges. An upstream item that already appears as a
    /// consumer in the accumulated edge set has already been walked from
    /// elsewhere and is not walked again. That guard keeps the walk from
    /// looping on cyclic-looking lineage, but it is only a heuristic;
    /// the real cycle rejection happens once at the end.
    pub async fn build<R>(roots: &[String], resolver: &R) -> anyhow::Result<Self>
    where
        R: DependencyResolver + ?Sized,
    {
        let mut edges: BTreeSet<(String, String)> = BTreeSet::new();
        let mut to_walk: Vec<String> = roots.to_vec();

        while let Some(item) = to_walk.pop() {
            for upstream in resolver.upstream_of(&item).await? {
                let already_walked = edges.iter().any(|(_, consumer)| consumer == &upstream);
                edges.insert((upstream.clone(), item.clone()));
                if already_walked {
                    debug!(
                        work_item = %upstream,
                        "upstream already present as a consumer; not re-walking"
                    );
                } else {
                    to_walk.push(upstream);
                }
            }
        }

        let graph = Self::from_edges(edges, roots.iter().cloned())?;
        Ok(graph)
    }

    /// A new graph value with `extra_edges` merged in. The original graph
    /// is left untouched.
    pub fn with_edges<E>(&self, extra_edges: E) -> Result<Self, PlanError>
    where
        E: IntoIterator<Item = (String, String)>,
    {
        let mut merged = self.clone();
        for (producer, consumer) in extra_edges {
            merged.insert_edge(producer, consumer);
        }
        merged.ensure_acyclic()?;
        Ok(merged)
    }

    fn insert_edge(&mut self, producer: String, consumer: String) {
        self.nodes.insert(producer.clone());
        self.nodes.insert(consumer.clone());
        self.successors
            .entry(producer.clone())
            .or_default()
            .insert(consumer.clone());
        self.predecessors.entry(consumer).or_default().insert(producer);
    }

    fn ensure_acyclic(&self) -> Result<(), PlanError> {
        let mut check: DiGraphMap<&str, ()> = DiGraphMap::new();
        for node in &self.nodes {
            check.add_node(node.as_str());
        }
        for (producer, consumers) in &self.successors {
            for consumer in consumers {
                check.add_edge(producer.as_str(), consumer.as_str(), ());
            }
        }
        match toposort(&check, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(PlanError::CyclicDependency(cycle.node_id().to_string())),
        }
    }

    pub fn contains(&self, node: &str) -> bool {
        self.nodes.contains(node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|s| s.as_str())
    }

    /// Nodes with no predecessors.
    pub fn source_nodes(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|n| self.predecessors(n).is_empty())
            .cloned()
            .collect()
    }

    /// Nodes with no successors.
    pub fn end_nodes(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|n| self.successors(n).is_empty())
            .cloned()
            .collect()
    }

    /// Immediate successors (consumers) of a node.
    pub fn successors(&self, node: &str) -> BTreeSet<String> {
        self.successors.get(node).cloned().unwrap_or_default()
    }

    /// Immediate predecessors (producers) of a node.
    pub fn predecessors(&self, node: &str) -> BTreeSet<String> {
        self.predecessors.get(node).cloned().unwrap_or_default()
    }

    /// Every node reachable from `node`, excluding `node` itself.
    pub fn downstream_closure(&self, node: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<String> = self.successors(node).into_iter().collect();
        while let Some(next) = stack.pop() {
            if seen.insert(next.clone()) {
                stack.extend(self.successors(&next));
            }
        }
        seen
    }

    /// Assign every node an integer tier.
    ///
    /// Source nodes are tier 0. Any other node sits at (longest simple
    /// path from any source to it, counted in nodes) − 1: a node must wait
    /// for its longest chain of prerequisites, not its shortest. Paths are
    /// enumerated explicitly, which is exponential in path count for dense
    /// graphs; fine for the tens of nodes this scheduler targets, not for
    /// thousands.
    pub fn tiers(&self) -> BTreeMap<u32, Vec<String>> {
        let source_nodes = self.source_nodes();
        let mut tiers: BTreeMap<u32, Vec<String>> = BTreeMap::new();

        for node in &self.nodes {
            if source_nodes.iter().any(|s| s == node) {
                tiers.entry(0).or_default().push(node.clone());
                continue;
            }

            let mut longest = 0usize;
            for source in &source_nodes {
                if let Some(len) = self.longest_path_len(source, node) {
                    longest = longest.max(len);
                }
            }
            // longest counts nodes on the path, so tier is one less.
            let tier = (longest.saturating_sub(1)) as u32;
            tiers.entry(tier).or_default().push(node.clone());
        }

        tiers
    }

    /// Length (in nodes) of the longest simple path from `from` to `to`,
    /// or `None` if `to` is unreachable from `from`.
    fn longest_path_len(&self, from: &str, to: &str) -> Option<usize> {
        if from == to {
            return Some(1);
        }
        let mut best = None;
        for next in self.successors(from) {
            if let Some(len) = self.longest_path_len(&next, to) {
                let candidate = len + 1;
                if best.map_or(true, |b| candidate > b) {
                    best = Some(candidate);
                }
            }
        }
        best
    }
}
