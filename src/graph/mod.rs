// src/graph/mod.rs

//! Dependency-graph representation and queries.
//!
//! [`dependency`] holds the directed acyclic graph of work-item
//! dependencies: construction (from a resolver walk or explicit edges),
//! tier assignment, and the closure/neighbour queries the planner's
//! propagation rules are built on.

pub mod dependency;

pub use dependency::DependencyGraph;
