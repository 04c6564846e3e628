// src/remote/mod.rs

//! Interfaces to the remote platform that actually executes jobs.
//!
//! The scheduler never talks to the platform directly; it goes through
//! three narrow seams:
//!
//! - [`OperationClient`] — re-poll the state of one asynchronous job.
//! - [`DependencyResolver`] — discover upstream work items at graph-build
//!   time.
//! - [`crate::steps::StepTrigger`] — start one step of one work item.
//!
//! Everything behind these traits is request/response against an external
//! API; no graph or scheduling logic lives here.

pub mod operation;
pub mod resolver;

pub use operation::{OperationClient, OperationHandle, OperationState};
pub use resolver::{DependencyResolver, StaticResolver};
