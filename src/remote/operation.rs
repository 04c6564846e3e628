// src/remote/operation.rs

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::PlanError;

/// State of one remote asynchronous job, as reported by the platform.
///
/// This is a closed set: a platform response carrying any other state
/// string fails to parse with [`PlanError::UnknownOperationState`], which
/// is fatal (it indicates a contract violation, not a transient fault).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum OperationState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
    Canceling,
}

impl OperationState {
    /// True if the job can no longer change state on its own.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OperationState::Succeeded | OperationState::Failed | OperationState::Canceled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperationState::Pending => "PENDING",
            OperationState::Running => "RUNNING",
            OperationState::Succeeded => "SUCCEEDED",
            OperationState::Failed => "FAILED",
            OperationState::Canceled => "CANCELED",
            OperationState::Canceling => "CANCELING",
        }
    }
}

impl FromStr for OperationState {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(OperationState::Pending),
            "RUNNING" => Ok(OperationState::Running),
            "SUCCEEDED" => Ok(OperationState::Succeeded),
            "FAILED" => Ok(OperationState::Failed),
            // Older platform versions spell this with two L's.
            "CANCELED" | "CANCELLED" => Ok(OperationState::Canceled),
            "CANCELING" | "CANCELLING" => Ok(OperationState::Canceling),
            other => Err(PlanError::UnknownOperationState(other.to_string())),
        }
    }
}

impl TryFrom<String> for OperationState {
    type Error = PlanError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<OperationState> for &'static str {
    fn from(state: OperationState) -> Self {
        state.as_str()
    }
}

impl Serialize for OperationState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to one remote asynchronous job.
///
/// A handle is a snapshot: [`OperationClient::poll`] returns a fresh one
/// rather than mutating in place, so a [`crate::plan::PlanNode`]'s history
/// stays a plain list of values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationHandle {
    /// Platform-assigned job id; stable across polls.
    pub id: String,
    pub state: OperationState,
}

impl OperationHandle {
    pub fn new(id: impl Into<String>, state: OperationState) -> Self {
        Self {
            id: id.into(),
            state,
        }
    }
}

/// Polling access to remote operations.
///
/// `poll` must be idempotent and side-effect-free beyond refreshing the
/// returned snapshot.
#[async_trait]
pub trait OperationClient: Send + Sync {
    async fn poll(&self, handle: &OperationHandle) -> anyhow::Result<OperationHandle>;
}
