// src/steps/mod.rs

//! Work-item kinds, their fixed step sequences, and the step registry.
//!
//! A work item's kind fully determines the ordered list of steps the
//! scheduler drives it through; the sequence is looked up once and then
//! only ever consumed from the front, one step per trigger. The
//! [`StepRegistry`] is an immutable value mapping `(kind, step)` to the
//! external trigger that starts that step, injected into plan operations
//! rather than living in global state.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::PlanError;
use crate::remote::OperationHandle;

/// Category of a work item; determines its step sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemKind {
    /// A single dataset refresh and nothing else.
    SingleStep,
    /// Refresh, optionally retrain the model, then update results.
    MultiStepTrainable,
    /// Refresh then update results; never retrains.
    MultiStepFixed,
    /// Profile inputs, refresh, then publish.
    ProfileThenPublish,
}

/// One unit in a work item's ordered execution sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    UpdateDataset,
    Train,
    UpdateResults,
    Profile,
    Publish,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Step::UpdateDataset => "update_dataset",
            Step::Train => "train",
            Step::UpdateResults => "update_results",
            Step::Profile => "profile",
            Step::Publish => "publish",
        };
        f.write_str(s)
    }
}

/// Reference to one external work item. The platform owns the real
/// resource; the scheduler only carries the name and kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub name: String,
    pub kind: WorkItemKind,
}

impl WorkItem {
    pub fn new(name: impl Into<String>, kind: WorkItemKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Starts one step of one work item on the remote platform.
///
/// Contract: exactly one [`OperationHandle`] per call. Returning more is a
/// usage error the caller turns into [`PlanError::TriggerContract`].
#[async_trait]
pub trait StepTrigger: Send + Sync {
    async fn trigger(
        &self,
        work_item: &WorkItem,
        step: Step,
        asynchronous: bool,
    ) -> anyhow::Result<Vec<OperationHandle>>;
}

impl fmt::Debug for dyn StepTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn StepTrigger")
    }
}

/// Immutable mapping from `(kind, step)` to a trigger.
///
/// Built once at startup and shared by reference; there is no way to
/// remove or replace entries after construction short of building a new
/// registry.
#[derive(Clone, Default)]
pub struct StepRegistry {
    triggers: HashMap<(WorkItemKind, Step), Arc<dyn StepTrigger>>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a trigger for one `(kind, step)` pair.
    pub fn register(
        mut self,
        kind: WorkItemKind,
        step: Step,
        trigger: Arc<dyn StepTrigger>,
    ) -> Self {
        self.triggers.insert((kind, step), trigger);
        self
    }

    /// Register the same trigger for every `(kind, step)` pair in every
    /// sequence. Useful when the trigger dispatches on the step itself.
    pub fn uniform(trigger: Arc<dyn StepTrigger>) -> Self {
        let mut registry = Self::new();
        for kind in [
            WorkItemKind::SingleStep,
            WorkItemKind::MultiStepTrainable,
            WorkItemKind::MultiStepFixed,
            WorkItemKind::ProfileThenPublish,
        ] {
            for train in [false, true] {
                for step in Self::sequence(kind, train) {
                    registry.triggers.insert((kind, *step), Arc::clone(&trigger));
                }
            }
        }
        registry
    }

    /// Look up the trigger for a `(kind, step)` pair.
    pub fn trigger_for(
        &self,
        kind: WorkItemKind,
        step: Step,
    ) -> Result<&Arc<dyn StepTrigger>, PlanError> {
        self.triggers
            .get(&(kind, step))
            .ok_or(PlanError::MissingTrigger { kind, step })
    }

    /// The fixed, ordered step sequence for a kind.
    ///
    /// The `train` flag only affects [`WorkItemKind::MultiStepTrainable`]:
    /// it decides whether the feedback/training step is included.
    pub fn sequence(kind: WorkItemKind, train: bool) -> &'static [Step] {
        match (kind, train) {
            (WorkItemKind::SingleStep, _) => &[Step::UpdateDataset],
            (WorkItemKind::MultiStepTrainable, true) => {
                &[Step::UpdateDataset, Step::Train, Step::UpdateResults]
            }
            (WorkItemKind::MultiStepTrainable, false) => {
                &[Step::UpdateDataset, Step::UpdateResults]
            }
            (WorkItemKind::MultiStepFixed, _) => &[Step::UpdateDataset, Step::UpdateResults],
            (WorkItemKind::ProfileThenPublish, _) => {
                &[Step::Profile, Step::UpdateDataset, Step::Publish]
            }
        }
    }
}

impl fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRegistry")
            .field("entries", &self.triggers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn train_flag_only_affects_trainable_kind() {
        assert_eq!(
            StepRegistry::sequence(WorkItemKind::MultiStepTrainable, true),
            &[Step::UpdateDataset, Step::Train, Step::UpdateResults]
        );
        assert_eq!(
            StepRegistry::sequence(WorkItemKind::MultiStepTrainable, false),
            &[Step::UpdateDataset, Step::UpdateResults]
        );
        assert_eq!(
            StepRegistry::sequence(WorkItemKind::SingleStep, true),
            StepRegistry::sequence(WorkItemKind::SingleStep, false),
        );
        assert_eq!(
            StepRegistry::sequence(WorkItemKind::ProfileThenPublish, true),
            StepRegistry::sequence(WorkItemKind::ProfileThenPublish, false),
        );
    }

    #[test]
    fn missing_trigger_is_an_error() {
        let registry = StepRegistry::new();
        let err = registry
            .trigger_for(WorkItemKind::SingleStep, Step::UpdateDataset)
            .unwrap_err();
        assert!(matches!(err, PlanError::MissingTrigger { .. }));
    }
}
