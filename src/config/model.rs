// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::plan::{DEFAULT_MONITOR_TIMEOUT, ExecuteOptions};
use crate::remote::StaticResolver;
use crate::steps::{WorkItem, WorkItemKind};

/// Top-level configuration as read from a TOML file:
///
/// ```toml
/// [plan]
/// starting_tier = 0
/// train = false
/// concurrency = 2
/// polling_interval_secs = 30
///
/// [item.source_mapping]
/// kind = "single_step"
///
/// [item.dedup]
/// kind = "multi_step_trainable"
/// upstream = ["source_mapping"]
/// ```
///
/// All `[plan]` keys are optional with sensible defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    /// Scheduling knobs from `[plan]`.
    #[serde(default)]
    pub plan: PlanSection,

    /// All work items from `[item.<name>]`, keyed by name.
    #[serde(default)]
    pub item: BTreeMap<String, ItemConfig>,
}

/// `[plan]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanSection {
    /// Tier at which execution starts; everything below is skippable.
    #[serde(default)]
    pub starting_tier: u32,

    /// Whether trainable kinds include their training step.
    #[serde(default)]
    pub train: bool,

    /// Ceiling on remote jobs simultaneously in flight.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_polling_interval_secs")]
    pub polling_interval_secs: u64,

    #[serde(default = "default_monitor_timeout_secs")]
    pub monitor_timeout_secs: u64,

    /// When set, a plan snapshot is written here after each round.
    #[serde(default)]
    pub snapshot_dir: Option<PathBuf>,
}

fn default_concurrency() -> usize {
    2
}

fn default_polling_interval_secs() -> u64 {
    30
}

fn default_monitor_timeout_secs() -> u64 {
    DEFAULT_MONITOR_TIMEOUT.as_secs()
}

impl Default for PlanSection {
    fn default() -> Self {
        Self {
            starting_tier: 0,
            train: false,
            concurrency: default_concurrency(),
            polling_interval_secs: default_polling_interval_secs(),
            monitor_timeout_secs: default_monitor_timeout_secs(),
            snapshot_dir: None,
        }
    }
}

/// `[item.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemConfig {
    /// Work-item kind; determines the step sequence.
    pub kind: WorkItemKind,

    /// Names of work items this one depends on.
    #[serde(default)]
    pub upstream: Vec<String>,
}

impl ConfigFile {
    /// Work-item catalog for `Planner::from_graph`.
    pub fn catalog(&self) -> BTreeMap<String, WorkItem> {
        self.item
            .iter()
            .map(|(name, item)| (name.clone(), WorkItem::new(name.clone(), item.kind)))
            .collect()
    }

    /// Dependency resolver over the declared upstream lists.
    pub fn resolver(&self) -> StaticResolver {
        StaticResolver::new(
            self.item
                .iter()
                .map(|(name, item)| (name.clone(), item.upstream.clone()))
                .collect(),
        )
    }

    /// Execution options from the `[plan]` section.
    pub fn execute_options(&self) -> ExecuteOptions {
        ExecuteOptions {
            concurrency_level: self.plan.concurrency,
            polling_interval: Duration::from_secs(self.plan.polling_interval_secs),
            monitor_timeout: Duration::from_secs(self.plan.monitor_timeout_secs),
            snapshot_dir: self.plan.snapshot_dir.clone(),
        }
    }
}
