// src/remote/resolver.rs

use std::collections::BTreeMap;

use async_trait::async_trait;

/// Upstream-dependency discovery, used only at graph-build time.
///
/// Implementations typically walk the platform's dataset lineage to find
/// which work items feed a given one.
#[async_trait]
pub trait DependencyResolver: Send + Sync {
    /// Names of the work items immediately upstream of `work_item`.
    async fn upstream_of(&self, work_item: &str) -> anyhow::Result<Vec<String>>;
}

/// Resolver backed by statically declared upstream lists.
///
/// This is what the config file produces: each `[item.<name>]` section
/// declares `upstream = [...]`, and graph build walks those lists instead
/// of a live platform.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    upstream: BTreeMap<String, Vec<String>>,
}

impl StaticResolver {
    pub fn new(upstream: BTreeMap<String, Vec<String>>) -> Self {
        Self { upstream }
    }
}

#[async_trait]
impl DependencyResolver for StaticResolver {
    async fn upstream_of(&self, work_item: &str) -> anyhow::Result<Vec<String>> {
        Ok(self.upstream.get(work_item).cloned().unwrap_or_default())
    }
}
