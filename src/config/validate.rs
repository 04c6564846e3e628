// src/config/validate.rs

use anyhow::{Result, anyhow};
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::ConfigFile;

/// Run semantic validation against a loaded configuration.
///
/// This checks:
/// - there is at least one work item
/// - `[plan]` values are sane (`concurrency >= 1`, non-zero polling interval)
/// - all `upstream` references point at declared items
/// - no item depends on itself
/// - the declared dependency graph has no cycles
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    ensure_has_items(cfg)?;
    validate_plan_section(cfg)?;
    validate_upstream_references(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_items(cfg: &ConfigFile) -> Result<()> {
    if cfg.item.is_empty() {
        return Err(anyhow!(
            "config must contain at least one [item.<name>] section"
        ));
    }
    Ok(())
}

fn validate_plan_section(cfg: &ConfigFile) -> Result<()> {
    if cfg.plan.concurrency == 0 {
        return Err(anyhow!("[plan].concurrency must be >= 1 (got 0)"));
    }
    if cfg.plan.polling_interval_secs == 0 {
        return Err(anyhow!("[plan].polling_interval_secs must be >= 1 (got 0)"));
    }
    Ok(())
}

fn validate_upstream_references(cfg: &ConfigFile) -> Result<()> {
    for (name, item) in cfg.item.iter() {
        for dep in item.upstream.iter() {
            if !cfg.item.contains_key(dep) {
                return Err(anyhow!(
                    "item '{}' has unknown dependency '{}' in `upstream`",
                    name,
                    dep
                ));
            }
            if dep == name {
                return Err(anyhow!(
                    "item '{}' cannot depend on itself in `upstream`",
                    name
                ));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &ConfigFile) -> Result<()> {
    // Edge direction: dep -> item, i.e. producer to consumer.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.item.keys() {
        graph.add_node(name.as_str());
    }

    for (name, item) in cfg.item.iter() {
        for dep in item.upstream.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(anyhow!(
            "cycle detected in dependency graph involving item '{}'",
            cycle.node_id()
        )),
    }
}
