// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{BranchdagError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = BranchdagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.target))
    }
}

/// Run every semantic check on a raw pipeline file.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_targets(cfg)?;
    validate_global_config(cfg)?;
    validate_target_dependencies(cfg)?;
    validate_targets(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_targets(cfg: &RawConfigFile) -> Result<()> {
    if cfg.target.is_empty() {
        return Err(BranchdagError::ConfigError(
            "pipeline must contain at least one [target.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.hash_workers == 0 {
        return Err(BranchdagError::ConfigError(
            "[config].hash_workers must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.config.max_expand == Some(0) {
        return Err(BranchdagError::ConfigError(
            "[config].max_expand must be >= 1 when set (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_target_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, target) in cfg.target.iter() {
        for (i, dep) in target.after.iter().enumerate() {
            if target.after[..i].contains(dep) {
                return Err(BranchdagError::ConfigError(format!(
                    "target '{name}' lists dependency '{dep}' more than once in `after`"
                )));
            }
            if !cfg.target.contains_key(dep) {
                return Err(BranchdagError::ConfigError(format!(
                    "target '{name}' has unknown dependency '{dep}' in `after`"
                )));
            }
            if dep == name {
                return Err(BranchdagError::ConfigError(format!(
                    "target '{name}' cannot depend on itself in `after`"
                )));
            }
        }
    }
    Ok(())
}

fn validate_targets(cfg: &RawConfigFile) -> Result<()> {
    for (name, target) in cfg.target.iter() {
        target.literal_value().map_err(|e| {
            BranchdagError::ConfigError(format!("target '{name}': {e}"))
        })?;

        let spec = target.dynamic_spec().map_err(|e| match e {
            BranchdagError::InvalidDynamic(msg) => {
                BranchdagError::InvalidDynamic(format!("target '{name}': {msg}"))
            }
            other => other,
        })?;
        let Some(spec) = spec else {
            continue;
        };
        if target.literal_value()?.is_some() {
            return Err(BranchdagError::InvalidDynamic(format!(
                "target '{name}' is dynamic and cannot also declare a literal value"
            )));
        }
        spec.validate(name)?;
        for var in spec.all_vars() {
            if !target.after.iter().any(|d| d == var) {
                return Err(BranchdagError::InvalidDynamic(format!(
                    "target '{name}' fans out over '{var}', which is missing from `after`"
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: dep -> target.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.target.keys() {
        graph.add_node(name.as_str());
    }

    for (name, target) in cfg.target.iter() {
        for dep in target.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(BranchdagError::DagCycle(format!(
            "cycle detected in target DAG involving target '{}'",
            cycle.node_id()
        ))),
    }
}
