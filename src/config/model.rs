// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value as Json;

use crate::dynamic::DynamicSpec;
use crate::engine::SessionSettings;
use crate::errors::{BranchdagError, Result};
use crate::value::{Array, Payload, Table, Value};

/// Top-level pipeline file as read from TOML.
///
/// ```toml
/// [config]
/// max_expand = 2
///
/// [target.w]
/// value = ["A", "B"]
///
/// [target.y]
/// after = ["w"]
/// dynamic = { map = ["w"], trace = ["w"] }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// All targets from `[target.<name>]`.
    #[serde(default)]
    pub target: BTreeMap<String, TargetConfig>,
}

/// A pipeline file that passed validation.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub target: BTreeMap<String, TargetConfig>,
}

impl ConfigFile {
    /// Construct without validation; use `ConfigFile::try_from` instead.
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        target: BTreeMap<String, TargetConfig>,
    ) -> Self {
        Self { config, target }
    }
}

/// `[config]` section: session behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Truncate each dynamic target to at most this many sub-targets.
    #[serde(default)]
    pub max_expand: Option<usize>,

    /// Threads used to digest dependency elements.
    #[serde(default = "default_hash_workers")]
    pub hash_workers: usize,

    /// Skip sub-targets whose value is already cached.
    #[serde(default = "default_true")]
    pub precheck: bool,

    /// Try to recover historical results for sub-targets before building.
    #[serde(default)]
    pub recover: bool,

    /// Base seed from which per-target seeds are derived.
    #[serde(default)]
    pub seed: u64,
}

fn default_hash_workers() -> usize {
    4
}

fn default_true() -> bool {
    true
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            max_expand: None,
            hash_workers: default_hash_workers(),
            precheck: true,
            recover: false,
            seed: 0,
        }
    }
}

impl ConfigSection {
    pub fn settings(&self) -> SessionSettings {
        SessionSettings {
            max_expand: self.max_expand,
            hash_workers: self.hash_workers,
            precheck: self.precheck,
            recover: self.recover,
            seed: self.seed,
        }
    }
}

/// `[target.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetConfig {
    /// Dependency list: this target waits for all targets listed here.
    #[serde(default)]
    pub after: Vec<String>,

    /// Literal sequence value (a scalar becomes a one-element sequence).
    #[serde(default)]
    pub value: Option<Json>,

    /// Literal table value.
    #[serde(default)]
    pub table: Option<Table>,

    /// Literal array value.
    #[serde(default)]
    pub array: Option<ArrayConfig>,

    /// Fan-out declaration, e.g. `{ cross = ["a", "b"], trace = ["a"] }`.
    #[serde(default)]
    pub dynamic: Option<DynamicConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArrayConfig {
    pub shape: Vec<usize>,
    pub data: Vec<Json>,
}

/// Inline `dynamic = { ... }` table. Exactly one of `map`, `cross` or
/// `combine` must be set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DynamicConfig {
    #[serde(default)]
    pub map: Option<Vec<String>>,
    #[serde(default)]
    pub cross: Option<Vec<String>>,
    #[serde(default)]
    pub combine: Option<Vec<String>>,
    #[serde(default)]
    pub by: Option<String>,
    #[serde(default)]
    pub trace: Vec<String>,
}

impl DynamicConfig {
    pub fn to_spec(&self) -> Result<DynamicSpec> {
        let trace = self.trace.clone();
        let spec = match (&self.map, &self.cross, &self.combine) {
            (Some(vars), None, None) => DynamicSpec::Map {
                vars: vars.clone(),
                trace,
            },
            (None, Some(vars), None) => DynamicSpec::Cross {
                vars: vars.clone(),
                trace,
            },
            (None, None, Some(vars)) => DynamicSpec::Combine {
                vars: vars.clone(),
                by: self.by.clone(),
                trace,
            },
            _ => {
                return Err(BranchdagError::InvalidDynamic(
                    "exactly one of `map`, `cross` or `combine` must be given".to_string(),
                ));
            }
        };
        if self.by.is_some() && !matches!(spec, DynamicSpec::Combine { .. }) {
            return Err(BranchdagError::InvalidDynamic(
                "`by` is only allowed with `combine`".to_string(),
            ));
        }
        Ok(spec)
    }
}

impl TargetConfig {
    pub fn dynamic_spec(&self) -> Result<Option<DynamicSpec>> {
        self.dynamic.as_ref().map(DynamicConfig::to_spec).transpose()
    }

    /// The literal value declared for this target, if any.
    pub fn literal_value(&self) -> Result<Option<Value>> {
        let payload = match (&self.value, &self.table, &self.array) {
            (None, None, None) => return Ok(None),
            (Some(Json::Array(items)), None, None) => Payload::Seq(items.clone()),
            (Some(scalar), None, None) => Payload::Seq(vec![scalar.clone()]),
            (None, Some(table), None) => {
                if let Some(row) = table.rows.iter().find(|r| r.len() != table.columns.len()) {
                    return Err(BranchdagError::ConfigError(format!(
                        "table row has {} cells but {} columns are declared",
                        row.len(),
                        table.columns.len()
                    )));
                }
                Payload::Table(table.clone())
            }
            (None, None, Some(array)) => {
                Payload::Array(Array::new(array.shape.clone(), array.data.clone())?)
            }
            _ => {
                return Err(BranchdagError::ConfigError(
                    "only one of `value`, `table` or `array` may be given".to_string(),
                ));
            }
        };
        Ok(Some(Value::new(payload)))
    }
}
