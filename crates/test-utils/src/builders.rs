#![allow(dead_code)]

use std::collections::BTreeMap;

use serde_json::Value as Json;

use branchdag::config::{
    ArrayConfig, ConfigFile, ConfigSection, DynamicConfig, RawConfigFile, TargetConfig,
};
use branchdag::value::Table;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                target: BTreeMap::new(),
            },
        }
    }

    pub fn with_target(mut self, name: &str, target: TargetConfig) -> Self {
        self.config.target.insert(name.to_string(), target);
        self
    }

    pub fn with_max_expand(mut self, n: usize) -> Self {
        self.config.config.max_expand = Some(n);
        self
    }

    pub fn with_hash_workers(mut self, n: usize) -> Self {
        self.config.config.hash_workers = n;
        self
    }

    pub fn with_precheck(mut self, val: bool) -> Self {
        self.config.config.precheck = val;
        self
    }

    pub fn with_recover(mut self, val: bool) -> Self {
        self.config.config.recover = val;
        self
    }

    /// The unvalidated file, for tests that expect validation to fail.
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TargetConfig`.
pub struct TargetConfigBuilder {
    target: TargetConfig,
}

impl TargetConfigBuilder {
    pub fn new() -> Self {
        Self {
            target: TargetConfig::default(),
        }
    }

    /// Literal sequence from any JSON-convertible items.
    pub fn values<T: Into<Json>>(mut self, items: impl IntoIterator<Item = T>) -> Self {
        self.target.value = Some(Json::Array(items.into_iter().map(Into::into).collect()));
        self
    }

    pub fn table(mut self, columns: &[&str], rows: Vec<Vec<Json>>) -> Self {
        self.target.table = Some(Table {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        });
        self
    }

    pub fn array(mut self, shape: &[usize], data: Vec<Json>) -> Self {
        self.target.array = Some(ArrayConfig {
            shape: shape.to_vec(),
            data,
        });
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.add_dep(dep);
        self
    }

    /// `map` over `vars`, also adding them to `after`.
    pub fn map(self, vars: &[&str]) -> Self {
        self.fan_out(vars, |d, v| d.map = Some(v))
    }

    pub fn cross(self, vars: &[&str]) -> Self {
        self.fan_out(vars, |d, v| d.cross = Some(v))
    }

    pub fn combine(self, vars: &[&str]) -> Self {
        self.fan_out(vars, |d, v| d.combine = Some(v))
    }

    /// Grouping variable for `combine`, also added to `after`.
    pub fn by(mut self, var: &str) -> Self {
        self.add_dep(var);
        self.dynamic_mut().by = Some(var.to_string());
        self
    }

    pub fn trace(mut self, names: &[&str]) -> Self {
        self.dynamic_mut()
            .trace
            .extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub fn build(self) -> TargetConfig {
        self.target
    }

    fn fan_out(mut self, vars: &[&str], set: impl FnOnce(&mut DynamicConfig, Vec<String>)) -> Self {
        for var in vars {
            self.add_dep(var);
        }
        set(
            self.dynamic_mut(),
            vars.iter().map(|v| v.to_string()).collect(),
        );
        self
    }

    fn add_dep(&mut self, var: &str) {
        if !self.target.after.iter().any(|d| d == var) {
            self.target.after.push(var.to_string());
        }
    }

    fn dynamic_mut(&mut self) -> &mut DynamicConfig {
        self.target.dynamic.get_or_insert_with(DynamicConfig::default)
    }
}

impl Default for TargetConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
