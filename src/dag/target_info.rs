// src/dag/target_info.rs

//! Declared targets.

use std::collections::BTreeMap;

use crate::config::model::ConfigFile;
use crate::dynamic::DynamicSpec;
use crate::engine::TargetName;
use crate::errors::Result;

/// A target as declared in the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetDecl {
    pub name: TargetName,
    /// Direct dependencies (names in `after = [...]`).
    pub deps: Vec<TargetName>,
    pub dynamic: Option<DynamicSpec>,
}

impl TargetDecl {
    pub fn new(name: impl Into<TargetName>) -> Self {
        Self {
            name: name.into(),
            deps: Vec::new(),
            dynamic: None,
        }
    }

    /// Add a dependency; repeats are ignored.
    pub fn after(mut self, dep: impl Into<TargetName>) -> Self {
        let dep = dep.into();
        if !self.deps.contains(&dep) {
            self.deps.push(dep);
        }
        self
    }

    /// Attach a dynamic spec; its variables are added to `deps` if missing.
    pub fn dynamic(mut self, spec: DynamicSpec) -> Self {
        for var in spec.all_vars() {
            if !self.deps.iter().any(|d| d == var) {
                self.deps.push(var.to_string());
            }
        }
        self.dynamic = Some(spec);
        self
    }
}

/// All declared targets, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    targets: BTreeMap<TargetName, TargetDecl>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a plan from a validated [`ConfigFile`].
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let mut plan = Plan::new();
        for (name, tc) in cfg.target.iter() {
            let mut decl = TargetDecl::new(name.clone());
            decl.deps = tc.after.clone();
            decl.dynamic = tc.dynamic_spec()?;
            plan = plan.with_target(decl);
        }
        Ok(plan)
    }

    pub fn with_target(mut self, decl: TargetDecl) -> Self {
        self.targets.insert(decl.name.clone(), decl);
        self
    }

    pub fn get(&self, name: &str) -> Option<&TargetDecl> {
        self.targets.get(name)
    }

    pub fn targets(&self) -> impl Iterator<Item = &TargetDecl> {
        self.targets.values()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
