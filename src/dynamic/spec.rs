// src/dynamic/spec.rs

//! The fan-out algebra attached to a dynamic target.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{BranchdagError, Result};

/// How a dynamic target fans out over its dependencies.
///
/// Every consumer (namer, index resolver, trace builder) matches on this enum
/// exhaustively, so a new variant has to be handled in all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DynamicSpec {
    /// Element-wise pairing; all variables must have the same length.
    Map {
        vars: Vec<String>,
        #[serde(default)]
        trace: Vec<String>,
    },
    /// Cartesian product in declared order, last variable varying fastest.
    Cross {
        vars: Vec<String>,
        #[serde(default)]
        trace: Vec<String>,
    },
    /// Grouping. With `by`, one group per distinct value of the grouping
    /// variable; without it, one group per element.
    Combine {
        vars: Vec<String>,
        #[serde(default)]
        by: Option<String>,
        #[serde(default)]
        trace: Vec<String>,
    },
}

impl DynamicSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            DynamicSpec::Map { .. } => "map",
            DynamicSpec::Cross { .. } => "cross",
            DynamicSpec::Combine { .. } => "combine",
        }
    }

    /// Fan-out variables, without the grouping variable.
    pub fn which_vars(&self) -> Vec<&str> {
        match self {
            DynamicSpec::Map { vars, .. } | DynamicSpec::Cross { vars, .. } => {
                vars.iter().map(String::as_str).collect()
            }
            DynamicSpec::Combine { vars, by, .. } => vars
                .iter()
                .map(String::as_str)
                .filter(|v| Some(*v) != by.as_deref())
                .collect(),
        }
    }

    /// Grouping variable of a `Combine`, if any.
    pub fn which_by(&self) -> Option<&str> {
        match self {
            DynamicSpec::Combine { by, .. } => by.as_deref(),
            DynamicSpec::Map { .. } | DynamicSpec::Cross { .. } => None,
        }
    }

    /// Every variable this fan-out reads: `which_vars` followed by `which_by`.
    pub fn all_vars(&self) -> Vec<&str> {
        let mut out = self.which_vars();
        out.extend(self.which_by());
        out
    }

    pub fn trace_vars(&self) -> &[String] {
        match self {
            DynamicSpec::Map { trace, .. }
            | DynamicSpec::Cross { trace, .. }
            | DynamicSpec::Combine { trace, .. } => trace,
        }
    }

    /// Check internal consistency: non-empty, no duplicate variables, trace
    /// names drawn from its own variables.
    pub fn validate(&self, target: &str) -> Result<()> {
        let vars = self.which_vars();
        if vars.is_empty() {
            return Err(BranchdagError::InvalidDynamic(format!(
                "target '{target}' declares `{}` without any variables",
                self.kind()
            )));
        }

        let mut seen = HashSet::new();
        for var in &vars {
            if !seen.insert(*var) {
                return Err(BranchdagError::InvalidDynamic(format!(
                    "target '{target}' lists variable '{var}' more than once"
                )));
            }
        }

        let reachable = self.all_vars();
        for name in self.trace_vars() {
            if !reachable.contains(&name.as_str()) {
                return Err(BranchdagError::InvalidDynamic(format!(
                    "target '{target}' traces '{name}', which is not one of its dynamic variables"
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for DynamicSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}", self.kind(), self.which_vars().join(", "))?;
        if let Some(by) = self.which_by() {
            write!(f, ", by = {by}")?;
        }
        if !self.trace_vars().is_empty() {
            write!(f, ", trace = {}", self.trace_vars().join(", "))?;
        }
        write!(f, ")")
    }
}
