// src/dag/layout.rs

//! Per-target layout records maintained by the session.

use std::collections::{BTreeMap, HashMap};

use crate::dag::target_info::TargetDecl;
use crate::dynamic::DynamicSpec;
use crate::engine::TargetName;

/// Where a sub-target's slice of one variable comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepSlice {
    /// Element positions within a static dependency's value.
    Positions(Vec<usize>),
    /// Specific sub-targets of a dynamic dependency.
    Siblings(Vec<TargetName>),
}

/// Layout of one target (declared target or sub-target).
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub name: TargetName,
    /// `None` for static targets and for sub-targets.
    pub dynamic: Option<DynamicSpec>,
    /// Static dependencies.
    pub deps_build: Vec<TargetName>,
    /// Fan-out variables. On sub-targets, dynamic variables are replaced by
    /// the sibling sub-targets actually consumed.
    pub deps_dynamic: Vec<TargetName>,
    pub deps_trace: Vec<TargetName>,
    pub is_dynamic: bool,
    pub is_subtarget: bool,
    pub subtarget_parent: Option<TargetName>,
    pub subtarget_index: Option<usize>,
    /// Sub-targets only: what each variable contributes.
    pub slices: BTreeMap<TargetName, DepSlice>,
    /// Parents only: every discovered sub-target, in order.
    pub subtargets: Vec<TargetName>,
    pub seed: u64,
}

impl Layout {
    pub fn from_decl(decl: &TargetDecl, session_seed: u64) -> Self {
        let (deps_dynamic, deps_trace) = match &decl.dynamic {
            Some(spec) => (
                spec.all_vars().into_iter().map(String::from).collect(),
                spec.trace_vars().to_vec(),
            ),
            None => (Vec::new(), Vec::new()),
        };
        Self {
            name: decl.name.clone(),
            dynamic: decl.dynamic.clone(),
            deps_build: decl.deps.clone(),
            deps_dynamic,
            deps_trace,
            is_dynamic: decl.dynamic.is_some(),
            is_subtarget: false,
            subtarget_parent: None,
            subtarget_index: None,
            slices: BTreeMap::new(),
            subtargets: Vec::new(),
            seed: derive_seed(session_seed, &decl.name),
        }
    }

    /// Layout of sub-target number `ordinal` of this (dynamic) target.
    pub fn derive_subtarget(
        &self,
        name: &str,
        ordinal: usize,
        slices: BTreeMap<TargetName, DepSlice>,
    ) -> Layout {
        let deps_dynamic = slices
            .iter()
            .flat_map(|(var, slice)| match slice {
                DepSlice::Positions(_) => vec![var.clone()],
                DepSlice::Siblings(names) => names.clone(),
            })
            .collect();
        Layout {
            name: name.to_string(),
            dynamic: None,
            deps_build: self.deps_build.clone(),
            deps_dynamic,
            deps_trace: self.deps_trace.clone(),
            is_dynamic: false,
            is_subtarget: true,
            subtarget_parent: Some(self.name.clone()),
            subtarget_index: Some(ordinal),
            slices,
            subtargets: Vec::new(),
            seed: derive_seed(self.seed, name),
        }
    }
}

/// Derive a per-target seed from a base seed and a target name.
pub fn derive_seed(base: u64, name: &str) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&base.to_le_bytes());
    hasher.update(name.as_bytes());
    let bytes = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&bytes.as_bytes()[..8]);
    u64::from_le_bytes(head)
}

/// Layout records keyed by target name. Entries are only ever inserted or
/// replaced, never removed, during a session.
#[derive(Debug, Default)]
pub struct LayoutTable {
    entries: HashMap<TargetName, Layout>,
}

impl LayoutTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Layout> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Layout> {
        self.entries.get_mut(name)
    }

    pub fn insert(&mut self, layout: Layout) {
        self.entries.insert(layout.name.clone(), layout);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
