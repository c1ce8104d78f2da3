// src/engine/registrar.rs

//! Sub-target discovery and registration.

use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::cache::Recovery;
use crate::dag::{DepSlice, Layout};
use crate::dynamic::{DynamicSpec, FanoutShape, index};
use crate::engine::session::{Session, lock};
use crate::engine::TargetName;
use crate::errors::{BranchdagError, Result};

/// Outcome of registering one dynamic target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub target: TargetName,
    /// Every candidate sub-target, in order.
    pub subtargets: Vec<TargetName>,
    /// Candidates that still need building, queued with no outstanding deps.
    pub to_build: Vec<TargetName>,
    /// Whether the parent was (re-)queued to aggregate afterwards.
    pub parent_queued: bool,
}

/// Marks a target registered when dropped, on success and failure alike.
struct RegisteredMark<'a> {
    session: &'a Session,
    target: &'a str,
}

impl Drop for RegisteredMark<'_> {
    fn drop(&mut self) {
        self.session.memo.registered.mark(self.target);
    }
}

impl Session {
    /// Discover and register the sub-targets of dynamic target `target`.
    ///
    /// Sub-targets are added to the graph (as dependencies of the parent)
    /// and the layout table; those that still need building are queued.
    /// The parent itself is re-queued behind its new sub-targets unless
    /// its cached aggregate is already current, and queued dependents of
    /// the parent get one extra outstanding dependency.
    pub fn register_subtargets(&self, target: &str) -> Result<Registration> {
        let _mark = RegisteredMark {
            session: self,
            target,
        };

        let parent = self.layout_of(target)?;
        let spec = parent.dynamic.clone().ok_or_else(|| {
            BranchdagError::InvalidDynamic(format!("target '{target}' is not dynamic"))
        })?;

        let subtargets = self.names_for(target, &spec)?;
        let to_build = self.filter_subtargets(&subtargets);

        if !subtargets.is_empty() {
            let shape = self.fanout_shape(&spec)?;
            self.register_in_graph(target, &subtargets)?;
            self.register_in_layout(&parent, &spec, &shape, &subtargets)?;
        }

        if !to_build.is_empty() {
            let inserted = lock(&self.queue).push(&to_build, 0);
            self.remaining.increase(inserted);
        }

        let parent_ok = to_build.is_empty() && self.aggregate_is_current(target, &subtargets)?;
        if !parent_ok {
            let inserted = lock(&self.queue).push(&[target.to_string()], to_build.len());
            self.remaining.increase(inserted);
            if inserted > 0 {
                self.pad_dependents(target);
            }
        }

        info!(
            target = %target,
            spec = %spec,
            subtargets = subtargets.len(),
            to_build = to_build.len(),
            parent_queued = !parent_ok,
            "registered sub-targets"
        );

        Ok(Registration {
            target: target.to_string(),
            subtargets,
            to_build,
            parent_queued: !parent_ok,
        })
    }

    /// Drop candidates already cached (precheck) or recoverable (recover).
    fn filter_subtargets(&self, names: &[TargetName]) -> Vec<TargetName> {
        let pending: Vec<TargetName> = if self.settings().precheck {
            names
                .iter()
                .filter(|n| !self.cache.exists(n))
                .cloned()
                .collect()
        } else {
            names.to_vec()
        };

        if !self.settings().recover || pending.is_empty() {
            return pending;
        }
        let Some(recovery) = self.recovery.as_deref() else {
            debug!("recover enabled but no recovery collaborator attached");
            return pending;
        };

        let recovered: Vec<bool> = match &self.pool {
            Some(pool) => pool.install(|| {
                pending
                    .par_iter()
                    .map(|n| self.try_recover(recovery, n))
                    .collect()
            }),
            None => pending.iter().map(|n| self.try_recover(recovery, n)).collect(),
        };
        pending
            .into_iter()
            .zip(recovered)
            .filter_map(|(name, ok)| (!ok).then_some(name))
            .collect()
    }

    fn try_recover(&self, recovery: &dyn Recovery, name: &str) -> bool {
        match recovery.recover(name, self.cache.as_ref()) {
            Ok(recovered) => {
                if recovered {
                    debug!(name = %name, "recovered sub-target");
                }
                recovered
            }
            Err(e) => {
                warn!(name = %name, error = %e, "recovery failed; sub-target will be built");
                false
            }
        }
    }

    fn register_in_graph(&self, target: &str, subtargets: &[TargetName]) -> Result<()> {
        let edges: Vec<(TargetName, TargetName)> = subtargets
            .iter()
            .map(|sub| (sub.clone(), target.to_string()))
            .collect();
        lock(&self.graph).union(std::iter::empty(), &edges)?;
        Ok(())
    }

    fn register_in_layout(
        &self,
        parent: &Layout,
        spec: &DynamicSpec,
        shape: &FanoutShape,
        subtargets: &[TargetName],
    ) -> Result<()> {
        // Sibling lists of dynamic variables, looked up before taking the
        // layout lock.
        let mut siblings: HashMap<&str, Vec<TargetName>> = HashMap::new();
        for var in spec.all_vars() {
            if self.is_dynamic(var) {
                siblings.insert(var, self.subtargets(var)?);
            }
        }

        let mut derived = Vec::with_capacity(subtargets.len());
        for (ordinal, name) in subtargets.iter().enumerate() {
            let positions = index::resolve(spec, shape, ordinal).ok_or_else(|| {
                BranchdagError::InvalidDynamic(format!(
                    "sub-target {ordinal} of '{}' is out of range",
                    parent.name
                ))
            })?;
            let slices = positions
                .into_iter()
                .map(|(var, pos)| {
                    let slice = match siblings.get(var.as_str()) {
                        Some(subs) => DepSlice::Siblings(
                            pos.iter().filter_map(|&p| subs.get(p).cloned()).collect(),
                        ),
                        None => DepSlice::Positions(pos),
                    };
                    (var, slice)
                })
                .collect::<BTreeMap<_, _>>();
            derived.push(parent.derive_subtarget(name, ordinal, slices));
        }

        let mut table = lock(&self.layout);
        for layout in derived {
            table.insert(layout);
        }
        if let Some(entry) = table.get_mut(&parent.name) {
            entry.subtargets = subtargets.to_vec();
        }
        Ok(())
    }

    /// The cached aggregate of `target` was assembled from exactly these
    /// sub-targets.
    fn aggregate_is_current(&self, target: &str, subtargets: &[TargetName]) -> Result<bool> {
        let meta = self.cache.get_meta(target)?;
        Ok(meta.and_then(|m| m.subtargets).as_deref() == Some(subtargets))
    }

    fn pad_dependents(&self, target: &str) {
        let dependents = lock(&self.graph).dependents_of(target);
        let padded = lock(&self.queue).pad(&dependents);
        if padded > 0 {
            debug!(target = %target, padded, "padded queued dependents");
        }
    }
}
