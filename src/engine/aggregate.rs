// src/engine/aggregate.rs

//! Inputs of sub-targets and reassembly of the parent value.

use std::collections::BTreeMap;

use serde_json::Value as Json;
use tracing::{debug, info};

use crate::dag::DepSlice;
use crate::dynamic::{DynamicSpec, build_trace};
use crate::engine::session::Session;
use crate::engine::TargetName;
use crate::errors::{BranchdagError, Result};
use crate::value::subset::subset;
use crate::value::{Payload, Trace, Value};

impl Session {
    /// Inputs of a registered sub-target, keyed by variable name.
    ///
    /// A static variable contributes the subset of its value at the
    /// resolved positions. A dynamic variable contributes the values of the
    /// sibling sub-targets consumed: the payload itself for a single
    /// sibling, otherwise a dynamic payload listing them in order.
    pub fn subtarget_inputs(&self, sub: &str) -> Result<BTreeMap<TargetName, Payload>> {
        let layout = self.layout_of(sub)?;
        if !layout.is_subtarget {
            return Err(BranchdagError::InvalidDynamic(format!(
                "'{sub}' is not a registered sub-target"
            )));
        }

        let mut inputs = BTreeMap::new();
        for (var, slice) in &layout.slices {
            let payload = match slice {
                DepSlice::Positions(positions) => subset(&self.value_of(var)?.payload, positions),
                DepSlice::Siblings(names) => {
                    let mut parts = names
                        .iter()
                        .map(|name| {
                            self.cache
                                .get(name)?
                                .map(|v| v.payload)
                                .ok_or_else(|| BranchdagError::MissingCacheEntry(name.clone()))
                        })
                        .collect::<Result<Vec<_>>>()?;
                    if parts.len() == 1 {
                        parts.remove(0)
                    } else {
                        Payload::Dynamic(parts)
                    }
                }
            };
            inputs.insert(var.clone(), payload);
        }
        Ok(inputs)
    }

    /// Reassemble a dynamic target from its built sub-targets.
    ///
    /// The sub-target values are fetched by content hash in registration
    /// order, wrapped in a dynamic payload, traced, stored under the
    /// parent's name and kept as its live value. The sub-target hashes
    /// double as the aggregate's element digests.
    pub fn build_dynamic(&self, target: &str) -> Result<Value> {
        let layout = self.layout_of(target)?;
        let spec = layout.dynamic.ok_or_else(|| {
            BranchdagError::InvalidDynamic(format!("target '{target}' is not dynamic"))
        })?;
        let subtargets = layout.subtargets;

        let hashes = subtargets
            .iter()
            .map(|sub| {
                self.cache
                    .get_meta(sub)?
                    .map(|m| m.hash)
                    .ok_or_else(|| BranchdagError::MissingCacheEntry(sub.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        let parts = self
            .cache
            .mget_by_hash(&hashes)?
            .into_iter()
            .zip(&subtargets)
            .map(|(value, sub)| {
                value
                    .map(|v| v.payload)
                    .ok_or_else(|| BranchdagError::MissingCacheEntry(sub.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        let trace = self.trace_for(&spec, subtargets.len())?;
        let value = Value::with_trace(Payload::Dynamic(parts), trace);

        let mut meta = self.cache.put(target, value.clone())?;
        meta.dynamic_hashes = Some(hashes);
        meta.subtargets = Some(subtargets.clone());
        self.cache.set_meta(target, meta)?;
        self.memo.sizes.set(target, subtargets.len());
        self.set_live(target, value.clone());

        info!(target = %target, parts = subtargets.len(), "aggregated dynamic target");
        Ok(value)
    }

    fn trace_for(&self, spec: &DynamicSpec, n_subtargets: usize) -> Result<Option<Trace>> {
        if spec.trace_vars().is_empty() {
            return Ok(None);
        }
        let shape = self.fanout_shape(spec)?;
        let mut flat: BTreeMap<String, Vec<Json>> = BTreeMap::new();
        for name in spec.trace_vars() {
            let value = self.value_of(name)?;
            flat.insert(name.clone(), value.payload.elements_as_json());
        }
        debug!(vars = ?spec.trace_vars(), "collected trace inputs");
        Ok(build_trace(spec, &shape, &flat, n_subtargets))
    }
}
