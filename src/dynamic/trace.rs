// src/dynamic/trace.rs

//! Provenance ("trace") attached to an aggregated dynamic value.

use std::collections::BTreeMap;

use serde_json::Value as Json;
use tracing::debug;

use crate::dynamic::DynamicSpec;
use crate::dynamic::index::{FanoutShape, mixed_radix};
use crate::value::{Trace, Value};

/// Build the trace for a dynamic target with `n_subtargets` sub-targets.
///
/// `flat` holds the in-memory value of every trace variable, already
/// flattened to its element sequence. Returns `None` when `spec` traces
/// nothing.
pub fn build_trace(
    spec: &DynamicSpec,
    shape: &FanoutShape,
    flat: &BTreeMap<String, Vec<Json>>,
    n_subtargets: usize,
) -> Option<Trace> {
    let names = spec.trace_vars();
    if names.is_empty() {
        return None;
    }

    let mut trace = Trace::new();
    for name in names {
        let elements = flat.get(name).map(Vec::as_slice).unwrap_or(&[]);
        let values: Vec<Json> = match spec {
            DynamicSpec::Map { .. } => elements.iter().take(n_subtargets).cloned().collect(),
            DynamicSpec::Cross { .. } => {
                let vars = spec.which_vars();
                let radices = shape.radices(&vars);
                let slot = vars.iter().position(|v| *v == name.as_str());
                (0..n_subtargets)
                    .map(|ordinal| {
                        let pos = slot.zip(mixed_radix(ordinal, &radices)).map(|(s, d)| d[s]);
                        element_at(elements, pos)
                    })
                    .collect()
            }
            DynamicSpec::Combine { .. } => match &shape.groups {
                Some(groups) => groups
                    .iter()
                    .take(n_subtargets)
                    .map(|g| element_at(elements, g.first().copied()))
                    .collect(),
                None => elements.iter().take(n_subtargets).cloned().collect(),
            },
        };
        trace.insert(name.clone(), values);
    }

    debug!(spec = %spec, names = ?names, "built trace");
    Some(trace)
}

fn element_at(elements: &[Json], pos: Option<usize>) -> Json {
    pos.and_then(|p| elements.get(p))
        .cloned()
        .unwrap_or(Json::Null)
}

/// Trace entry of sub-target `ordinal` in an aggregated value.
pub fn subtarget_trace<'a>(value: &'a Value, name: &str, ordinal: usize) -> Option<&'a Json> {
    value.trace_of(name)?.get(ordinal)
}
