// src/engine/read.rs

use serde_json::Value as Json;
use tracing::debug;

use crate::engine::session::Session;
use crate::engine::TargetName;
use crate::errors::Result;

/// Where [`Session::read_trace`] looks for the aggregated value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceSource {
    /// The in-memory value held by the session.
    Live,
    /// The persisted value in the cache.
    Cache,
}

impl Session {
    /// Sub-target names of a dynamic target: the ones registered in this
    /// session, else the ones its cached aggregate was built from.
    pub fn subtargets(&self, target: &str) -> Result<Vec<TargetName>> {
        let layout = self.layout_of(target)?;
        if !layout.subtargets.is_empty() {
            return Ok(layout.subtargets);
        }
        let cached = self
            .cache
            .get_meta(target)?
            .and_then(|m| m.subtargets)
            .unwrap_or_default();
        Ok(cached)
    }

    /// Trace entries named `trace` of dynamic target `target`, one per
    /// sub-target.
    ///
    /// `Ok(None)` if the value is unavailable or carries no such trace.
    pub fn read_trace(
        &self,
        trace: &str,
        target: &str,
        source: TraceSource,
    ) -> Result<Option<Vec<Json>>> {
        let value = match source {
            TraceSource::Live => self.live_value(target),
            TraceSource::Cache => self.cache.get(target)?,
        };
        let Some(value) = value else {
            debug!(target = %target, source = ?source, "no value to read a trace from");
            return Ok(None);
        };
        Ok(value.trace_of(trace).map(<[Json]>::to_vec))
    }
}
