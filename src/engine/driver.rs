// src/engine/driver.rs

//! Minimal sequential build loop.
//!
//! Not a scheduler: it pops ready targets one at a time and runs them in
//! the calling thread. It exists so the preview CLI and the tests can push
//! a plan through registration, sub-target builds and aggregation.

use std::collections::BTreeMap;

use serde_json::{Map, Value as Json};
use tracing::{debug, info, warn};

use crate::dag::Layout;
use crate::engine::registrar::Registration;
use crate::engine::session::{Session, lock};
use crate::engine::TargetName;
use crate::errors::{BranchdagError, Result};
use crate::value::{Payload, Value, inputs_digest};

/// Computes the value of a static target or sub-target from its inputs.
pub trait TargetBody: Send + Sync {
    fn build(
        &self,
        layout: &Layout,
        inputs: &BTreeMap<TargetName, Payload>,
    ) -> anyhow::Result<Payload>;
}

/// Passes a single input through unchanged. With several inputs, produces
/// one record mapping each input name to its elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityBody;

impl TargetBody for IdentityBody {
    fn build(
        &self,
        _layout: &Layout,
        inputs: &BTreeMap<TargetName, Payload>,
    ) -> anyhow::Result<Payload> {
        if inputs.len() == 1 {
            if let Some(only) = inputs.values().next() {
                return Ok(only.clone());
            }
        }
        let record: Map<String, Json> = inputs
            .iter()
            .map(|(name, payload)| (name.clone(), Json::Array(payload.elements_as_json())))
            .collect();
        Ok(Payload::Seq(vec![Json::Object(record)]))
    }
}

/// What a [`Driver::run`] did.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Static targets and sub-targets built, in build order.
    pub built: Vec<TargetName>,
    /// Static targets skipped because their cached value is current.
    pub skipped: Vec<TargetName>,
    /// Dynamic targets aggregated, in order.
    pub aggregated: Vec<TargetName>,
    pub registrations: Vec<Registration>,
}

pub struct Driver<'a, B: TargetBody> {
    session: &'a Session,
    body: B,
}

impl<'a, B: TargetBody> Driver<'a, B> {
    pub fn new(session: &'a Session, body: B) -> Self {
        Self { session, body }
    }

    /// Queue every declared target behind its dependencies in the graph.
    ///
    /// Counts come from the graph rather than the declarations so that each
    /// count matches the number of `complete` calls the target will see.
    fn seed(&self) {
        let plan = self.session.plan();
        let counts: Vec<(TargetName, usize)> = self.session.with_graph(|graph| {
            plan.targets()
                .map(|decl| (decl.name.clone(), graph.dependencies_of(&decl.name).len()))
                .collect()
        });
        let inserted: usize = {
            let mut queue = lock(&self.session.queue);
            counts
                .into_iter()
                .map(|(name, outstanding)| queue.push(&[name], outstanding))
                .sum()
        };
        self.session.increase_remaining(inserted);
        debug!(targets = inserted, "seeded execution queue");
    }

    pub fn run(&self) -> Result<RunReport> {
        self.seed();
        let mut report = RunReport::default();

        loop {
            let next = lock(&self.session.queue).pop_ready();
            let Some(name) = next else {
                break;
            };
            self.step(&name, &mut report)?;
            self.session.complete(&name);
        }

        let stuck = lock(&self.session.queue).names();
        if !stuck.is_empty() {
            warn!(stuck = ?stuck, "targets left in the queue with unfinished dependencies");
            return Err(BranchdagError::Stalled(stuck));
        }
        info!(
            built = report.built.len(),
            skipped = report.skipped.len(),
            aggregated = report.aggregated.len(),
            remaining = self.session.remaining(),
            "run finished"
        );
        Ok(report)
    }

    fn step(&self, name: &str, report: &mut RunReport) -> Result<()> {
        let layout = self.session.layout_of(name)?;

        if layout.is_dynamic {
            if self.session.is_registered(name) {
                self.session.build_dynamic(name)?;
                report.aggregated.push(name.to_string());
            } else {
                let registration = self.session.register_subtargets(name)?;
                report.registrations.push(registration);
            }
            return Ok(());
        }

        if layout.is_subtarget {
            let inputs = self.session.subtarget_inputs(name)?;
            let value = Value::new(self.build_body(&layout, &inputs)?);
            self.session.cache().put(name, value)?;
            report.built.push(name.to_string());
            debug!(name = %name, "built");
            return Ok(());
        }

        if self.session.is_literal(name) {
            report.skipped.push(name.to_string());
            return Ok(());
        }

        let mut inputs = BTreeMap::new();
        for dep in &layout.deps_build {
            inputs.insert(dep.clone(), self.session.value_of(dep)?.payload);
        }
        let digest = inputs_digest(&inputs);
        let cached = self.session.cache().get_meta(name)?;
        if cached.as_ref().and_then(|m| m.inputs.as_deref()) == Some(digest.as_str()) {
            debug!(name = %name, "cached value is current; skipping");
            report.skipped.push(name.to_string());
            return Ok(());
        }

        let value = Value::new(self.build_body(&layout, &inputs)?);
        let mut meta = self.session.cache().put(name, value.clone())?;
        meta.inputs = Some(digest);
        self.session.cache().set_meta(name, meta)?;
        self.session.set_live(name, value);
        report.built.push(name.to_string());
        debug!(name = %name, "built");
        Ok(())
    }

    fn build_body(
        &self,
        layout: &Layout,
        inputs: &BTreeMap<TargetName, Payload>,
    ) -> Result<Payload> {
        self.body
            .build(layout, inputs)
            .map_err(|e| BranchdagError::Other(e.context(format!("building '{}'", layout.name))))
    }
}
