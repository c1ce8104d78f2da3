// src/engine/mod.rs

//! Dynamic expansion engine.
//!
//! Everything session-scoped (graph, layout table, queue, remaining counter,
//! memo tables, live values) is owned by one [`Session`] value and reached
//! through `&Session`, so independent dynamic targets can be registered
//! from several threads.
//!
//! - [`session`]: construction, dependency digests and sizes, live values.
//! - [`registrar`]: sub-target discovery and registration.
//! - [`aggregate`]: sub-target inputs and reassembly of the parent value.
//! - [`read`]: user-facing lookups (sub-target lists, traces).
//! - [`driver`]: a minimal sequential loop used by the preview CLI.

/// Canonical target name type used throughout the engine.
pub type TargetName = String;

/// Session behaviour knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Keep at most this many sub-targets per dynamic target.
    pub max_expand: Option<usize>,
    /// Threads used for element hashing and recovery checks.
    pub hash_workers: usize,
    /// Drop sub-targets that are already cached.
    pub precheck: bool,
    /// Try to recover historical results for the remaining sub-targets.
    pub recover: bool,
    pub seed: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_expand: None,
            hash_workers: 4,
            precheck: true,
            recover: false,
            seed: 0,
        }
    }
}

pub mod aggregate;
pub mod driver;
pub mod read;
pub mod registrar;
pub mod session;

pub use driver::{Driver, IdentityBody, RunReport, TargetBody};
pub use read::TraceSource;
pub use registrar::Registration;
pub use session::Session;
