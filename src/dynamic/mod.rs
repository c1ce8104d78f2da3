// src/dynamic/mod.rs

//! Dynamic branching primitives.
//!
//! - [`spec`]: the `map` / `cross` / `combine` fan-out algebra.
//! - [`namer`]: content-derived sub-target names.
//! - [`index`]: sub-target ordinal → element positions per variable.
//! - [`trace`]: provenance attached to aggregated values.
//! - [`hash_table`]: session-scoped memo tables.

pub mod hash_table;
pub mod index;
pub mod namer;
pub mod spec;
pub mod trace;

pub use hash_table::{HashTable, SessionMemo};
pub use index::{FanoutShape, Slices};
pub use spec::DynamicSpec;
pub use trace::{build_trace, subtarget_trace};
