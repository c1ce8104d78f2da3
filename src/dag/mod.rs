// src/dag/mod.rs

//! Session graph, queue and per-target bookkeeping.
//!
//! - [`graph`] holds the incrementally growing dependency graph.
//! - [`queue`] contains the execution queue and the remaining-work counter.
//! - [`layout`] provides per-target layout records.
//! - [`target_info`] defines declared targets and the plan.

pub mod graph;
pub mod layout;
pub mod queue;
pub mod target_info;

pub use graph::{DependencyGraph, UnionStats};
pub use layout::{DepSlice, Layout, LayoutTable};
pub use queue::{ExecutionQueue, RemainingCounter};
pub use target_info::{Plan, TargetDecl};
