// src/cache/mod.rs

//! Content-addressable cache facade.
//!
//! The engine only talks to the [`Cache`] trait. [`MemoryCache`] is the
//! in-process implementation used by the preview CLI and tests; durable
//! backends live outside this crate.

pub mod memory;
pub mod recovery;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::value::Value;

pub use memory::MemoryCache;
pub use recovery::{ArchiveRecovery, Recovery};

/// Metadata stored beside a cached value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedMeta {
    /// Content digest of the value's payload.
    pub hash: String,
    /// Element count.
    pub size: usize,
    /// Memoized per-element digests, filled in lazily.
    #[serde(default)]
    pub dynamic_hashes: Option<Vec<String>>,
    /// Sub-targets an aggregated dynamic value was assembled from.
    #[serde(default)]
    pub subtargets: Option<Vec<String>>,
    /// Digest of the inputs a static target was built from.
    #[serde(default)]
    pub inputs: Option<String>,
}

/// Abstract value store keyed by target name, with values also addressable
/// by content hash.
///
/// `Ok(None)` means "not cached"; `Err` is reserved for backend failures.
pub trait Cache: Send + Sync {
    fn get(&self, name: &str) -> Result<Option<Value>>;
    fn get_meta(&self, name: &str) -> Result<Option<CachedMeta>>;
    fn set_meta(&self, name: &str, meta: CachedMeta) -> Result<()>;
    /// Store `value` under `name` and return its fresh metadata.
    fn put(&self, name: &str, value: Value) -> Result<CachedMeta>;
    fn exists(&self, name: &str) -> bool;
    /// Load values by content hash, preserving order.
    fn mget_by_hash(&self, hashes: &[String]) -> Result<Vec<Option<Value>>>;
}
