// src/cache/memory.rs

use anyhow::Result;
use dashmap::DashMap;
use tracing::{debug, trace};

use crate::cache::{Cache, CachedMeta};
use crate::value::{Elements, Value};

/// Stores values in memory only (lost when dropped).
///
/// Values are kept once per content hash; names map to metadata.
#[derive(Debug, Default)]
pub struct MemoryCache {
    meta: DashMap<String, CachedMeta>,
    values: DashMap<String, Value>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of named entries.
    pub fn len(&self) -> usize {
        self.meta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meta.is_empty()
    }

    /// Names of all entries, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.meta.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl Cache for MemoryCache {
    fn get(&self, name: &str) -> Result<Option<Value>> {
        let Some(hash) = self.meta.get(name).map(|m| m.hash.clone()) else {
            return Ok(None);
        };
        Ok(self.values.get(&hash).map(|v| v.value().clone()))
    }

    fn get_meta(&self, name: &str) -> Result<Option<CachedMeta>> {
        Ok(self.meta.get(name).map(|m| m.value().clone()))
    }

    fn set_meta(&self, name: &str, meta: CachedMeta) -> Result<()> {
        trace!(name = %name, hash = %meta.hash, "updating cached metadata");
        self.meta.insert(name.to_string(), meta);
        Ok(())
    }

    fn put(&self, name: &str, value: Value) -> Result<CachedMeta> {
        let meta = CachedMeta {
            hash: value.payload.digest(),
            size: value.payload.element_count(),
            dynamic_hashes: None,
            subtargets: None,
            inputs: None,
        };
        debug!(name = %name, hash = %meta.hash, size = meta.size, "stored value (memory)");
        self.values.insert(meta.hash.clone(), value);
        self.meta.insert(name.to_string(), meta.clone());
        Ok(meta)
    }

    fn exists(&self, name: &str) -> bool {
        self.meta.contains_key(name)
    }

    fn mget_by_hash(&self, hashes: &[String]) -> Result<Vec<Option<Value>>> {
        Ok(hashes
            .iter()
            .map(|h| self.values.get(h).map(|v| v.value().clone()))
            .collect())
    }
}
