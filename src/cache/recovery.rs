// src/cache/recovery.rs

//! Recovery of historical sub-target results.

use anyhow::Result;
use dashmap::DashMap;
use tracing::info;

use crate::cache::Cache;
use crate::value::Value;

/// Restores a previously built result into the cache so it does not have
/// to be rebuilt.
///
/// Returns `Ok(true)` if `name` was recovered. Errors are reported per
/// candidate; the registrar treats them as "not recovered".
pub trait Recovery: Send + Sync {
    fn recover(&self, name: &str, cache: &dyn Cache) -> Result<bool>;
}

/// Recovery from an in-memory archive of earlier results keyed by name.
#[derive(Debug, Default)]
pub struct ArchiveRecovery {
    archive: DashMap<String, Value>,
}

impl ArchiveRecovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn archive(&self, name: impl Into<String>, value: Value) {
        self.archive.insert(name.into(), value);
    }
}

impl Recovery for ArchiveRecovery {
    fn recover(&self, name: &str, cache: &dyn Cache) -> Result<bool> {
        let Some(value) = self.archive.get(name).map(|v| v.value().clone()) else {
            return Ok(false);
        };
        let meta = cache.put(name, value)?;
        info!(name = %name, hash = %meta.hash, "recovered sub-target from archive");
        Ok(true)
    }
}
