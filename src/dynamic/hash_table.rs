// src/dynamic/hash_table.rs

use dashmap::DashMap;

/// Concurrent string-keyed memo table scoped to one build session.
///
/// Used as a set (`mark` / `exists`) or a map (`set` / `get`). Never
/// persisted; cleared between sessions.
#[derive(Debug)]
pub struct HashTable<V = ()> {
    inner: DashMap<String, V>,
}

impl<V> HashTable<V> {
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    pub fn exists(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        self.inner.insert(key.into(), value);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&self) {
        self.inner.clear();
    }
}

impl<V: Clone> HashTable<V> {
    pub fn get(&self, key: &str) -> Option<V> {
        self.inner.get(key).map(|entry| entry.value().clone())
    }
}

impl HashTable<()> {
    pub fn mark(&self, key: impl Into<String>) {
        self.set(key, ());
    }
}

impl<V> Default for HashTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-session memo tables.
#[derive(Debug, Default)]
pub struct SessionMemo {
    /// Targets declared with a dynamic spec.
    pub dynamic_targets: HashTable,
    /// Targets some dynamic target fans out over.
    pub dynamic_deps: HashTable,
    /// Dynamic targets whose sub-targets have been registered.
    pub registered: HashTable,
    /// Element counts by target name.
    pub sizes: HashTable<usize>,
}

impl SessionMemo {
    pub fn clear(&self) {
        self.dynamic_targets.clear();
        self.dynamic_deps.clear();
        self.registered.clear();
        self.sizes.clear();
    }
}
