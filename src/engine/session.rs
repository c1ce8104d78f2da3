// src/engine/session.rs

//! The build-session context object.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use crate::cache::{Cache, Recovery};
use crate::config::model::ConfigFile;
use crate::dag::{DependencyGraph, ExecutionQueue, Layout, LayoutTable, Plan, RemainingCounter};
use crate::dynamic::index::distinct_groups;
use crate::dynamic::namer::{self, DigestLists};
use crate::dynamic::{DynamicSpec, FanoutShape, SessionMemo};
use crate::engine::{SessionSettings, TargetName};
use crate::errors::{BranchdagError, Result};
use crate::value::{Elements, Value};

/// One build session.
///
/// Owns the session-scoped registries. Each registry sits behind its own
/// lock, held only for the duration of a single mutation; no method holds
/// two registry locks at once.
pub struct Session {
    settings: SessionSettings,
    plan: Plan,
    pub(crate) cache: Arc<dyn Cache>,
    pub(crate) recovery: Option<Arc<dyn Recovery>>,
    pub(crate) graph: Mutex<DependencyGraph>,
    pub(crate) layout: Mutex<LayoutTable>,
    pub(crate) queue: Mutex<ExecutionQueue>,
    pub(crate) remaining: RemainingCounter,
    pub(crate) memo: SessionMemo,
    live: RwLock<HashMap<TargetName, Value>>,
    /// Targets whose value comes from the pipeline file.
    literals: HashSet<TargetName>,
    pub(crate) pool: Option<ThreadPool>,
}

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Session {
    /// Start a session over `plan`, building the static graph and one layout
    /// per declared target.
    pub fn new(plan: Plan, cache: Arc<dyn Cache>, settings: SessionSettings) -> Result<Self> {
        let graph = DependencyGraph::from_plan(&plan)?;

        let mut layout = LayoutTable::new();
        for decl in plan.targets() {
            layout.insert(Layout::from_decl(decl, settings.seed));
        }

        let pool = match ThreadPoolBuilder::new()
            .num_threads(settings.hash_workers.max(1))
            .thread_name(|i| format!("branchdag-hash-{i}"))
            .build()
        {
            Ok(pool) => Some(pool),
            Err(e) => {
                warn!(error = %e, "could not build hashing pool; hashing sequentially");
                None
            }
        };

        let session = Self {
            settings,
            plan,
            cache,
            recovery: None,
            graph: Mutex::new(graph),
            layout: Mutex::new(layout),
            queue: Mutex::new(ExecutionQueue::new()),
            remaining: RemainingCounter::new(),
            memo: SessionMemo::default(),
            live: RwLock::new(HashMap::new()),
            literals: HashSet::new(),
            pool,
        };
        session.seed_memo();

        info!(
            targets = session.plan.len(),
            max_expand = ?settings.max_expand,
            hash_workers = settings.hash_workers,
            "build session started"
        );
        Ok(session)
    }

    /// Start a session from a validated pipeline file, storing every literal
    /// target value in `cache` first.
    pub fn from_config(cfg: &ConfigFile, cache: Arc<dyn Cache>) -> Result<Self> {
        let plan = Plan::from_config(cfg)?;
        let mut session = Self::new(plan, cache, cfg.config.settings())?;
        for (name, tc) in cfg.target.iter() {
            if let Some(value) = tc.literal_value()? {
                session.cache.put(name, value.clone())?;
                session.set_live(name, value);
                session.literals.insert(name.clone());
            }
        }
        Ok(session)
    }

    /// Attach the collaborator used when `recover` is enabled.
    pub fn with_recovery(mut self, recovery: Arc<dyn Recovery>) -> Self {
        self.recovery = Some(recovery);
        self
    }

    fn seed_memo(&self) {
        for decl in self.plan.targets() {
            if let Some(spec) = &decl.dynamic {
                self.memo.dynamic_targets.mark(decl.name.clone());
                for var in spec.all_vars() {
                    self.memo.dynamic_deps.mark(var);
                }
            }
        }
    }

    /// Forget memoized sizes and registrations, e.g. before rebuilding.
    pub fn reset_memo(&self) {
        self.memo.clear();
        self.seed_memo();
        debug!("session memo tables reset");
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    pub fn memo(&self) -> &SessionMemo {
        &self.memo
    }

    pub fn is_dynamic(&self, name: &str) -> bool {
        self.memo.dynamic_targets.exists(name)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.memo.registered.exists(name)
    }

    /// Outstanding work in this session.
    pub fn remaining(&self) -> usize {
        self.remaining.get()
    }

    pub fn increase_remaining(&self, n: usize) {
        self.remaining.increase(n);
    }

    pub fn layout_of(&self, name: &str) -> Result<Layout> {
        lock(&self.layout)
            .get(name)
            .cloned()
            .ok_or_else(|| BranchdagError::TargetNotFound(name.to_string()))
    }

    /// Run `f` with shared access to the dependency graph.
    pub fn with_graph<R>(&self, f: impl FnOnce(&DependencyGraph) -> R) -> R {
        f(&lock(&self.graph))
    }

    /// Run `f` with exclusive access to the execution queue.
    pub fn with_queue<R>(&self, f: impl FnOnce(&mut ExecutionQueue) -> R) -> R {
        f(&mut lock(&self.queue))
    }

    /// Record that `name` finished: one less unit of remaining work, and one
    /// less outstanding dependency for every queued dependent.
    pub fn complete(&self, name: &str) {
        self.remaining.decrease(1);
        let dependents = lock(&self.graph).dependents_of(name);
        lock(&self.queue).decrement(&dependents);
        debug!(name = %name, dependents = ?dependents, "target complete");
    }

    pub fn is_literal(&self, name: &str) -> bool {
        self.literals.contains(name)
    }

    pub fn set_live(&self, name: &str, value: Value) {
        let mut live = self.live.write().unwrap_or_else(PoisonError::into_inner);
        live.insert(name.to_string(), value);
    }

    pub fn live_value(&self, name: &str) -> Option<Value> {
        let live = self.live.read().unwrap_or_else(PoisonError::into_inner);
        live.get(name).cloned()
    }

    /// In-memory value of `name`, loading it from the cache on first use.
    pub fn value_of(&self, name: &str) -> Result<Value> {
        if let Some(value) = self.live_value(name) {
            return Ok(value);
        }
        let value = self
            .cache
            .get(name)?
            .ok_or_else(|| BranchdagError::MissingCacheEntry(name.to_string()))?;
        self.set_live(name, value.clone());
        Ok(value)
    }

    /// Per-element digests of a cached target, computed and written back to
    /// its metadata on first use.
    pub fn element_digests(&self, name: &str) -> Result<Vec<String>> {
        let mut meta = self
            .cache
            .get_meta(name)?
            .ok_or_else(|| BranchdagError::MissingCacheEntry(name.to_string()))?;
        if let Some(hashes) = &meta.dynamic_hashes {
            return Ok(hashes.clone());
        }

        let value = self
            .cache
            .get(name)?
            .ok_or_else(|| BranchdagError::MissingCacheEntry(name.to_string()))?;
        let payload = &value.payload;
        let n = payload.element_count();
        let digests: Vec<String> = match &self.pool {
            Some(pool) => pool.install(|| {
                (0..n)
                    .into_par_iter()
                    .map(|i| payload.element_digest(i))
                    .collect()
            }),
            None => payload.element_digests(),
        };
        debug!(name = %name, elements = n, "digested dependency elements");

        meta.dynamic_hashes = Some(digests.clone());
        self.cache.set_meta(name, meta)?;
        self.memo.sizes.set(name, n);
        Ok(digests)
    }

    /// Element count of a cached target.
    pub fn size_of(&self, name: &str) -> Result<usize> {
        if let Some(size) = self.memo.sizes.get(name) {
            return Ok(size);
        }
        let meta = self
            .cache
            .get_meta(name)?
            .ok_or_else(|| BranchdagError::MissingCacheEntry(name.to_string()))?;
        self.memo.sizes.set(name, meta.size);
        Ok(meta.size)
    }

    /// Sizes (and groups, for a grouped combine) of the variables `spec`
    /// fans out over.
    pub fn fanout_shape(&self, spec: &DynamicSpec) -> Result<FanoutShape> {
        let mut sizes = BTreeMap::new();
        for var in spec.all_vars() {
            sizes.insert(var.to_string(), self.size_of(var)?);
        }
        let groups = match spec.which_by() {
            Some(by) => Some(distinct_groups(&self.element_digests(by)?)),
            None => None,
        };
        Ok(FanoutShape { sizes, groups })
    }

    /// Ordered candidate sub-target names of a dynamic target.
    pub fn subtarget_names(&self, target: &str) -> Result<Vec<TargetName>> {
        let spec = self.layout_of(target)?.dynamic.ok_or_else(|| {
            BranchdagError::InvalidDynamic(format!("target '{target}' is not dynamic"))
        })?;
        self.names_for(target, &spec)
    }

    pub(crate) fn names_for(&self, target: &str, spec: &DynamicSpec) -> Result<Vec<TargetName>> {
        let mut digests = DigestLists::new();
        for var in spec.all_vars() {
            digests.insert(var.to_string(), self.element_digests(var)?);
        }
        namer::subtarget_names(target, spec, &digests, self.settings.max_expand)
    }
}
