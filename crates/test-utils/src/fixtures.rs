#![allow(dead_code)]

use std::sync::Arc;

use branchdag::cache::MemoryCache;
use branchdag::config::ConfigFile;
use branchdag::engine::{Driver, IdentityBody, RunReport, Session};

/// A session over `cfg` with a fresh in-memory cache.
pub fn session_for(cfg: &ConfigFile) -> (Session, Arc<MemoryCache>) {
    let cache = Arc::new(MemoryCache::new());
    let session = Session::from_config(cfg, cache.clone()).expect("session should start");
    (session, cache)
}

/// A session over `cfg` reusing an existing cache (a later "run").
pub fn session_with_cache(cfg: &ConfigFile, cache: Arc<MemoryCache>) -> Session {
    Session::from_config(cfg, cache).expect("session should start")
}

/// Drive `session` to completion with identity target bodies.
pub fn run_identity(session: &Session) -> RunReport {
    Driver::new(session, IdentityBody)
        .run()
        .expect("run should succeed")
}
