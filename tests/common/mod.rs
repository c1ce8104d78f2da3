#![allow(dead_code)]

use branchdag::value::{Elements, Payload};
use serde_json::Value as Json;

pub use branchdag_test_utils::init_tracing;

/// Per-element digests of a literal sequence, as the session computes them.
pub fn seq_digests<T: Into<Json>>(items: impl IntoIterator<Item = T>) -> Vec<String> {
    Payload::Seq(items.into_iter().map(Into::into).collect()).element_digests()
}

pub fn strs(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
