// src/dag/queue.rs

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, warn};

use crate::engine::TargetName;

#[derive(Debug, Clone, PartialEq, Eq)]
struct QueueEntry {
    name: TargetName,
    /// Dependencies this target still waits on.
    outstanding: usize,
}

/// Targets waiting to be built, each with an outstanding dependency count.
///
/// Semantics:
/// - `push` inserts targets (or overwrites the count of targets already
///   queued, so re-pushing never duplicates an entry).
/// - `decrement` is called when a dependency finishes.
/// - `pad` raises the count of queued targets when new upstream work shows
///   up after they were queued (dynamic sub-targets).
/// - `pop_ready` removes the oldest target whose count reached zero.
#[derive(Debug, Default)]
pub struct ExecutionQueue {
    entries: VecDeque<QueueEntry>,
}

impl ExecutionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    /// Outstanding count of a queued target.
    pub fn outstanding_of(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.outstanding)
    }

    /// Queued target names in queue order.
    pub fn names(&self) -> Vec<TargetName> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    /// Returns how many targets were newly inserted.
    pub fn push(&mut self, targets: &[TargetName], outstanding: usize) -> usize {
        let mut inserted = 0;
        for name in targets {
            match self.entries.iter_mut().find(|e| &e.name == name) {
                Some(entry) => {
                    debug!(name = %name, outstanding, "re-queued target; updating count");
                    entry.outstanding = outstanding;
                }
                None => {
                    self.entries.push_back(QueueEntry {
                        name: name.clone(),
                        outstanding,
                    });
                    inserted += 1;
                }
            }
        }
        inserted
    }

    /// Signal that one dependency of each queued target in `targets` finished.
    pub fn decrement(&mut self, targets: &[TargetName]) {
        for entry in self
            .entries
            .iter_mut()
            .filter(|e| targets.contains(&e.name))
        {
            if entry.outstanding == 0 {
                warn!(name = %entry.name, "decrement below zero ignored");
                continue;
            }
            entry.outstanding -= 1;
        }
    }

    /// Add one outstanding dependency to each queued target in `targets`.
    ///
    /// Returns how many entries were padded.
    pub fn pad(&mut self, targets: &[TargetName]) -> usize {
        let mut padded = 0;
        for entry in self
            .entries
            .iter_mut()
            .filter(|e| targets.contains(&e.name))
        {
            entry.outstanding += 1;
            padded += 1;
        }
        padded
    }

    /// Remove and return the oldest target with no outstanding dependencies.
    pub fn pop_ready(&mut self) -> Option<TargetName> {
        let pos = self.entries.iter().position(|e| e.outstanding == 0)?;
        self.entries.remove(pos).map(|e| e.name)
    }
}

/// Session-wide count of unfinished work.
#[derive(Debug, Default)]
pub struct RemainingCounter(AtomicUsize);

impl RemainingCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increase(&self, n: usize) {
        self.0.fetch_add(n, Ordering::SeqCst);
    }

    /// Saturating decrease.
    pub fn decrease(&self, n: usize) {
        let _ = self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cur| {
                Some(cur.saturating_sub(n))
            });
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
