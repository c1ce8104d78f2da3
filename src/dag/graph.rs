// src/dag/graph.rs

use std::collections::HashMap;

use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use tracing::{debug, trace};

use crate::dag::target_info::Plan;
use crate::engine::TargetName;
use crate::errors::{BranchdagError, Result};

/// What a [`DependencyGraph::union`] call actually added.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnionStats {
    pub vertices_added: usize,
    pub edges_added: usize,
}

/// Session dependency graph.
///
/// Edge direction: dependency -> dependent. For a dynamic target, every
/// sub-target gets an edge `sub-target -> parent`.
///
/// The graph only grows: [`union`](Self::union) adds missing vertices and
/// edges, ignores ones already present, and rejects edges that would close
/// a cycle.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<TargetName, ()>,
    index: HashMap<TargetName, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the static graph of a plan.
    pub fn from_plan(plan: &Plan) -> Result<Self> {
        let mut graph = Self::new();
        let vertices: Vec<&str> = plan.targets().map(|t| t.name.as_str()).collect();
        let edges: Vec<(TargetName, TargetName)> = plan
            .targets()
            .flat_map(|t| t.deps.iter().map(|d| (d.clone(), t.name.clone())))
            .collect();
        graph.union(vertices, &edges)?;
        Ok(graph)
    }

    fn ensure_vertex(&mut self, name: &str) -> (NodeIndex, bool) {
        if let Some(&idx) = self.index.get(name) {
            return (idx, false);
        }
        let idx = self.graph.add_node(name.to_string());
        self.index.insert(name.to_string(), idx);
        (idx, true)
    }

    /// Merge vertices and `(from, to)` edges into the graph.
    ///
    /// Vertices named by edges are created as needed. Existing vertices and
    /// edges are left untouched.
    pub fn union<'a, I>(
        &mut self,
        vertices: I,
        edges: &[(TargetName, TargetName)],
    ) -> Result<UnionStats>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut stats = UnionStats::default();

        for name in vertices {
            if self.ensure_vertex(name).1 {
                stats.vertices_added += 1;
            }
        }

        for (from, to) in edges {
            let (a, new_a) = self.ensure_vertex(from);
            let (b, new_b) = self.ensure_vertex(to);
            stats.vertices_added += usize::from(new_a) + usize::from(new_b);

            if self.graph.contains_edge(a, b) {
                trace!(from = %from, to = %to, "edge already present");
                continue;
            }
            if a == b || has_path_connecting(&self.graph, b, a, None) {
                return Err(BranchdagError::DagCycle(format!(
                    "edge '{from}' -> '{to}' would create a cycle"
                )));
            }
            self.graph.add_edge(a, b, ());
            stats.edges_added += 1;
        }

        debug!(
            vertices_added = stats.vertices_added,
            edges_added = stats.edges_added,
            "merged into dependency graph"
        );
        Ok(stats)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn contains_edge(&self, from: &str, to: &str) -> bool {
        match (self.index.get(from), self.index.get(to)) {
            (Some(&a), Some(&b)) => self.graph.contains_edge(a, b),
            _ => false,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Return all target names, sorted.
    pub fn targets(&self) -> Vec<TargetName> {
        let mut names: Vec<TargetName> = self.index.keys().cloned().collect();
        names.sort();
        names
    }

    /// Immediate dependencies of a target, sorted.
    pub fn dependencies_of(&self, name: &str) -> Vec<TargetName> {
        self.neighbors(name, Direction::Incoming)
    }

    /// Immediate dependents of a target, sorted.
    pub fn dependents_of(&self, name: &str) -> Vec<TargetName> {
        self.neighbors(name, Direction::Outgoing)
    }

    fn neighbors(&self, name: &str, dir: Direction) -> Vec<TargetName> {
        let Some(&idx) = self.index.get(name) else {
            return Vec::new();
        };
        let mut out: Vec<TargetName> = self
            .graph
            .neighbors_directed(idx, dir)
            .map(|n| self.graph[n].clone())
            .collect();
        out.sort();
        out
    }
}
