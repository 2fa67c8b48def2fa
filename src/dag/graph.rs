// src/dag/graph.rs

use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::IndexSet;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::config::model::ConfigFile;
use crate::errors::{Result, StampedeError};
use crate::types::TargetId;

/// Direct dependencies of one target, as reported by a [`TargetResolver`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedDeps {
    pub static_deps: Vec<TargetId>,
    /// `None` when the target has no runtime-deps capability at all.
    pub runtime_deps: Option<Vec<TargetId>>,
}

impl ResolvedDeps {
    pub fn new(static_deps: Vec<TargetId>) -> Self {
        Self {
            static_deps,
            runtime_deps: None,
        }
    }

    pub fn with_runtime_deps(mut self, runtime_deps: Vec<TargetId>) -> Self {
        self.runtime_deps = Some(runtime_deps);
        self
    }

    /// Static deps followed by runtime deps, if any.
    pub fn all(&self) -> impl Iterator<Item = &TargetId> {
        self.static_deps
            .iter()
            .chain(self.runtime_deps.iter().flatten())
    }
}

/// Maps a target to its direct dependencies.
///
/// This is the boundary to whatever produced the build graph; the scheduler
/// never looks at targets beyond their names and edges.
pub trait TargetResolver {
    /// Returns `None` if `target` is unknown.
    fn resolve(&self, target: &str) -> Option<ResolvedDeps>;
}

impl TargetResolver for ConfigFile {
    fn resolve(&self, target: &str) -> Option<ResolvedDeps> {
        let tc = self.target.get(target)?;
        Some(ResolvedDeps {
            static_deps: tc.deps.clone(),
            runtime_deps: tc.runtime_deps.clone(),
        })
    }
}

#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Forward edges, deduplicated, in resolver order.
    deps: Vec<TargetId>,
    /// Reverse edges, in discovery order.
    dependents: Vec<TargetId>,
}

/// The reachable target graph for one build session.
///
/// Built once by [`DagGraph::build`] and then only read. Edges are fixed at
/// construction; the per-target scheduling state lives in
/// [`TargetQueue`](crate::dag::TargetQueue).
#[derive(Debug, Clone)]
pub struct DagGraph {
    roots: Vec<TargetId>,
    /// Targets in breadth-first visit order.
    order: Vec<TargetId>,
    nodes: HashMap<TargetId, DagNode>,
}

impl DagGraph {
    /// Traverse the graph breadth-first from `roots`.
    ///
    /// Fails with [`StampedeError::Construction`] if any root or reachable
    /// dependency cannot be resolved; no partial graph is returned.
    pub fn build<R>(roots: &[TargetId], resolver: &R) -> Result<Self>
    where
        R: TargetResolver + ?Sized,
    {
        let mut nodes: HashMap<TargetId, DagNode> = HashMap::new();
        let mut order: Vec<TargetId> = Vec::new();
        let mut visited: HashSet<TargetId> = HashSet::new();
        let mut worklist: VecDeque<TargetId> = VecDeque::new();

        for root in roots {
            if visited.insert(root.clone()) {
                worklist.push_back(root.clone());
            }
        }

        while let Some(target) = worklist.pop_front() {
            let resolved = resolver.resolve(&target).ok_or_else(|| {
                StampedeError::Construction(format!("unable to resolve target '{target}'"))
            })?;

            if resolved.runtime_deps.is_some() {
                debug!(target = %target, "target has runtime deps");
            }

            // Static and runtime deps may overlap; each edge is recorded once.
            let deps: IndexSet<TargetId> = resolved.all().cloned().collect();

            for dep in deps.iter() {
                nodes
                    .entry(dep.clone())
                    .or_default()
                    .dependents
                    .push(target.clone());

                if visited.insert(dep.clone()) {
                    worklist.push_back(dep.clone());
                }
            }

            nodes.entry(target.clone()).or_default().deps = deps.into_iter().collect();
            order.push(target);
        }

        debug!(
            roots = roots.len(),
            targets = order.len(),
            "built target dependency graph"
        );

        Ok(Self {
            roots: roots.to_vec(),
            order,
            nodes,
        })
    }

    /// Build the graph for the roots and targets of a validated session file.
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        Self::build(&cfg.session.roots, cfg)
    }

    pub fn roots(&self) -> &[TargetId] {
        &self.roots
    }

    /// All reachable targets, in the order they were visited.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Immediate dependencies of a target (static and runtime).
    pub fn dependencies_of(&self, name: &str) -> &[TargetId] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a target.
    pub fn dependents_of(&self, name: &str) -> &[TargetId] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// A dependency-first build order over every reachable target.
    ///
    /// Used where targets are built without the queue (solo mode, dry runs).
    pub fn topological_order(&self) -> Result<Vec<TargetId>> {
        // Edge direction: dep -> dependent.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        for name in self.order.iter() {
            graph.add_node(name.as_str());
        }
        for name in self.order.iter() {
            for dep in self.dependencies_of(name) {
                graph.add_edge(dep.as_str(), name.as_str(), ());
            }
        }

        match toposort(&graph, None) {
            Ok(sorted) => Ok(sorted.into_iter().map(str::to_string).collect()),
            Err(cycle) => Err(StampedeError::Construction(format!(
                "dependency graph is not acyclic; cycle involves '{}'",
                cycle.node_id()
            ))),
        }
    }
}
