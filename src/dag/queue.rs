// src/dag/queue.rs

use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;
use tracing::{debug, error, info};

use crate::dag::chainer::WorkUnitChainer;
use crate::dag::enqueued::{EnqueuedTarget, NodeIndex, TargetState};
use crate::dag::graph::{DagGraph, TargetResolver};
use crate::dag::work_unit::WorkUnit;
use crate::errors::{Result, StampedeError};
use crate::types::TargetId;

/// Counters describing where a queue is in the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub total: usize,
    pub finished: usize,
    pub ready: usize,
}

/// The scheduler core: per-target reference counts, the ready set, and the
/// record of finished targets.
///
/// Not internally synchronized. A coordinator serving several minions must
/// run each [`dequeue_work`](Self::dequeue_work) call under one lock, so that
/// completion processing and unit creation happen as a single step.
#[derive(Debug)]
pub struct TargetQueue {
    nodes: Vec<EnqueuedTarget>,
    index: HashMap<TargetId, NodeIndex>,
    /// Ready and unclaimed, in the order targets became ready.
    ready: IndexSet<NodeIndex>,
    finished: HashSet<NodeIndex>,
    total_finished: usize,
}

impl TargetQueue {
    /// A queue with nothing to build. It is complete from the start.
    pub fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            ready: IndexSet::new(),
            finished: HashSet::new(),
            total_finished: 0,
        }
    }

    /// Create the scheduling state for every target in `graph`.
    ///
    /// Targets without dependencies seed the ready set, in graph visit order.
    pub fn new(graph: &DagGraph) -> Self {
        let index: HashMap<TargetId, NodeIndex> = graph
            .targets()
            .enumerate()
            .map(|(i, name)| (name.to_string(), i))
            .collect();

        let mut nodes = Vec::with_capacity(index.len());
        let mut ready = IndexSet::new();

        for (i, name) in graph.targets().enumerate() {
            let dependents = graph
                .dependents_of(name)
                .iter()
                .map(|d| index[d.as_str()])
                .collect();
            let dependencies = graph
                .dependencies_of(name)
                .iter()
                .map(|d| index[d.as_str()])
                .collect();

            let node = EnqueuedTarget::new(name.to_string(), dependents, dependencies);
            if node.all_dependencies_resolved() {
                ready.insert(i);
            }
            nodes.push(node);
        }

        info!(
            targets = nodes.len(),
            ready = ready.len(),
            "target queue created"
        );

        Self {
            nodes,
            index,
            ready,
            finished: HashSet::new(),
            total_finished: 0,
        }
    }

    /// Resolve the graph reachable from `roots` and build a queue over it.
    pub fn from_resolver<R>(roots: &[TargetId], resolver: &R) -> Result<Self>
    where
        R: TargetResolver + ?Sized,
    {
        let graph = DagGraph::build(roots, resolver)?;
        Ok(Self::new(&graph))
    }

    /// Whether any target is ready and unclaimed.
    pub fn has_ready_work(&self) -> bool {
        !self.ready.is_empty()
    }

    /// Record `finished_targets`, then hand out up to `max_units` work units.
    ///
    /// With `max_units == 0` only the completions are processed; this lets a
    /// minion report progress without taking new work.
    ///
    /// Any error leaves the queue in an unspecified state; the session must
    /// be aborted.
    pub fn dequeue_work(
        &mut self,
        finished_targets: &[TargetId],
        max_units: usize,
    ) -> Result<Vec<WorkUnit>> {
        debug!(
            finished = finished_targets.len(),
            requested = max_units,
            "received update from minion"
        );

        self.process_finished(finished_targets)?;

        if max_units == 0 {
            return Ok(Vec::new());
        }

        let units = self.create_work_units(max_units)?;
        if !units.is_empty() {
            info!(units = units.len(), "returning work units");
        }
        Ok(units)
    }

    /// Start a work unit at a specific ready target.
    ///
    /// Fails with a protocol violation if the target is already claimed or
    /// not ready.
    pub fn chain_from(&mut self, target: &str) -> Result<WorkUnit> {
        let idx = self.lookup(target)?;
        WorkUnitChainer::new(&mut self.nodes, &mut self.ready).chain_from(idx)
    }

    /// `true` once every target has been reported finished.
    pub fn is_complete(&self) -> bool {
        self.total_finished == self.nodes.len()
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            total: self.nodes.len(),
            finished: self.total_finished,
            ready: self.ready.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ready, unclaimed targets in the order they will be handed out.
    pub fn ready_targets(&self) -> Vec<&str> {
        self.ready
            .iter()
            .map(|&i| self.nodes[i].id.as_str())
            .collect()
    }

    /// All target names known to the queue.
    pub fn target_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.id.as_str())
    }

    /// Read-only view of a target's scheduling state.
    pub fn state_of(&self, target: &str) -> Option<TargetState> {
        let &idx = self.index.get(target)?;
        let node = &self.nodes[idx];
        Some(TargetState {
            unsatisfied: node.unsatisfied,
            claimed: node.claimed,
            finished: self.finished.contains(&idx),
            ready: self.ready.contains(&idx),
        })
    }

    fn lookup(&self, target: &str) -> Result<NodeIndex> {
        self.index.get(target).copied().ok_or_else(|| {
            StampedeError::ProtocolViolation(format!("[{target}] is not a target in this build"))
        })
    }

    fn process_finished(&mut self, finished_targets: &[TargetId]) -> Result<()> {
        if finished_targets.is_empty() {
            return Ok(());
        }

        for target in finished_targets {
            self.process_one_finished(target)?;
        }

        info!(
            ready = self.ready.len(),
            total = self.nodes.len(),
            built = self.total_finished,
            "queue status"
        );
        Ok(())
    }

    fn process_one_finished(&mut self, target: &str) -> Result<()> {
        let idx = self.lookup(target)?;

        if !self.finished.insert(idx) {
            let msg = format!("[{target}] has already finished once");
            error!("{msg}");
            return Err(StampedeError::ProtocolViolation(msg));
        }
        self.total_finished += 1;

        let dependent_count = self.nodes[idx].dependents.len();
        debug!(target = %target, dependents = dependent_count, "target finished");

        for i in 0..dependent_count {
            let dep_idx = self.nodes[idx].dependents[i];
            let dependent = &mut self.nodes[dep_idx];
            dependent.resolve_dependency(idx, target)?;

            if !dependent.all_dependencies_resolved() {
                continue;
            }

            if dependent.claimed {
                // Fused into a unit that is already being built together
                // with the target that just finished.
                debug!(
                    target = %dependent.id,
                    "dependent is ready but already part of a work unit"
                );
            } else {
                debug!(target = %dependent.id, "dependent is ready to be built");
                self.ready.insert(dep_idx);
            }
        }

        Ok(())
    }

    fn create_work_units(&mut self, max_units: usize) -> Result<Vec<WorkUnit>> {
        let candidates: Vec<NodeIndex> = self.ready.iter().copied().collect();
        let mut units = Vec::new();

        for idx in candidates {
            if units.len() == max_units {
                break;
            }
            // An earlier chain in this batch may have absorbed it.
            if self.nodes[idx].claimed {
                continue;
            }

            let unit = WorkUnitChainer::new(&mut self.nodes, &mut self.ready).chain_from(idx)?;
            units.push(unit);
        }

        Ok(units)
    }
}
