// src/dag/chainer.rs

//! Chain fusion: turning a ready target plus its run of single dependents
//! into one work unit.

use indexmap::IndexSet;
use tracing::debug;

use crate::dag::enqueued::{EnqueuedTarget, NodeIndex};
use crate::dag::work_unit::WorkUnit;
use crate::errors::{Result, StampedeError};

/// Builds work units over the queue's node arena and ready set.
///
/// Borrowed from the [`TargetQueue`](crate::dag::TargetQueue) for the
/// duration of one `dequeue_work` call.
pub(crate) struct WorkUnitChainer<'a> {
    nodes: &'a mut [EnqueuedTarget],
    ready: &'a mut IndexSet<NodeIndex>,
}

impl<'a> WorkUnitChainer<'a> {
    pub(crate) fn new(
        nodes: &'a mut [EnqueuedTarget],
        ready: &'a mut IndexSet<NodeIndex>,
    ) -> Self {
        Self { nodes, ready }
    }

    /// Start a unit at `leaf` and extend it up the dependents chain.
    ///
    /// The chain grows while the tail has exactly one dependent, and that
    /// dependent is unclaimed and waiting on nothing but the tail. A target
    /// with several dependents ends the unit: it is a join point other chains
    /// have to reach independently.
    pub(crate) fn chain_from(&mut self, leaf: NodeIndex) -> Result<WorkUnit> {
        let node = &self.nodes[leaf];
        if node.claimed {
            return Err(StampedeError::ProtocolViolation(format!(
                "leaf node [{}] is already part of a work unit",
                node.id
            )));
        }
        if !node.all_dependencies_resolved() {
            return Err(StampedeError::ProtocolViolation(format!(
                "leaf node [{}] still has {} unsatisfied dependencies",
                node.id, node.unsatisfied
            )));
        }

        debug!(target = %node.id, "starting work unit at ready target");

        let mut unit = Vec::new();
        let mut tail = leaf;
        self.claim(tail, &mut unit);

        loop {
            let current = &self.nodes[tail];
            if current.dependents.len() != 1 {
                break;
            }

            let parent_idx = current.dependents[0];
            let parent = &self.nodes[parent_idx];
            if parent.unsatisfied != 1 || parent.claimed {
                break;
            }

            self.claim(parent_idx, &mut unit);
            tail = parent_idx;
        }

        Ok(WorkUnit::new(unit))
    }

    fn claim(&mut self, idx: NodeIndex, unit: &mut Vec<String>) {
        let node = &mut self.nodes[idx];
        node.claimed = true;
        debug!(target = %node.id, "adding target to work unit");
        unit.push(node.id.clone());
        self.ready.shift_remove(&idx);
    }
}
