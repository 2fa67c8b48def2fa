// src/dag/enqueued.rs

//! Per-target scheduling state.

use std::collections::HashSet;

use tracing::{debug, error};

use crate::errors::{Result, StampedeError};
use crate::types::TargetId;

/// Position of a target in the queue's node arena.
pub(crate) type NodeIndex = usize;

/// Scheduling state for a single target (internal).
///
/// Created once when the queue is built and mutated in place until the
/// session ends. Edges never change; only `remaining_dependencies`,
/// `unsatisfied` and `claimed` do.
#[derive(Debug, Clone)]
pub(crate) struct EnqueuedTarget {
    pub(crate) id: TargetId,
    /// Targets that depend on this one.
    pub(crate) dependents: Vec<NodeIndex>,
    pub(crate) all_dependencies: HashSet<NodeIndex>,
    pub(crate) remaining_dependencies: HashSet<NodeIndex>,
    /// Always equal to `remaining_dependencies.len()`.
    pub(crate) unsatisfied: usize,
    /// Set once the target is placed into a work unit. Never cleared.
    pub(crate) claimed: bool,
}

impl EnqueuedTarget {
    pub(crate) fn new(
        id: TargetId,
        dependents: Vec<NodeIndex>,
        dependencies: HashSet<NodeIndex>,
    ) -> Self {
        Self {
            id,
            dependents,
            unsatisfied: dependencies.len(),
            remaining_dependencies: dependencies.clone(),
            all_dependencies: dependencies,
            claimed: false,
        }
    }

    pub(crate) fn all_dependencies_resolved(&self) -> bool {
        self.unsatisfied == 0
    }

    /// Remove a finished dependency and decrement the unsatisfied count.
    ///
    /// `dep_id` is only used for diagnostics.
    pub(crate) fn resolve_dependency(&mut self, dep: NodeIndex, dep_id: &str) -> Result<()> {
        if !self.remaining_dependencies.remove(&dep) {
            let is_real_dependency = self.all_dependencies.contains(&dep);
            let msg = format!(
                "[{}] is not a remaining dependency of [{}] (is real dependency: {})",
                dep_id, self.id, is_real_dependency
            );
            error!("{msg}");
            return Err(StampedeError::ProtocolViolation(msg));
        }

        self.unsatisfied = self.unsatisfied.checked_sub(1).ok_or_else(|| {
            StampedeError::InvariantViolation(format!(
                "unsatisfied dependency count of [{}] would go negative",
                self.id
            ))
        })?;

        if self.unsatisfied != self.remaining_dependencies.len() {
            return Err(StampedeError::InvariantViolation(format!(
                "[{}] tracks {} unsatisfied dependencies but {} remain",
                self.id,
                self.unsatisfied,
                self.remaining_dependencies.len()
            )));
        }

        debug!(
            dependency = %dep_id,
            target = %self.id,
            unsatisfied = self.unsatisfied,
            "removed finished dependency"
        );
        Ok(())
    }
}

/// Public, read-only view of one target's scheduling state.
///
/// Exposed for diagnostics and tests without leaking [`EnqueuedTarget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetState {
    /// Dependencies not yet reported finished.
    pub unsatisfied: usize,
    /// Placed into a work unit at some point.
    pub claimed: bool,
    /// Reported finished by a minion.
    pub finished: bool,
    /// Currently in the ready set.
    pub ready: bool,
}
