// src/dag/mod.rs

//! Target graph and scheduling.
//!
//! - [`graph`] resolves the reachable target graph from a set of roots.
//! - [`queue`] holds per-target reference counts and the ready set, and
//!   hands out work units as completions arrive.
//! - [`chainer`] fuses runs of single-dependent targets into one unit.
//! - [`enqueued`] is the per-target scheduling state.
//! - [`work_unit`] is the unit of work handed to minions.

pub mod chainer;
pub mod enqueued;
pub mod graph;
pub mod queue;
pub mod work_unit;

pub use enqueued::TargetState;
pub use graph::{DagGraph, ResolvedDeps, TargetResolver};
pub use queue::{QueueStats, TargetQueue};
pub use work_unit::WorkUnit;
