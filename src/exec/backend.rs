// src/exec/backend.rs

//! Pluggable build executor abstraction.
//!
//! Minion and solo modes build targets through a [`BuildExecutor`] rather
//! than spawning processes directly, so tests can swap in a fake that
//! records what was built. Production uses
//! [`CommandExecutor`](super::command::CommandExecutor).

use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;

/// Outcome of building one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    Success,
    /// The build step ran and failed with this exit code.
    Failed(i32),
}

impl BuildOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, BuildOutcome::Success)
    }
}

/// Boxed future returned by [`BuildExecutor::build`].
pub type BuildFuture<'a> = Pin<Box<dyn Future<Output = Result<BuildOutcome>> + Send + 'a>>;

/// Builds a single target.
///
/// Called once per target, in work-unit order. An `Err` means the executor
/// itself broke (e.g. a process could not be spawned); a build step that ran
/// and failed is `Ok(BuildOutcome::Failed(_))`. Callers treat both as a
/// failed target.
pub trait BuildExecutor: Send {
    fn build<'a>(&'a mut self, target: &'a str) -> BuildFuture<'a>;
}

impl<E: BuildExecutor + ?Sized> BuildExecutor for Box<E> {
    fn build<'a>(&'a mut self, target: &'a str) -> BuildFuture<'a> {
        (**self).build(target)
    }
}
