// src/exec/mod.rs

//! Local build execution.
//!
//! - [`backend`] defines the [`BuildExecutor`] trait used by minion and solo
//!   modes, and the [`BuildOutcome`] it reports.
//! - [`command`] is the production executor, running each target's shell
//!   command with `tokio::process::Command`.

pub mod backend;
pub mod command;

pub use backend::{BuildExecutor, BuildFuture, BuildOutcome};
pub use command::CommandExecutor;
