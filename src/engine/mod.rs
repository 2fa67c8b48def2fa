// src/engine/mod.rs

//! Distribution engine.
//!
//! This module ties together:
//! - the coordinator, which owns the target queue and answers minion
//!   requests over TCP
//! - the minion polling loop, which builds the work units it receives
//! - the shared build status every participant checks
//! - the execution modes selecting how these are composed
//!
//! The pure request handling lives in [`core`]; the async/IO shells are
//! [`coordinator`] and [`minion`].

pub mod coordinator;
pub mod core;
pub mod minion;
pub mod mode;
pub mod protocol;
pub mod source;
pub mod status;

pub use coordinator::Coordinator;
pub use core::CoordinatorCore;
pub use minion::{MinionExit, MinionOptions, MinionReport, MinionRunner};
pub use mode::{ModeRunner, SoloRunner};
pub use protocol::{WorkRequest, WorkResponse};
pub use source::{SharedCore, SharedQueueSource, TcpWorkSource, WorkSource};
pub use status::BuildStatusHandle;
