// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::types::TargetId;

#[derive(Error, Debug)]
pub enum StampedeError {
    /// A caller broke the queue protocol (double finish, bad chain start, ...).
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Internal bookkeeping reached an impossible state.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// The dependency graph could not be built.
    #[error("Graph construction error: {0}")]
    Construction(String),

    #[error("Build of target {target} failed: {reason}")]
    ExecutionFailure { target: TargetId, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StampedeError {
    /// Whether this error means the scheduling session itself is corrupt and
    /// must be torn down.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StampedeError::ProtocolViolation(_) | StampedeError::InvariantViolation(_)
        )
    }

    /// A copy of a fatal violation, so it can be recorded and returned.
    /// `None` for every other variant.
    pub fn fatal_copy(&self) -> Option<StampedeError> {
        match self {
            StampedeError::ProtocolViolation(m) => Some(StampedeError::ProtocolViolation(m.clone())),
            StampedeError::InvariantViolation(m) => {
                Some(StampedeError::InvariantViolation(m.clone()))
            }
            _ => None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, StampedeError>;
