// src/engine/status.rs

//! Shared build status: the signal every participant checks to learn the
//! session is over.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::types::BuildStatus;

/// Cloneable handle on the session's [`BuildStatus`].
///
/// The status only moves out of `Running` once; later transitions are
/// ignored, so the first final state wins.
#[derive(Debug, Clone)]
pub struct BuildStatusHandle {
    tx: Arc<watch::Sender<BuildStatus>>,
}

impl Default for BuildStatusHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildStatusHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(BuildStatus::Running);
        Self { tx: Arc::new(tx) }
    }

    pub fn get(&self) -> BuildStatus {
        *self.tx.borrow()
    }

    pub fn is_terminal(&self) -> bool {
        self.get().is_terminal()
    }

    pub fn subscribe(&self) -> watch::Receiver<BuildStatus> {
        self.tx.subscribe()
    }

    /// Returns `true` if this call moved the session to `Finished`.
    pub fn mark_finished(&self) -> bool {
        self.transition(BuildStatus::Finished)
    }

    /// Returns `true` if this call moved the session to `Failed`.
    pub fn mark_failed(&self) -> bool {
        self.transition(BuildStatus::Failed)
    }

    /// Resolve once the session reached a final state.
    pub async fn wait_terminal(&self) -> BuildStatus {
        let mut rx = self.subscribe();
        match rx.wait_for(|s| s.is_terminal()).await {
            Ok(status) => *status,
            // Unreachable while `self` holds the sender.
            Err(_) => self.get(),
        }
    }

    fn transition(&self, to: BuildStatus) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if current.is_terminal() {
                return false;
            }
            *current = to;
            true
        });

        if changed {
            info!(status = ?to, "build status changed");
        } else if self.get() != to {
            warn!(
                requested = ?to,
                current = ?self.get(),
                "ignoring status change; build already final"
            );
        }
        changed
    }
}
