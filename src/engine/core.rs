// src/engine/core.rs

//! Pure coordinator state machine.
//!
//! [`CoordinatorCore`] turns one [`WorkRequest`] into one [`WorkResponse`]
//! with no IO: the TCP server in [`coordinator`](super::coordinator) and the
//! in-process [`SharedQueueSource`](super::source::SharedQueueSource) both
//! drive it under a single lock, which makes each request one critical
//! section over the queue.

use tracing::{error, info, warn};

use crate::dag::{QueueStats, TargetQueue, WorkUnit};
use crate::engine::protocol::{WorkRequest, WorkResponse};
use crate::engine::status::BuildStatusHandle;
use crate::errors::{Result, StampedeError};
use crate::types::{BuildStatus, TargetId};

#[derive(Debug)]
pub struct CoordinatorCore {
    queue: TargetQueue,
    status: BuildStatusHandle,
    failed_targets: Vec<TargetId>,
    /// First fatal error seen; the session is over once this is set.
    violation: Option<StampedeError>,
}

impl CoordinatorCore {
    /// Wrap `queue`. An already complete queue (e.g. an empty one) finishes
    /// the session immediately.
    pub fn new(queue: TargetQueue, status: BuildStatusHandle) -> Self {
        if queue.is_complete() {
            info!("nothing to build; marking build finished");
            status.mark_finished();
        }
        Self {
            queue,
            status,
            failed_targets: Vec::new(),
            violation: None,
        }
    }

    pub fn status(&self) -> BuildStatus {
        self.status.get()
    }

    pub fn status_handle(&self) -> &BuildStatusHandle {
        &self.status
    }

    pub fn stats(&self) -> QueueStats {
        self.queue.stats()
    }

    pub fn queue(&self) -> &TargetQueue {
        &self.queue
    }

    /// Targets reported as failed, in report order.
    pub fn failed_targets(&self) -> &[TargetId] {
        &self.failed_targets
    }

    /// Take the fatal error that aborted the session, if any.
    pub fn take_violation(&mut self) -> Option<StampedeError> {
        self.violation.take()
    }

    /// Handle one minion request.
    ///
    /// Errors are fatal for the session: the status is set to `Failed`
    /// before the error is returned.
    pub fn handle_request(&mut self, request: &WorkRequest) -> Result<WorkResponse> {
        if !request.failed_target_ids.is_empty() {
            warn!(
                minion = %request.minion_id,
                failed = ?request.failed_target_ids,
                "minion reported failed targets; failing build"
            );
            self.failed_targets
                .extend(request.failed_target_ids.iter().cloned());

            // Completions sent with the failure still count.
            if self.status.get() == BuildStatus::Running {
                self.dequeue(request, 0)?;
            }
            self.status.mark_failed();
        }

        match self.status.get() {
            BuildStatus::Failed => return Ok(WorkResponse::finished(true)),
            BuildStatus::Finished => return Ok(WorkResponse::finished(false)),
            BuildStatus::Running => {}
        }

        let units = self.dequeue(request, request.max_units_requested)?;

        if self.queue.is_complete() {
            self.status.mark_finished();
        }

        let complete = self.status.is_terminal();
        if !units.is_empty() {
            info!(
                minion = %request.minion_id,
                units = units.len(),
                targets = units.iter().map(|u| u.len()).sum::<usize>(),
                "assigned work units"
            );
        }

        Ok(WorkResponse::units(units, complete))
    }

    fn dequeue(&mut self, request: &WorkRequest, max_units: usize) -> Result<Vec<WorkUnit>> {
        match self
            .queue
            .dequeue_work(&request.finished_target_ids, max_units)
        {
            Ok(units) => Ok(units),
            Err(e) => {
                error!(minion = %request.minion_id, error = %e, "aborting build session");
                if self.violation.is_none() {
                    self.violation = e.fatal_copy();
                }
                self.status.mark_failed();
                Err(e)
            }
        }
    }
}
