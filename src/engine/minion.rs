// src/engine/minion.rs

//! Minion polling loop: request work, build it, report it.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::dag::WorkUnit;
use crate::engine::protocol::WorkRequest;
use crate::engine::source::WorkSource;
use crate::engine::status::BuildStatusHandle;
use crate::errors::Result;
use crate::exec::{BuildExecutor, BuildOutcome};
use crate::types::TargetId;

/// Why a minion stopped asking for work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MinionExit {
    /// The coordinator said the build is complete.
    BuildComplete,
    /// A target failed here or on another minion.
    BuildFailed,
    /// This minion built its configured maximum number of targets.
    TargetLimitReached,
    /// The external build status became final while polling.
    Stopped,
}

/// Summary of one minion's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinionReport {
    pub exit: MinionExit,
    /// Every target this minion built successfully, in build order.
    pub built: Vec<TargetId>,
    /// The target whose local build failed, if any.
    pub failed_target: Option<TargetId>,
}

/// Settings for one minion.
#[derive(Debug, Clone)]
pub struct MinionOptions {
    pub minion_id: String,
    /// Work units requested per poll.
    pub max_units: usize,
    /// Stop after building this many targets.
    pub max_targets: Option<usize>,
    pub poll_interval: Duration,
}

impl Default for MinionOptions {
    fn default() -> Self {
        Self {
            minion_id: "minion".to_string(),
            max_units: 1,
            max_targets: None,
            poll_interval: Duration::from_millis(100),
        }
    }
}

pub struct MinionRunner<S: WorkSource, E: BuildExecutor> {
    source: S,
    executor: E,
    status: BuildStatusHandle,
    options: MinionOptions,
}

impl<S: WorkSource, E: BuildExecutor> MinionRunner<S, E> {
    /// `status` is the external signal consulted between polls; the minion
    /// also marks it failed when one of its own builds fails.
    pub fn new(source: S, executor: E, status: BuildStatusHandle, options: MinionOptions) -> Self {
        Self {
            source,
            executor,
            status,
            options,
        }
    }

    pub async fn run(mut self) -> Result<MinionReport> {
        let id = self.options.minion_id.clone();
        info!(minion = %id, max_units = self.options.max_units, "minion started");

        let mut built: Vec<TargetId> = Vec::new();
        let mut pending: Vec<TargetId> = Vec::new();

        let exit = loop {
            if self.status.is_terminal() {
                debug!(minion = %id, status = ?self.status.get(), "build is over; stopping");
                break MinionExit::Stopped;
            }

            let limit_reached = self
                .options
                .max_targets
                .is_some_and(|max| built.len() >= max);
            let capacity = if limit_reached { 0 } else { self.options.max_units };

            let request = WorkRequest::new(id.clone(), std::mem::take(&mut pending), capacity);
            let response = self.source.request_work(request).await?;

            if response.build_failed {
                info!(minion = %id, "coordinator reports build failed");
                break MinionExit::BuildFailed;
            }
            if limit_reached {
                info!(minion = %id, built = built.len(), "target limit reached; stopping");
                break MinionExit::TargetLimitReached;
            }
            if response.work_units.is_empty() {
                if response.build_complete {
                    info!(minion = %id, built = built.len(), "build complete");
                    break MinionExit::BuildComplete;
                }
                tokio::time::sleep(self.options.poll_interval).await;
                continue;
            }

            for unit in response.work_units {
                if let Err(failed) = self.build_unit(&unit, &mut pending).await {
                    built.extend(pending.iter().cloned());
                    return self.report_failure(built, pending, failed).await;
                }
            }
            built.extend(pending.iter().cloned());
        };

        Ok(MinionReport {
            exit,
            built,
            failed_target: None,
        })
    }

    /// Build the unit's targets in order. Stops at the first failure and
    /// returns the failed target.
    async fn build_unit(
        &mut self,
        unit: &WorkUnit,
        finished: &mut Vec<TargetId>,
    ) -> std::result::Result<(), TargetId> {
        debug!(minion = %self.options.minion_id, targets = ?unit.target_ids, "building work unit");

        for target in unit.iter() {
            let outcome = self.executor.build(target).await;
            match outcome {
                Ok(BuildOutcome::Success) => finished.push(target.to_string()),
                Ok(BuildOutcome::Failed(code)) => {
                    warn!(target = %target, exit_code = code, "target build failed");
                    return Err(target.to_string());
                }
                Err(e) => {
                    warn!(target = %target, error = %e, "target build could not run");
                    return Err(target.to_string());
                }
            }
        }
        Ok(())
    }

    async fn report_failure(
        &mut self,
        built: Vec<TargetId>,
        finished: Vec<TargetId>,
        failed: TargetId,
    ) -> Result<MinionReport> {
        let request = WorkRequest::new(self.options.minion_id.clone(), finished, 0)
            .with_failed(vec![failed.clone()]);
        if let Err(e) = self.source.request_work(request).await {
            warn!(error = %e, "unable to report failure to coordinator");
        }
        self.status.mark_failed();

        Ok(MinionReport {
            exit: MinionExit::BuildFailed,
            built,
            failed_target: Some(failed),
        })
    }
}
