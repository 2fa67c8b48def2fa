// src/engine/mode.rs

//! Execution modes.
//!
//! The mode is chosen once per session. Each variant of [`ModeRunner`]
//! composes the same pieces (queue, coordinator core, minion loop) in a
//! different way; [`ModeRunner::run`] drives it to a final [`BuildStatus`].

use tracing::{error, info, warn};

use crate::config::ConfigFile;
use crate::dag::{DagGraph, TargetQueue};
use crate::engine::coordinator::Coordinator;
use crate::engine::minion::{MinionExit, MinionOptions, MinionRunner};
use crate::engine::source::TcpWorkSource;
use crate::engine::status::BuildStatusHandle;
use crate::errors::{Result, StampedeError};
use crate::exec::{BuildExecutor, BuildOutcome};
use crate::types::{BuildMode, BuildStatus, TargetId};

/// Bind address for a standalone coordinator without `coordinator_address`.
pub const DEFAULT_COORDINATOR_ADDRESS: &str = "127.0.0.1:7070";

/// Builds every target locally in topological order, without a queue.
pub struct SoloRunner<E: BuildExecutor> {
    order: Vec<TargetId>,
    executor: E,
    status: BuildStatusHandle,
}

impl<E: BuildExecutor> SoloRunner<E> {
    pub fn new(graph: &DagGraph, executor: E, status: BuildStatusHandle) -> Result<Self> {
        Ok(Self {
            order: graph.topological_order()?,
            executor,
            status,
        })
    }

    /// Stops at the first failing target, or when the status becomes final
    /// from outside (e.g. Ctrl-C).
    pub async fn run(mut self) -> Result<BuildStatus> {
        info!(targets = self.order.len(), "solo build started");

        for target in &self.order {
            if self.status.is_terminal() {
                warn!(target = %target, "build stopped before all targets ran");
                return Ok(self.status.get());
            }

            match self.executor.build(target).await {
                Ok(BuildOutcome::Success) => {}
                Ok(BuildOutcome::Failed(code)) => {
                    error!(target = %target, exit_code = code, "target build failed");
                    self.status.mark_failed();
                    return Ok(self.status.get());
                }
                Err(e) => {
                    error!(target = %target, error = %e, "target build could not run");
                    self.status.mark_failed();
                    return Ok(self.status.get());
                }
            }
        }

        self.status.mark_finished();
        Ok(self.status.get())
    }
}

/// One build session in the mode selected at startup.
pub enum ModeRunner<E: BuildExecutor> {
    Solo(SoloRunner<E>),
    Coordinator(Coordinator),
    Minion {
        runner: MinionRunner<TcpWorkSource, E>,
        status: BuildStatusHandle,
    },
    /// Coordinator on an ephemeral loopback port plus a minion connected to it.
    CoordinatorAndMinion {
        coordinator: Coordinator,
        runner: MinionRunner<TcpWorkSource, E>,
        status: BuildStatusHandle,
    },
}

impl<E: BuildExecutor> ModeRunner<E> {
    /// Resolve the graph and set up the pieces for `cfg.session.mode`.
    ///
    /// Graph construction errors surface here, before any work is handed out.
    pub async fn from_config(
        cfg: &ConfigFile,
        executor: E,
        status: BuildStatusHandle,
        minion_id: Option<String>,
    ) -> Result<Self> {
        let session = &cfg.session;
        let mode = session.mode;
        info!(%mode, roots = ?session.roots, "setting up build session");

        let minion_options = || MinionOptions {
            minion_id: minion_id.clone().unwrap_or_else(default_minion_id),
            max_units: session.max_units_per_request,
            max_targets: session.max_targets(),
            poll_interval: session.poll_interval(),
        };

        let runner = match mode {
            BuildMode::Solo => {
                let graph = DagGraph::from_config(cfg)?;
                ModeRunner::Solo(SoloRunner::new(&graph, executor, status)?)
            }
            BuildMode::Coordinator => {
                let queue = build_queue(cfg)?;
                let address = session
                    .coordinator_address
                    .as_deref()
                    .unwrap_or(DEFAULT_COORDINATOR_ADDRESS);
                let coordinator =
                    Coordinator::bind(address, queue, status, session.linger()).await?;
                ModeRunner::Coordinator(coordinator)
            }
            BuildMode::Minion => {
                let address = session.coordinator_address.clone().ok_or_else(|| {
                    StampedeError::ConfigError(
                        "minion mode requires a coordinator address".to_string(),
                    )
                })?;
                let source = TcpWorkSource::new(address);
                info!(coordinator = %source.address(), "minion will poll remote coordinator");
                let runner = MinionRunner::new(source, executor, status.clone(), minion_options());
                ModeRunner::Minion { runner, status }
            }
            BuildMode::CoordinatorAndMinion => {
                let queue = build_queue(cfg)?;
                let coordinator =
                    Coordinator::bind("127.0.0.1:0", queue, status.clone(), session.linger())
                        .await?;
                let address = coordinator.local_addr()?.to_string();
                let source = TcpWorkSource::new(address);
                let runner = MinionRunner::new(source, executor, status.clone(), minion_options());
                ModeRunner::CoordinatorAndMinion {
                    coordinator,
                    runner,
                    status,
                }
            }
        };

        Ok(runner)
    }

    pub fn mode(&self) -> BuildMode {
        match self {
            ModeRunner::Solo(_) => BuildMode::Solo,
            ModeRunner::Coordinator(_) => BuildMode::Coordinator,
            ModeRunner::Minion { .. } => BuildMode::Minion,
            ModeRunner::CoordinatorAndMinion { .. } => BuildMode::CoordinatorAndMinion,
        }
    }

    pub async fn run(self) -> Result<BuildStatus> {
        match self {
            ModeRunner::Solo(solo) => solo.run().await,
            ModeRunner::Coordinator(coordinator) => coordinator.run().await,
            ModeRunner::Minion { runner, status } => {
                let report = runner.run().await?;
                info!(
                    exit = ?report.exit,
                    built = report.built.len(),
                    "minion finished"
                );
                Ok(minion_status(&report.exit, &status))
            }
            ModeRunner::CoordinatorAndMinion {
                coordinator,
                runner,
                status,
            } => {
                let on_error = status.clone();
                let minion = async move {
                    let result = runner.run().await;
                    if let Err(e) = &result {
                        error!(error = %e, "local minion failed");
                        on_error.mark_failed();
                    }
                    result
                };

                let (coordinated, minion) = tokio::join!(coordinator.run(), minion);
                let status = coordinated?;
                if let Ok(report) = minion {
                    info!(exit = ?report.exit, built = report.built.len(), "local minion finished");
                }
                Ok(status)
            }
        }
    }
}

fn build_queue(cfg: &ConfigFile) -> Result<TargetQueue> {
    let graph = DagGraph::from_config(cfg)?;
    Ok(TargetQueue::new(&graph))
}

/// Session outcome as seen from a standalone minion.
fn minion_status(exit: &MinionExit, status: &BuildStatusHandle) -> BuildStatus {
    match exit {
        MinionExit::BuildComplete | MinionExit::TargetLimitReached => BuildStatus::Finished,
        MinionExit::BuildFailed => BuildStatus::Failed,
        MinionExit::Stopped => status.get(),
    }
}

fn default_minion_id() -> String {
    format!("minion-{}", std::process::id())
}
