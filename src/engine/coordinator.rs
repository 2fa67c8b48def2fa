// src/engine/coordinator.rs

//! Network-facing coordinator.
//!
//! Accepts minion connections, handles each in its own task, and funnels
//! every request through the shared [`CoordinatorCore`] lock.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::dag::{QueueStats, TargetQueue};
use crate::engine::core::CoordinatorCore;
use crate::engine::protocol::{WorkRequest, WorkResponse, read_message, write_message};
use crate::engine::source::{SharedCore, handle_shared};
use crate::engine::status::BuildStatusHandle;
use crate::errors::{Result, StampedeError};
use crate::types::BuildStatus;

pub struct Coordinator {
    listener: TcpListener,
    core: SharedCore,
    status: BuildStatusHandle,
    linger: Duration,
}

impl Coordinator {
    /// Bind the endpoint. Use port `0` to let the OS pick one; the chosen
    /// address is available from [`local_addr`](Self::local_addr).
    pub async fn bind(
        address: &str,
        queue: TargetQueue,
        status: BuildStatusHandle,
        linger: Duration,
    ) -> Result<Self> {
        let listener = TcpListener::bind(address).await.map_err(|e| {
            StampedeError::Transport(format!("unable to bind coordinator on {address}: {e}"))
        })?;
        let core = Arc::new(Mutex::new(CoordinatorCore::new(queue, status.clone())));

        Ok(Self {
            listener,
            core,
            status,
            linger,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// The shared core, e.g. for an in-process [`SharedQueueSource`](super::source::SharedQueueSource).
    pub fn core(&self) -> SharedCore {
        Arc::clone(&self.core)
    }

    /// Serve minions until the build reaches a final state, then keep
    /// answering for the linger period and return that state.
    ///
    /// A protocol or invariant violation from any connection aborts the
    /// session right away and is returned as the error.
    pub async fn run(self) -> Result<BuildStatus> {
        let addr = self.local_addr()?;
        info!(%addr, "coordinator listening");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => self.spawn_connection(accepted),
                status = self.status.wait_terminal() => {
                    info!(?status, "build reached final state");
                    break;
                }
            }
        }

        if let Some(violation) = self.take_violation() {
            error!(error = %violation, "build session aborted");
            return Err(violation);
        }

        if !self.linger.is_zero() {
            debug!(linger_ms = self.linger.as_millis() as u64, "lingering for late minions");
            let deadline = tokio::time::sleep(self.linger);
            tokio::pin!(deadline);

            loop {
                tokio::select! {
                    accepted = self.listener.accept() => self.spawn_connection(accepted),
                    _ = &mut deadline => break,
                }
            }
        }

        let status = self.status.get();
        info!(?status, stats = ?self.stats(), "coordinator shutting down");
        Ok(status)
    }

    fn take_violation(&self) -> Option<StampedeError> {
        self.core.lock().ok().and_then(|mut core| core.take_violation())
    }

    fn stats(&self) -> Option<QueueStats> {
        self.core.lock().ok().map(|core| core.stats())
    }

    fn spawn_connection(&self, accepted: std::io::Result<(TcpStream, SocketAddr)>) {
        match accepted {
            Ok((stream, peer)) => {
                debug!(%peer, "minion connected");
                let core = Arc::clone(&self.core);
                tokio::spawn(async move {
                    match serve_connection(stream, core).await {
                        Ok(()) => debug!(%peer, "minion disconnected"),
                        Err(e) => warn!(%peer, error = %e, "minion connection ended with error"),
                    }
                });
            }
            Err(e) => warn!(error = %e, "failed to accept minion connection"),
        }
    }
}

async fn serve_connection(stream: TcpStream, core: SharedCore) -> Result<()> {
    stream.set_nodelay(true)?;
    let (read, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read);

    while let Some(request) = read_message::<_, WorkRequest>(&mut reader).await? {
        debug!(
            minion = %request.minion_id,
            finished = request.finished_target_ids.len(),
            requested = request.max_units_requested,
            "work request"
        );

        match handle_shared(&core, &request) {
            Ok(response) => write_message(&mut writer, &response).await?,
            Err(e) => {
                // Tell the minion to stop; the coordinator loop picks up the
                // recorded violation.
                let _ = write_message(&mut writer, &WorkResponse::finished(true)).await;
                return Err(e);
            }
        }
    }

    Ok(())
}
