// src/engine/source.rs

//! Where a minion gets its work from.
//!
//! [`WorkSource`] is the seam between the minion loop and the coordinator:
//! - [`TcpWorkSource`] talks to a coordinator over the wire protocol.
//! - [`SharedQueueSource`] calls an in-process [`CoordinatorCore`] directly.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::{debug, warn};

use crate::engine::core::CoordinatorCore;
use crate::engine::protocol::{WorkRequest, WorkResponse, read_message, write_message};
use crate::errors::{Result, StampedeError};

/// A coordinator core shared between connection handlers.
pub type SharedCore = Arc<Mutex<CoordinatorCore>>;

/// Boxed future returned by [`WorkSource::request_work`].
pub type WorkFuture<'a> = Pin<Box<dyn Future<Output = Result<WorkResponse>> + Send + 'a>>;

/// Anything that answers work requests.
pub trait WorkSource: Send {
    fn request_work(&mut self, request: WorkRequest) -> WorkFuture<'_>;
}

/// Run `request` against a shared core as one critical section.
pub fn handle_shared(core: &SharedCore, request: &WorkRequest) -> Result<WorkResponse> {
    let mut guard = core.lock().map_err(|_| {
        StampedeError::InvariantViolation(
            "coordinator state lock poisoned by an earlier panic".to_string(),
        )
    })?;
    guard.handle_request(request)
}

/// In-process work source, bypassing the network.
#[derive(Debug, Clone)]
pub struct SharedQueueSource {
    core: SharedCore,
}

impl SharedQueueSource {
    pub fn new(core: SharedCore) -> Self {
        Self { core }
    }
}

impl WorkSource for SharedQueueSource {
    fn request_work(&mut self, request: WorkRequest) -> WorkFuture<'_> {
        let result = handle_shared(&self.core, &request);
        Box::pin(async move { result })
    }
}

struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

/// Work source backed by a TCP connection to a coordinator.
///
/// Connects lazily and reuses the connection across requests. Only the
/// connect step is retried: once a request has been written it is never
/// resent, because the coordinator may already have recorded its
/// completions.
pub struct TcpWorkSource {
    address: String,
    connect_attempts: u32,
    retry_delay: Duration,
    conn: Option<Connection>,
}

impl TcpWorkSource {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            connect_attempts: 5,
            retry_delay: Duration::from_millis(200),
            conn: None,
        }
    }

    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.connect_attempts = attempts.max(1);
        self.retry_delay = delay;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn connect(&mut self) -> Result<&mut Connection> {
        if self.conn.is_none() {
            let mut attempt = 0;
            let stream = loop {
                attempt += 1;
                match TcpStream::connect(&self.address).await {
                    Ok(stream) => break stream,
                    Err(e) if attempt < self.connect_attempts => {
                        warn!(
                            address = %self.address,
                            attempt,
                            error = %e,
                            "connecting to coordinator failed; retrying"
                        );
                        tokio::time::sleep(self.retry_delay).await;
                    }
                    Err(e) => {
                        return Err(StampedeError::Transport(format!(
                            "unable to connect to coordinator at {}: {e}",
                            self.address
                        )));
                    }
                }
            };

            stream.set_nodelay(true)?;
            debug!(address = %self.address, "connected to coordinator");
            let (read, write) = stream.into_split();
            self.conn = Some(Connection {
                reader: BufReader::new(read),
                writer: write,
            });
        }

        self.conn.as_mut().ok_or_else(|| {
            StampedeError::InvariantViolation("coordinator connection missing".to_string())
        })
    }

    async fn round_trip(&mut self, request: WorkRequest) -> Result<WorkResponse> {
        let conn = self.connect().await?;
        write_message(&mut conn.writer, &request).await?;
        match read_message::<_, WorkResponse>(&mut conn.reader).await? {
            Some(response) => Ok(response),
            None => Err(StampedeError::Transport(
                "coordinator closed the connection".to_string(),
            )),
        }
    }
}

impl WorkSource for TcpWorkSource {
    fn request_work(&mut self, request: WorkRequest) -> WorkFuture<'_> {
        Box::pin(async move {
            let result = self.round_trip(request).await;
            if result.is_err() {
                // Start from a fresh connection next time.
                self.conn = None;
            }
            result
        })
    }
}
