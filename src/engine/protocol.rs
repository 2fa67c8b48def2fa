// src/engine/protocol.rs

//! Coordinator <-> minion wire protocol.
//!
//! Each message is one JSON object on its own line. A minion sends a
//! [`WorkRequest`] and waits for exactly one [`WorkResponse`] before sending
//! the next request on the same connection.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::dag::WorkUnit;
use crate::errors::{Result, StampedeError};
use crate::types::TargetId;

/// Longest accepted message line, newline included.
pub const MAX_MESSAGE_BYTES: usize = 1 << 20;

/// "Here is what I finished, give me up to N more units."
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkRequest {
    #[serde(default)]
    pub minion_id: String,
    pub finished_target_ids: Vec<TargetId>,
    /// `0` reports progress without taking new work.
    pub max_units_requested: usize,
    /// Targets whose build failed on this minion.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_target_ids: Vec<TargetId>,
}

impl WorkRequest {
    pub fn new(minion_id: impl Into<String>, finished: Vec<TargetId>, max_units: usize) -> Self {
        Self {
            minion_id: minion_id.into(),
            finished_target_ids: finished,
            max_units_requested: max_units,
            failed_target_ids: Vec::new(),
        }
    }

    pub fn with_failed(mut self, failed: Vec<TargetId>) -> Self {
        self.failed_target_ids = failed;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkResponse {
    pub work_units: Vec<WorkUnit>,
    /// No further work will ever be handed out in this session.
    pub build_complete: bool,
    /// The session ended because some target failed.
    #[serde(default)]
    pub build_failed: bool,
}

impl WorkResponse {
    pub fn units(work_units: Vec<WorkUnit>, build_complete: bool) -> Self {
        Self {
            work_units,
            build_complete,
            build_failed: false,
        }
    }

    /// Response sent once the session has reached a final state.
    pub fn finished(failed: bool) -> Self {
        Self {
            work_units: Vec::new(),
            build_complete: true,
            build_failed: failed,
        }
    }
}

/// Write one message followed by a newline, and flush.
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}

/// Read the next message. Returns `None` when the peer closed the stream.
///
/// Blank lines are skipped. A line longer than [`MAX_MESSAGE_BYTES`] is a
/// transport error.
pub async fn read_message<R, T>(reader: &mut R) -> Result<Option<T>>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = String::new();
    loop {
        line.clear();
        let mut limited = (&mut *reader).take(MAX_MESSAGE_BYTES as u64);
        let read = limited.read_line(&mut line).await?;
        if read == 0 {
            return Ok(None);
        }
        if read == MAX_MESSAGE_BYTES && !line.ends_with('\n') {
            return Err(StampedeError::Transport(format!(
                "message line exceeds {MAX_MESSAGE_BYTES} bytes"
            )));
        }
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            return Ok(Some(serde_json::from_str(trimmed)?));
        }
    }
}
