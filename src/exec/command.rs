// src/exec/command.rs

//! Shell-command executor: runs each target's `cmd`.

use std::collections::BTreeMap;
use std::process::Stdio;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::model::ConfigFile;
use crate::errors::{Result, StampedeError};
use crate::types::TargetId;

use super::backend::{BuildExecutor, BuildFuture, BuildOutcome};

/// Builds targets by running their configured shell command.
///
/// Targets with no `cmd` build as no-ops. Output is forwarded to `tracing`
/// line by line: stdout at `info`, stderr at `debug`.
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor {
    commands: BTreeMap<TargetId, Option<String>>,
}

impl CommandExecutor {
    pub fn new(commands: BTreeMap<TargetId, Option<String>>) -> Self {
        Self { commands }
    }

    pub fn from_config(cfg: &ConfigFile) -> Self {
        let commands = cfg
            .target
            .iter()
            .map(|(name, tc)| (name.clone(), tc.cmd.clone()))
            .collect();
        Self::new(commands)
    }

    async fn run_target(&self, target: &str) -> Result<BuildOutcome> {
        let cmd_line = match self.commands.get(target) {
            Some(Some(cmd)) => cmd.clone(),
            Some(None) => {
                debug!(target = %target, "target has no command; nothing to build");
                return Ok(BuildOutcome::Success);
            }
            None => {
                return Err(StampedeError::ExecutionFailure {
                    target: target.to_string(),
                    reason: "no build definition for target".to_string(),
                });
            }
        };

        info!(target = %target, cmd = %cmd_line, "building target");

        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&cmd_line);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&cmd_line);
            c
        };

        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning build command for target '{target}'"))?;

        let stdout_task = child
            .stdout
            .take()
            .map(|out| tokio::spawn(forward_lines(target.to_string(), out, false)));
        let stderr_task = child
            .stderr
            .take()
            .map(|err| tokio::spawn(forward_lines(target.to_string(), err, true)));

        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for build command of target '{target}'"))?;

        for task in [stdout_task, stderr_task].into_iter().flatten() {
            if let Err(e) = task.await {
                warn!(target = %target, error = %e, "output forwarder panicked");
            }
        }

        let code = status.code().unwrap_or(-1);
        info!(
            target = %target,
            exit_code = code,
            success = status.success(),
            "build command exited"
        );

        Ok(if status.success() {
            BuildOutcome::Success
        } else {
            BuildOutcome::Failed(code)
        })
    }
}

impl BuildExecutor for CommandExecutor {
    fn build<'a>(&'a mut self, target: &'a str) -> BuildFuture<'a> {
        Box::pin(self.run_target(target))
    }
}

/// Drain a child pipe to the end, logging each line.
///
/// Lines are read as raw bytes; invalid UTF-8 is logged lossily. The pipe
/// must stay open until EOF or the child gets SIGPIPE on its next write.
async fn forward_lines<R>(target: String, reader: R, is_stderr: bool)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(target = %target, error = %e, "reading build output failed");
                break;
            }
        }

        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']);
        if is_stderr {
            debug!(target = %target, "stderr: {}", line);
        } else {
            info!(target = %target, "stdout: {}", line);
        }
    }
}
