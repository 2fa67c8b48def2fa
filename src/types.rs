use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Fully-qualified build target name, e.g. `//app:main`.
pub type TargetId = String;

/// How this process takes part in a build session.
///
/// Selected once at startup; a session never switches modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildMode {
    /// Build everything locally, no distribution.
    Solo,
    /// Own the target queue and serve work units to minions.
    Coordinator,
    /// Request work units from a remote coordinator and build them.
    Minion,
    /// Run a coordinator and a minion in the same process.
    CoordinatorAndMinion,
}

impl Default for BuildMode {
    fn default() -> Self {
        BuildMode::Solo
    }
}

impl FromStr for BuildMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "solo" => Ok(BuildMode::Solo),
            "coordinator" => Ok(BuildMode::Coordinator),
            "minion" => Ok(BuildMode::Minion),
            "coordinator_and_minion" => Ok(BuildMode::CoordinatorAndMinion),
            other => Err(format!(
                "invalid build mode: {other} (expected \"solo\", \"coordinator\", \"minion\" or \"coordinator_and_minion\")"
            )),
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuildMode::Solo => "solo",
            BuildMode::Coordinator => "coordinator",
            BuildMode::Minion => "minion",
            BuildMode::CoordinatorAndMinion => "coordinator_and_minion",
        };
        f.write_str(s)
    }
}

/// Overall state of a build session, as seen by every participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    Running,
    Finished,
    Failed,
}

impl BuildStatus {
    /// `true` once the session has reached a final state.
    pub fn is_terminal(self) -> bool {
        !matches!(self, BuildStatus::Running)
    }

    /// Process exit code for this status.
    ///
    /// `Running` means the session ended without ever reaching a final state.
    pub fn exit_code(self) -> i32 {
        match self {
            BuildStatus::Finished => 0,
            BuildStatus::Failed => 1,
            BuildStatus::Running => 2,
        }
    }
}
