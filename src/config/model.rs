// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{BuildMode, TargetId};

/// Session file exactly as deserialized, before validation.
///
/// ```toml
/// [session]
/// roots = ["//app:main"]
/// mode = "coordinator_and_minion"
/// max_units_per_request = 2
///
/// [target."//app:main"]
/// cmd = "echo main"
/// deps = ["//lib:a"]
///
/// [target."//lib:a"]
/// cmd = "echo a"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub session: SessionSection,

    /// All targets from `[target."<name>"]`, keyed by fully-qualified name.
    #[serde(default)]
    pub target: BTreeMap<TargetId, TargetConfig>,
}

/// A session file that passed `TryFrom<RawConfigFile>`.
///
/// Fields stay public for reading. Values built by hand skip validation.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub session: SessionSection,
    pub target: BTreeMap<TargetId, TargetConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        session: SessionSection,
        target: BTreeMap<TargetId, TargetConfig>,
    ) -> Self {
        Self { session, target }
    }
}

/// `[session]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSection {
    /// Top-level targets requested for this build.
    #[serde(default)]
    pub roots: Vec<TargetId>,

    #[serde(default)]
    pub mode: BuildMode,

    /// Bind address for a coordinator, connect address for a minion.
    #[serde(default)]
    pub coordinator_address: Option<String>,

    /// How many work units a minion asks for per request.
    #[serde(default = "default_max_units_per_request")]
    pub max_units_per_request: usize,

    /// Stop a minion after it has built this many targets. `0` = unlimited.
    #[serde(default)]
    pub max_targets_per_minion: usize,

    /// Delay between minion polls when no work is ready.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long a coordinator keeps answering after the build reached a
    /// final state, so that polling minions learn about it.
    #[serde(default = "default_linger_ms")]
    pub linger_ms: u64,
}

fn default_max_units_per_request() -> usize {
    1
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_linger_ms() -> u64 {
    500
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            mode: BuildMode::default(),
            coordinator_address: None,
            max_units_per_request: default_max_units_per_request(),
            max_targets_per_minion: 0,
            poll_interval_ms: default_poll_interval_ms(),
            linger_ms: default_linger_ms(),
        }
    }
}

impl SessionSection {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn linger(&self) -> Duration {
        Duration::from_millis(self.linger_ms)
    }

    /// `None` when minions may build without limit.
    pub fn max_targets(&self) -> Option<usize> {
        (self.max_targets_per_minion > 0).then_some(self.max_targets_per_minion)
    }
}

/// `[target."<name>"]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetConfig {
    /// Shell command that builds the target. A target without one is a
    /// grouping node and builds as a no-op.
    #[serde(default)]
    pub cmd: Option<String>,

    /// Build-time dependencies.
    #[serde(default)]
    pub deps: Vec<TargetId>,

    /// Runtime dependencies. Only targets that declare this key have the
    /// runtime-deps capability.
    #[serde(default)]
    pub runtime_deps: Option<Vec<TargetId>>,
}
