#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};

use stampede::config::{ConfigFile, RawConfigFile, SessionSection, TargetConfig};
use stampede::dag::{DagGraph, ResolvedDeps, TargetQueue, TargetResolver};
use stampede::types::BuildMode;

/// Builder for `ConfigFile` to simplify test setup.
pub struct SessionFileBuilder {
    config: RawConfigFile,
}

impl SessionFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                session: SessionSection::default(),
                target: BTreeMap::new(),
            },
        }
    }

    pub fn with_target(mut self, name: &str, target: TargetConfig) -> Self {
        self.config.target.insert(name.to_string(), target);
        self
    }

    pub fn with_root(mut self, name: &str) -> Self {
        self.config.session.roots.push(name.to_string());
        self
    }

    pub fn mode(mut self, mode: BuildMode) -> Self {
        self.config.session.mode = mode;
        self
    }

    pub fn coordinator_address(mut self, address: &str) -> Self {
        self.config.session.coordinator_address = Some(address.to_string());
        self
    }

    pub fn max_units_per_request(mut self, n: usize) -> Self {
        self.config.session.max_units_per_request = n;
        self
    }

    pub fn max_targets_per_minion(mut self, n: usize) -> Self {
        self.config.session.max_targets_per_minion = n;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.session.poll_interval_ms = ms;
        self
    }

    pub fn linger_ms(mut self, ms: u64) -> Self {
        self.config.session.linger_ms = ms;
        self
    }

    /// The unvalidated file, for exercising validation itself.
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for SessionFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TargetConfig`.
pub struct TargetConfigBuilder {
    target: TargetConfig,
}

impl TargetConfigBuilder {
    /// A target without a build command.
    pub fn new() -> Self {
        Self {
            target: TargetConfig::default(),
        }
    }

    pub fn cmd(mut self, cmd: &str) -> Self {
        self.target.cmd = Some(cmd.to_string());
        self
    }

    pub fn dep(mut self, dep: &str) -> Self {
        self.target.deps.push(dep.to_string());
        self
    }

    pub fn runtime_dep(mut self, dep: &str) -> Self {
        self.target
            .runtime_deps
            .get_or_insert_with(Vec::new)
            .push(dep.to_string());
        self
    }

    pub fn build(self) -> TargetConfig {
        self.target
    }
}

impl Default for TargetConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory resolver: `target -> deps`, with no config file involved.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    targets: HashMap<String, ResolvedDeps>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `name` with static dependencies `deps`.
    pub fn target(mut self, name: &str, deps: &[&str]) -> Self {
        self.targets.insert(
            name.to_string(),
            ResolvedDeps::new(deps.iter().map(|d| d.to_string()).collect()),
        );
        self
    }

    /// Add `name` with static and runtime dependencies.
    pub fn target_with_runtime(mut self, name: &str, deps: &[&str], runtime: &[&str]) -> Self {
        self.targets.insert(
            name.to_string(),
            ResolvedDeps::new(deps.iter().map(|d| d.to_string()).collect())
                .with_runtime_deps(runtime.iter().map(|d| d.to_string()).collect()),
        );
        self
    }

    pub fn graph(&self, roots: &[&str]) -> DagGraph {
        DagGraph::build(&ids(roots), self).expect("Failed to build graph from resolver")
    }

    pub fn queue(&self, roots: &[&str]) -> TargetQueue {
        TargetQueue::new(&self.graph(roots))
    }
}

impl TargetResolver for StaticResolver {
    fn resolve(&self, target: &str) -> Option<ResolvedDeps> {
        self.targets.get(target).cloned()
    }
}

/// `["a", "b"]` -> owned target ids.
pub fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}
