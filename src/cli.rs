// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::config::DEFAULT_CONFIG_FILE;
use crate::types::BuildMode;

/// Command-line arguments for `stampede`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "stampede",
    version,
    about = "Distributed build scheduler: coordinate and run chained work units across minions.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the build session file (TOML).
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Execution mode; overrides `[session].mode`.
    #[arg(long, value_name = "MODE", value_parser = parse_mode)]
    pub mode: Option<BuildMode>,

    /// Coordinator address (`host:port`); overrides `[session].coordinator_address`.
    ///
    /// In coordinator mode this is the bind address, in minion mode the
    /// address to connect to. Ignored in coordinator+minion mode, which
    /// always binds an ephemeral loopback port.
    #[arg(long, value_name = "ADDR")]
    pub coordinator: Option<String>,

    /// Name this minion reports to the coordinator.
    #[arg(long, value_name = "NAME")]
    pub minion_id: Option<String>,

    /// Work units requested per poll; overrides `[session].max_units_per_request`.
    #[arg(long, value_name = "N")]
    pub max_units: Option<usize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `STAMPEDE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve the graph and print the build order, but don't build anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn parse_mode(s: &str) -> Result<BuildMode, String> {
    s.parse()
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
