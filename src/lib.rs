// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, RawConfigFile, load_from_path};
use crate::dag::{DagGraph, TargetQueue};
use crate::engine::{BuildStatusHandle, ModeRunner};
use crate::exec::CommandExecutor;
use crate::types::BuildStatus;

/// How many units the dry run pulls from a scratch queue.
const DRY_RUN_UNITS: usize = 8;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - session file loading and CLI overrides
/// - graph resolution
/// - the mode runner and its executor
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<BuildStatus> {
    let mut raw = load_from_path(&args.config)
        .with_context(|| format!("loading session file {}", args.config))?;
    apply_overrides(&mut raw, &args);
    let cfg = ConfigFile::try_from(raw)?;
    debug!(targets = cfg.target.len(), mode = %cfg.session.mode, "session loaded");

    if args.dry_run {
        print_dry_run(&cfg)?;
        return Ok(BuildStatus::Finished);
    }

    let status = BuildStatusHandle::new();

    // Ctrl-C → stop handing out and requesting work.
    {
        let status = status.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            info!("interrupted; failing build");
            status.mark_failed();
        });
    }

    let executor = CommandExecutor::from_config(&cfg);
    let runner = ModeRunner::from_config(&cfg, executor, status, args.minion_id.clone()).await?;
    info!(mode = %runner.mode(), "build session ready");
    let status = runner.run().await?;

    info!(?status, "build session over");
    Ok(status)
}

/// CLI flags win over the session file.
fn apply_overrides(raw: &mut RawConfigFile, args: &CliArgs) {
    if let Some(mode) = args.mode {
        raw.session.mode = mode;
    }
    if let Some(ref address) = args.coordinator {
        raw.session.coordinator_address = Some(address.clone());
    }
    if let Some(max_units) = args.max_units {
        raw.session.max_units_per_request = max_units;
    }
}

/// Print the build order and the first work units, without building.
fn print_dry_run(cfg: &ConfigFile) -> Result<()> {
    let graph = DagGraph::from_config(cfg)?;
    let order = graph.topological_order()?;

    println!("stampede dry-run");
    println!("  session.mode = {}", cfg.session.mode);
    println!("  session.roots = {:?}", graph.roots());
    println!(
        "  session.max_units_per_request = {}",
        cfg.session.max_units_per_request
    );
    println!();

    println!("build order ({} targets):", order.len());
    for (i, target) in order.iter().enumerate() {
        let deps = graph.dependencies_of(target);
        let dependents = graph.dependents_of(target);
        println!(
            "  {:>3}. {target}  (deps: {}, dependents: {})",
            i + 1,
            deps.len(),
            dependents.len()
        );
        if let Some(cmd) = cfg.target.get(target).and_then(|t| t.cmd.as_deref()) {
            println!("       cmd: {cmd}");
        }
    }
    println!();

    let mut scratch = TargetQueue::new(&graph);
    let units = scratch.dequeue_work(&[], DRY_RUN_UNITS)?;
    println!("first work units ({}):", units.len());
    for unit in &units {
        println!("  - {:?}", unit.target_ids);
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
