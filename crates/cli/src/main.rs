//! Linkwork command-line runner: loads a declarative pipeline document,
//! executes every chain in order, and reports the outcome.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{error, info};

use linkwork_engine::{CheckpointPolicy, Outcome, ProcessManager, persistence};

/// Runs a declarative analysis pipeline end to end.
#[derive(Debug, Parser)]
#[command(name = "linkwork", version, about = "Sequential pipeline runner for composable analysis links")]
struct Cli {
    /// Pipeline definition file (YAML or JSON).
    pipeline: PathBuf,

    /// Do not persist the store and configuration at checkpoints.
    #[arg(long = "store-none")]
    store_none: bool,

    /// Snapshot at every chain boundary instead of only at run end.
    #[arg(long = "every-chain")]
    every_chain: bool,

    /// Base directory for persisted results.
    #[arg(long)]
    results_dir: Option<PathBuf>,

    /// Analysis name used to derive persistence paths.
    #[arg(long)]
    analysis_name: Option<String>,

    /// Version namespace for persisted artifacts.
    #[arg(long)]
    analysis_version: Option<u32>,

    /// Restore this snapshot directory into the store and configuration
    /// before the pipeline is assembled.
    #[arg(long, value_name = "DIR")]
    resume_from: Option<PathBuf>,

    /// Settings override as key=value; repeatable, wins over the document.
    #[arg(short = 'c', long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run(cli)
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn run(cli: Cli) -> Result<()> {
    let mut manager = ProcessManager::new();
    if cli.every_chain {
        manager.set_checkpoint_policy(CheckpointPolicy::EveryChain);
    }

    if let Some(snapshot_dir) = &cli.resume_from {
        let (store, config) = persistence::restore(snapshot_dir)?;
        info!(path = %snapshot_dir.display(), entries = store.len(), "snapshot restored");
        manager.install_snapshot(store, config);
    }

    // Before the load, so pipelines_dir overrides steer include
    // resolution; again after, so the command line wins over the document.
    apply_cli_settings(&mut manager, &cli)?;
    manager
        .load_pipeline_file(&cli.pipeline)
        .with_context(|| format!("failed to load pipeline '{}'", cli.pipeline.display()))?;
    apply_cli_settings(&mut manager, &cli)?;

    let report = manager.execute_all();
    for chain in &report.chains {
        info!(chain = %chain.chain, outcome = %chain.outcome, links_run = chain.links_run, "chain finished");
    }

    if report.outcome == Outcome::Failure {
        if let Some(persistence_error) = &report.persistence_error {
            error!(error = %persistence_error, "persistence checkpoint failed");
        }
        let chain = report.failed_chain.as_deref().unwrap_or("<none>");
        let link = report.failed_link.as_deref().unwrap_or("<none>");
        bail!("pipeline failed in chain '{chain}', link '{link}'");
    }

    info!("pipeline succeeded");
    Ok(())
}

fn apply_cli_settings(manager: &mut ProcessManager, cli: &Cli) -> Result<()> {
    let config = manager.config();
    let mut config = config.borrow_mut();

    if cli.store_none {
        config.do_not_store_results = true;
    }
    if let Some(dir) = &cli.results_dir {
        config.results_dir = dir.clone();
    }
    if let Some(name) = &cli.analysis_name {
        config.apply_override("analysis_name", name)?;
    }
    if let Some(version) = cli.analysis_version {
        config.version = version;
    }
    for pair in &cli.overrides {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("expected KEY=VALUE, got '{pair}'"))?;
        config.apply_override(key.trim(), value.trim())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_flags_and_overrides() {
        let cli = Cli::try_parse_from([
            "linkwork",
            "pipeline.yaml",
            "--store-none",
            "--every-chain",
            "--analysis-name",
            "demo",
            "--analysis-version",
            "3",
            "-c",
            "results_dir=out",
            "-c",
            "do_not_store_results=false",
        ])
        .expect("parse CLI");

        assert_eq!(cli.pipeline, PathBuf::from("pipeline.yaml"));
        assert!(cli.store_none);
        assert!(cli.every_chain);
        assert_eq!(cli.analysis_name.as_deref(), Some("demo"));
        assert_eq!(cli.analysis_version, Some(3));
        assert_eq!(cli.overrides.len(), 2);
    }

    #[test]
    fn override_pairs_are_applied_in_order() {
        let cli = Cli::try_parse_from(["linkwork", "p.yaml", "-c", "version=1", "-c", "version=2"]).expect("parse CLI");
        let mut manager = ProcessManager::new();
        apply_cli_settings(&mut manager, &cli).expect("apply settings");
        assert_eq!(manager.config().borrow().version, 2);
    }

    #[test]
    fn malformed_override_is_rejected() {
        let cli = Cli::try_parse_from(["linkwork", "p.yaml", "-c", "no-equals"]).expect("parse CLI");
        let mut manager = ProcessManager::new();
        let error = apply_cli_settings(&mut manager, &cli).expect_err("must reject");
        assert!(format!("{error:#}").contains("KEY=VALUE"));
    }
}
