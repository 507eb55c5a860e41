//! # Batch Run
//!
//! `mdsc batch` runs one supervised batch over a fixture directory (see
//! [`mdsc_batch::fixture`] for the layout). Snapshots are appended to
//! `--output` as JSON Lines, or printed to stdout when no output is given.
//!
//! Exit code 0 on success; 1 after a fatal configuration error or once the
//! retry budget is exhausted.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use mdsc_batch::{
    BatchAdapters, BatchConfig, BatchOrchestrator, ComplianceSnapshotSink, FixtureStore,
    JsonLinesSink, MemorySnapshotSink,
};

/// Arguments for `mdsc batch`.
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Directory holding geographies.json, policies.json, devices.json and events.json.
    #[arg(long)]
    pub fixtures: PathBuf,

    /// JSON Lines file to append snapshots to.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Execute `mdsc batch`. `config` is the optional YAML configuration file.
pub fn run_batch(args: &BatchArgs, config: Option<&Path>) -> Result<u8> {
    let config = match config {
        Some(path) => BatchConfig::from_file_and_env(path),
        None => BatchConfig::from_env(),
    }
    .context("loading batch configuration")?;
    tracing::debug!(?config, "configuration resolved");

    let store = Arc::new(
        FixtureStore::load(&args.fixtures)
            .with_context(|| format!("loading fixtures from {}", args.fixtures.display()))?,
    );
    let memory = Arc::new(MemorySnapshotSink::new());
    let sink: Arc<dyn ComplianceSnapshotSink> = match &args.output {
        Some(path) => Arc::new(JsonLinesSink::open(path)?),
        None => memory.clone(),
    };

    let orchestrator = BatchOrchestrator::new(
        BatchAdapters {
            policies: store.clone(),
            geographies: store.clone(),
            gateway: store,
            sink,
        },
        config,
    );

    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    let report = runtime
        .block_on(orchestrator.run())
        .context("batch run failed")?;

    if args.output.is_none() {
        for snapshot in memory.snapshots() {
            println!("{}", serde_json::to_string(&snapshot).context("serializing snapshot")?);
        }
    }
    eprintln!(
        "{} snapshot(s) written for {} policy(ies), {} violation(s) as of {}",
        report.snapshots_written,
        report.policies_evaluated,
        report.total_violations,
        report.compliance_as_of.to_rfc3339()
    );
    Ok(0)
}
