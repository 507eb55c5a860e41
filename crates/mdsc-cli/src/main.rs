//! # mdsc CLI entry point
//!
//! Parses command-line arguments, initializes logging and dispatches to
//! subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mdsc_cli::batch::{run_batch, BatchArgs};
use mdsc_cli::evaluate::{run_evaluate, EvaluateArgs};

/// Mobility compliance engine.
///
/// Evaluates count, speed and time policies against provider fleets and
/// produces compliance snapshots.
#[derive(Parser, Debug)]
#[command(name = "mdsc", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    /// Path to a YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate policies for one provider from JSON files.
    Evaluate(EvaluateArgs),

    /// Run one supervised batch over a fixture directory.
    Batch(BatchArgs),
}

fn init_tracing(verbose: u8, json: bool) {
    // Without -v, RUST_LOG decides; otherwise the flag does.
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);
    tracing::debug!("mdsc v{} starting", env!("CARGO_PKG_VERSION"));

    let result = match &cli.command {
        Commands::Evaluate(args) => run_evaluate(args),
        Commands::Batch(args) => run_batch(args, cli.config.as_deref()),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
