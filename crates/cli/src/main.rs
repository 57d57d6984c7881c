//! Cluster inventory CLI
//!
//! Collects a point-in-time resource inventory of a Kubernetes cluster into
//! a JSON snapshot, and renders existing snapshots.

mod commands;
mod config;
mod output;
mod progress;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use commands::{collect, show};
use inventory_lib::Discipline;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Kubernetes cluster resource inventory
#[derive(Parser)]
#[command(name = "kinv")]
#[command(author, version, about = "Kubernetes cluster resource inventory", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ~/.config/kinv/config.toml)
    #[arg(long, global = true, env = "KINV_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, default_value = "pretty")]
    pub log_format: LogFormat,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect a snapshot of the current cluster
    Collect(CollectArgs),

    /// Render an existing snapshot
    Show {
        /// Snapshot file
        path: PathBuf,

        /// Output format
        #[arg(long, short, default_value = "table")]
        format: output::OutputFormat,
    },
}

#[derive(Args, Debug, Default)]
pub struct CollectArgs {
    /// Kubeconfig context to use (current context if not specified)
    #[arg(long, env = "KINV_CONTEXT")]
    pub context: Option<String>,

    /// Snapshot file to write
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Replace cluster, node and namespace names with SHA-256 digests
    #[arg(long)]
    pub obfuscate: bool,

    /// Continue from an existing snapshot, collecting only missing units
    #[arg(long)]
    pub resume: bool,

    /// Maximum concurrent collection jobs (1-8, derived from CPU count if unset)
    #[arg(long, short)]
    pub parallelism: Option<usize>,

    /// Job scheduling discipline (completion or batch)
    #[arg(long)]
    pub discipline: Option<Discipline>,

    /// Write Prometheus metrics for the run to this file
    #[arg(long)]
    pub metrics_file: Option<PathBuf>,

    /// Do not draw a progress bar
    #[arg(long)]
    pub no_progress: bool,
}

fn init_tracing(format: LogFormat, verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format, cli.verbose);

    match cli.command {
        Commands::Collect(args) => {
            let settings = config::load(cli.config.as_deref())?;
            let complete = collect::run(settings, args, cli.verbose).await?;
            if !complete {
                // Partial snapshot written; a resumed run can finish it
                std::process::exit(2);
            }
        }
        Commands::Show { path, format } => {
            show::show_snapshot(&path, format)?;
        }
    }

    Ok(())
}
