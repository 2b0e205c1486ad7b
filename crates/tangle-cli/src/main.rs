//! # tangle-cli
//!
//! Prints the transitive dependency graph of a package or a restored project.
//!
//! This is the entry point for the `tangle` binary. It parses arguments,
//! installs logging, wires Ctrl-C to the cancellation token and dispatches
//! to the command handlers.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tangle_core::error::{TangleError, TangleResult};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::CommandContext;
use output::errors::ErrorFormatter;

const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("TANGLE_BUILD_DATE"), ")");

/// Package dependency graph explorer
#[derive(Parser)]
#[command(name = "tangle", version, long_version = LONG_VERSION, about = "Explore transitive package dependencies")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a package from its repositories
    Package {
        /// Package id
        id: String,
        /// Exact package version
        version: String,
        /// Target framework, e.g. net48 or netstandard2.0
        #[arg(short, long)]
        framework: Option<String>,
        /// Repository URL; repeatable, replaces configured repositories
        #[arg(short, long = "source")]
        sources: Vec<String>,
        /// Print the graph as JSON
        #[arg(long)]
        json: bool,
    },
    /// Read a restored project's lock file
    Project {
        /// Path to a .csproj, .fsproj or .vbproj file
        path: PathBuf,
        /// Target framework; defaults to the project's own
        #[arg(short, long)]
        framework: Option<String>,
        /// Print the graph as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> TangleResult<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.log_json);
    info!("Starting tangle v{}", env!("CARGO_PKG_VERSION"));

    let result = run_cli(cli);
    if let Err(error) = &result {
        eprintln!("{}", ErrorFormatter::new().format_error(error));
    }
    result
}

fn run_cli(cli: Cli) -> TangleResult<()> {
    // Create Tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| TangleError::io("Failed to create async runtime".to_string(), e))?;

    rt.block_on(async {
        let cancel = CancellationToken::new();
        let interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling");
                interrupt.cancel();
            }
        });

        let ctx = CommandContext::new(cancel)?;
        commands::dispatch_command(cli.command, &ctx).await
    })
}

fn setup_logging(verbose: bool, json: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("tangle={}", level)));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
