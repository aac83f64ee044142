//! devmap CLI - normalize raw device-model strings with two inference providers.
//!
//! Reads raw device labels from a CSV file, asks two LLM providers to map each
//! one to brand, model, CPU, RAM and refresh rate, and appends both answers
//! side by side to an output CSV for review.
//!
//! # Usage
//!
//! ```bash
//! # Map every label in the configured input file
//! devmap run
//!
//! # Override files and batching for one run
//! devmap run --input devices.csv --output cross_check.csv --batch-size 10
//!
//! # Show which labels would be sent, without calling any provider
//! devmap run --dry-run
//!
//! # View configuration
//! devmap config show
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;

/// devmap - cross-check device-model mappings from two inference providers.
#[derive(Parser, Debug)]
#[command(name = "devmap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(short, long, global = true, env = "DEVMAP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Map device labels from the input file and append merged rows to the output
    Run(cli::run::RunArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match cli::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) if cli.config.is_none() => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `devmap config path`."
            );
            devmap_core::Config::default()
        }
        Err(e) => return Err(e.into()),
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("devmap v{}", devmap_core::VERSION);

    match cli.command {
        Commands::Run(args) => cli::run::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args, config, cli.config).await,
    }
}
