//! runx - run apps in disposable cached environments
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use runx::cli::{Cli, Commands};
use runx::config::ConfigManager;
use runx::error::RunxResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> RunxResult<()> {
    let cli = Cli::parse();

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("runx=warn"),
        1 => EnvFilter::new("runx=info"),
        _ => EnvFilter::new("runx=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    // Load configuration
    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };
    let config = config_manager.load().await?;

    // Dispatch to command
    match cli.command {
        Commands::Run(args) => runx::cli::commands::run(args, &config).await,
        Commands::Cache(args) => runx::cli::commands::cache(args, &config).await,
    }
}
