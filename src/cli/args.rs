//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// runx - run Python scripts and package apps in disposable cached
/// environments
#[derive(Parser, Debug)]
#[command(name = "runx")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "RUNX_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a script or package app in an isolated environment
    Run(RunArgs),

    /// Manage the environment cache
    Cache(CacheArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Script path, script URL, or package specification to run
    pub target: String,

    /// Install source overriding the target (the target stays the app name)
    #[arg(long)]
    pub spec: Option<String>,

    /// Require the target to be an existing local path
    #[arg(long)]
    pub path: bool,

    /// Interpreter to build environments with (defaults from config)
    #[arg(long)]
    pub python: Option<String>,

    /// Extra argument passed to the installer (repeatable)
    #[arg(long = "pip-arg", allow_hyphen_values = true)]
    pub pip_args: Vec<String>,

    /// Extra argument passed to environment creation (repeatable)
    #[arg(long = "venv-arg", allow_hyphen_values = true)]
    pub venv_args: Vec<String>,

    /// Require a project-local __pypackages__ install and run from it
    #[arg(long)]
    pub local: bool,

    /// Build a fresh environment and expire it after this run
    #[arg(long)]
    pub no_cache: bool,

    /// Skip the periodic newer-version check
    #[arg(long)]
    pub no_advisory: bool,

    /// Arguments passed through to the application
    #[arg(last = true)]
    pub app_args: Vec<String>,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cached environments
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Reap expired environments now
    Sweep {
        /// Show what would be removed without removing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Remove all cached environments
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Output format for list commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
