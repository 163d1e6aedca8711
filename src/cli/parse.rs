//! CLI parse: clap types for livequery. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// livequery CLI - inspect cache keys and run one-shot queries
#[derive(Parser)]
#[command(name = "livequery")]
#[command(about = "Reactive remote query client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (where livequery.toml lives)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the cache key for a function and its arguments
    Key {
        /// Function identifier, e.g. "tasks:get"
        function: String,
        /// Arguments as a JSON object
        #[arg(long)]
        args: Option<String>,
        /// Derive the key of the skip sentinel instead
        #[arg(long, conflicts_with = "args")]
        skip: bool,
    },
    /// Run a query once over HTTP and print its value
    Query {
        /// Function identifier, e.g. "tasks:list"
        function: String,
        /// Arguments as a JSON object
        #[arg(long)]
        args: Option<String>,
        /// Send without credentials
        #[arg(long)]
        public: bool,
    },
    /// Print the effective configuration as TOML
    Config,
}
