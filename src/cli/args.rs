//! Command-line argument parsing for backend_http
//!
//! This module defines the CLI structure using clap derive macros. The
//! binary is a diagnostic front end: it probes the backend through the full
//! request stack and manages the configuration file.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// backend_http - Probe a JSON backend through the conditional request stack
#[derive(Parser, Debug)]
#[command(
    name = "backend_http",
    version,
    about = "Diagnostic client for the backend HTTP layer"
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode - only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check backend health
    Health(HealthArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Arguments for the health command
#[derive(Args, Debug, Clone)]
pub struct HealthArgs {
    /// Send a signed request carrying a nonce
    #[arg(long)]
    pub signed: bool,

    /// Number of concurrent probes; they share a single request
    #[arg(long, default_value_t = 1)]
    pub count: usize,
}

/// Arguments for the config command
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the default configuration file location
    Path,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Log level requested on the command line, if any
    pub fn log_level_override(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.verbose {
            Some(tracing::Level::DEBUG)
        } else {
            None
        }
    }
}
