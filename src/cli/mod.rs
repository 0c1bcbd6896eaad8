//! Command-line interface components
//!
//! This module contains CLI-specific code for the backend_http binary:
//! argument parsing and the command handlers.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, ConfigAction, ConfigArgs, GlobalArgs, HealthArgs};
pub use commands::{handle_config, handle_health};
