//! backend_http CLI application
//!
//! Diagnostic front end for the backend HTTP layer: loads configuration,
//! sets up logging and runs one command through the full request stack.

use std::process;

use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use backend_http::cli::{Cli, Commands, handle_config, handle_health};
use backend_http::config::{AppConfig, LoggingConfig};
use backend_http::errors::Result;

#[tokio::main]
async fn main() {
    // Initialize program
    let result = run().await;

    // Handle any errors that occurred
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    let config = AppConfig::load(cli.global.config.clone()).await?;

    init_logging(&cli, &config.logging);

    info!("backend_http v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Health(args) => {
            info!("Executing health command");
            handle_health(args, &config).await
        }
        Commands::Config(args) => {
            info!("Executing config command");
            handle_config(args).await
        }
    }
}

/// Initialize logging from the CLI flags, falling back to the configured level
fn init_logging(cli: &Cli, logging: &LoggingConfig) {
    let level = cli
        .log_level_override()
        .map(|level| level.to_string().to_lowercase())
        .unwrap_or_else(|| logging.level.clone());

    let filter = EnvFilter::from_default_env();
    let filter = match format!("backend_http={}", level).parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(e) => {
            eprintln!("Ignoring invalid log level {:?}: {}", level, e);
            filter
        }
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(logging.colored_output)
        .init();
}
