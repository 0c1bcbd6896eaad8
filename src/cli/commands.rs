//! Command handlers for the backend_http binary

use std::env;
use std::path::Path;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::app::{ClientConfig, ETagManager, HttpClient, InternalApi, OperationDispatcher, ReqwestTransport};
use crate::config::AppConfig;
use crate::constants::env as env_constants;
use crate::errors::{AppError, NetworkError, Result};

use super::args::{ConfigAction, ConfigArgs, HealthArgs};

/// Handle the health command
///
/// Runs `args.count` concurrent probes; they coalesce into one request per
/// signing mode. The conditional cache is loaded from and saved to its
/// snapshot when persistence is enabled.
pub async fn handle_health(args: HealthArgs, config: &AppConfig) -> Result<()> {
    let (mut client_config, dispatcher_config) = config.to_runtime_config();
    apply_env_overrides(&mut client_config);

    let snapshot_path = config.etag.resolved_snapshot_path();
    let etag_manager = Arc::new(load_etag_manager(snapshot_path.as_deref()).await);

    let transport = ReqwestTransport::from_config(&client_config).map_err(NetworkError::from)?;
    let client = HttpClient::with_transport(
        client_config,
        Arc::new(transport),
        Arc::clone(&etag_manager),
    )?;
    let api = InternalApi::new(client, OperationDispatcher::new(dispatcher_config));

    let count = args.count.max(1);
    info!(
        "Probing backend health ({} probe(s), signed: {})",
        count, args.signed
    );

    let outcomes = join_all((0..count).map(|_| api.health(args.signed))).await;

    if let Some(path) = snapshot_path {
        let saved = etag_manager.save(&path).await?;
        debug!("Persisted {} ETag entries", saved);
    }

    let failures: Vec<_> = outcomes.into_iter().filter_map(|outcome| outcome.err()).collect();
    match failures.into_iter().next() {
        None => {
            println!("✅ Backend is healthy ({} probe(s))", count);
            Ok(())
        }
        Some(error) => {
            println!("❌ Backend health check failed: {}", error);
            Err(AppError::Backend(error))
        }
    }
}

/// Handle configuration commands
pub async fn handle_config(args: ConfigArgs) -> Result<()> {
    let config_path = AppConfig::default_config_path()
        .ok_or_else(|| AppError::generic("Could not determine user config directory"))?;

    match args.action {
        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
        ConfigAction::Init { force } => {
            if config_path.exists() && !force {
                println!(
                    "Configuration already exists at {}. Use --force to overwrite.",
                    config_path.display()
                );
                return Ok(());
            }

            if let Some(parent) = config_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&config_path, AppConfig::generate_default_config_content()).await?;

            println!("📁 Created default configuration file:");
            println!("   {}", config_path.display());
        }
    }

    Ok(())
}

/// Environment variables win over the configuration file
fn apply_env_overrides(config: &mut ClientConfig) {
    if let Ok(api_key) = env::var(env_constants::API_KEY) {
        if !api_key.is_empty() {
            debug!("Using API key from {}", env_constants::API_KEY);
            config.api_key = Some(api_key);
        }
    }
    if let Ok(base_url) = env::var(env_constants::BASE_URL) {
        if !base_url.is_empty() {
            debug!("Using base URL from {}: {}", env_constants::BASE_URL, base_url);
            config.base_url = base_url;
        }
    }
}

/// Load the conditional cache snapshot, starting empty when there is none
async fn load_etag_manager(snapshot_path: Option<&Path>) -> ETagManager {
    let Some(path) = snapshot_path.filter(|path| path.exists()) else {
        return ETagManager::new();
    };

    match ETagManager::from_snapshot(path).await {
        Ok(manager) => manager,
        Err(e) => {
            warn!("Ignoring unreadable ETag snapshot {}: {}", path.display(), e);
            ETagManager::new()
        }
    }
}
