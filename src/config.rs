//! Configuration management for backend_http
//!
//! This module loads the TOML configuration file, falls back to defaults
//! when none exists, and converts the file form into the runtime
//! configuration types used by the client and the operation dispatcher.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{ClientConfig, DispatcherConfig, SystemInfo};
use crate::constants::{files, http, logging, operations};
use crate::errors::{ConfigError, ConfigResult};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Client identity headers
    pub system: SystemConfigToml,
    /// Cacheable operation settings
    pub operations: OperationsConfigToml,
    /// Conditional cache persistence
    pub etag: ETagConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// Backend host
    pub base_url: String,
    /// API version prefix
    pub api_version: String,
    /// API key sent as a bearer token
    pub api_key: Option<String>,
    /// Request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Connect timeout
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// TCP nodelay setting
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout (None = no timeout)
    #[serde(with = "humantime_serde")]
    pub pool_idle_timeout: Option<Duration>,
    /// Maximum idle connections per host
    pub pool_max_per_host: usize,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            base_url: http::BASE_URL.to_string(),
            api_version: http::API_VERSION.to_string(),
            api_key: None,
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            tcp_nodelay: true,
            pool_idle_timeout: Some(http::POOL_IDLE_TIMEOUT),
            pool_max_per_host: http::POOL_MAX_PER_HOST,
        }
    }
}

/// TOML-friendly client identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfigToml {
    pub platform: String,
    pub platform_version: String,
    pub platform_flavor: String,
    pub platform_flavor_version: Option<String>,
    pub app_version: String,
    pub build_version: String,
    /// Whether this client finishes transactions itself (false = observer mode)
    pub finish_transactions: bool,
    pub device_identifier: Option<String>,
}

impl Default for SystemConfigToml {
    fn default() -> Self {
        let info = SystemInfo::default();
        Self {
            platform: info.platform,
            platform_version: info.platform_version,
            platform_flavor: info.platform_flavor,
            platform_flavor_version: info.platform_flavor_version,
            app_version: info.app_version,
            build_version: info.build_version,
            finish_transactions: info.finish_transactions,
            device_identifier: info.device_identifier,
        }
    }
}

/// TOML-friendly operation dispatcher configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationsConfigToml {
    /// Operations allowed to run at the same time
    pub max_concurrent_operations: usize,
    /// Upper bound of the random start delay
    #[serde(with = "humantime_serde")]
    pub random_delay_max: Duration,
}

impl Default for OperationsConfigToml {
    fn default() -> Self {
        Self {
            max_concurrent_operations: operations::DEFAULT_MAX_CONCURRENT,
            random_delay_max: operations::DEFAULT_RANDOM_DELAY_MAX,
        }
    }
}

/// Conditional cache persistence settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ETagConfigToml {
    /// Load the snapshot on start and save it on exit
    pub persist: bool,
    /// Snapshot location (None = next to the config file)
    pub snapshot_path: Option<PathBuf>,
}

impl ETagConfigToml {
    /// Snapshot file to use, if persistence is enabled
    pub fn resolved_snapshot_path(&self) -> Option<PathBuf> {
        if !self.persist {
            return None;
        }
        self.snapshot_path.clone().or_else(|| {
            dirs::config_dir().map(|dir| {
                dir.join(files::APP_DIR_NAME)
                    .join(files::ETAG_SNAPSHOT_FILE_NAME)
            })
        })
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level for the application
    pub level: String,
    /// Enable colored output
    pub colored_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
            colored_output: true,
        }
    }
}

impl AppConfig {
    /// Convert TOML-friendly configuration to runtime configuration
    pub fn to_runtime_config(&self) -> (ClientConfig, DispatcherConfig) {
        let client = self
            .client
            .to_runtime_config()
            .with_system_info(self.system.to_runtime_config());
        (client, self.operations.to_runtime_config())
    }

    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the default location is
    /// used when present and built-in defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing (explicit path only),
    /// unreadable, malformed, or holds invalid values
    pub async fn load(config_file_override: Option<PathBuf>) -> ConfigResult<Self> {
        let config_path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path });
                }
                Some(path)
            }
            None => Self::default_config_path().filter(|path| path.exists()),
        };

        let config = match config_path {
            Some(path) => {
                debug!("Loading config from: {}", path.display());
                Self::load_from_file(&path).await?
            }
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Default config file path for the current user
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(files::APP_DIR_NAME).join(files::CONFIG_FILE_NAME))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: AppConfig = toml::from_str(&content)?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Check values serde cannot check on its own
    pub fn validate(&self) -> ConfigResult<()> {
        if let Err(e) = url::Url::parse(&self.client.base_url) {
            return Err(ConfigError::InvalidValue {
                field: "client.base_url".to_string(),
                value: self.client.base_url.clone(),
                reason: e.to_string(),
            });
        }

        if self.client.api_version.is_empty() || self.client.api_version.contains('/') {
            return Err(ConfigError::InvalidValue {
                field: "client.api_version".to_string(),
                value: self.client.api_version.clone(),
                reason: "must be a single non-empty path segment".to_string(),
            });
        }

        if self.operations.max_concurrent_operations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "operations.max_concurrent_operations".to_string(),
                value: "0".to_string(),
                reason: "at least one operation must be allowed to run".to_string(),
            });
        }

        Ok(())
    }

    /// Generate default configuration content with helpful comments
    pub fn generate_default_config_content() -> String {
        format!(
            r#"# backend_http configuration

[client]
base_url = "{}"
api_version = "{}"
# api_key = "appl_..."   # or set BACKEND_API_KEY
request_timeout = "60s"
connect_timeout = "30s"
tcp_nodelay = true
pool_idle_timeout = "90s"
pool_max_per_host = {}

[system]
platform_flavor = "native"
app_version = "unknown"
build_version = "unknown"
finish_transactions = true

[operations]
max_concurrent_operations = {}
random_delay_max = "5s"

[etag]
persist = false
# snapshot_path = "/path/to/etags.json"

[logging]
level = "{}"  # error, warn, info, debug, trace
colored_output = true
"#,
            http::BASE_URL,
            http::API_VERSION,
            http::POOL_MAX_PER_HOST,
            operations::DEFAULT_MAX_CONCURRENT,
            logging::DEFAULT_LOG_LEVEL,
        )
    }
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            api_version: self.api_version.clone(),
            api_key: self.api_key.clone(),
            request_timeout: self.request_timeout,
            connect_timeout: self.connect_timeout,
            tcp_nodelay: self.tcp_nodelay,
            pool_idle_timeout: self.pool_idle_timeout,
            pool_max_per_host: self.pool_max_per_host,
            system_info: SystemInfo::default(),
        }
    }
}

impl SystemConfigToml {
    /// Convert to runtime SystemInfo
    pub fn to_runtime_config(&self) -> SystemInfo {
        SystemInfo {
            platform: self.platform.clone(),
            platform_version: self.platform_version.clone(),
            platform_flavor: self.platform_flavor.clone(),
            platform_flavor_version: self.platform_flavor_version.clone(),
            app_version: self.app_version.clone(),
            build_version: self.build_version.clone(),
            finish_transactions: self.finish_transactions,
            device_identifier: self.device_identifier.clone(),
        }
    }
}

impl OperationsConfigToml {
    /// Convert to runtime DispatcherConfig
    pub fn to_runtime_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            max_concurrent_operations: self.max_concurrent_operations,
            random_delay_max: self.random_delay_max,
        }
    }
}
