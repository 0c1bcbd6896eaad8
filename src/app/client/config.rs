//! HTTP client configuration and building logic
//!
//! This module handles the configuration of the execution layer: where
//! requests go, how the underlying `reqwest` client is tuned, and which
//! identity headers accompany every request.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{headers, http};
use crate::errors::{NetworkError, NetworkResult, TransportError};

use super::types::Headers;

/// Identity of the client application, sent as baseline headers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Platform name, e.g. "iOS" or "linux"
    pub platform: String,
    /// Platform (OS) version
    pub platform_version: String,
    /// SDK flavor, e.g. "native" or a cross-platform wrapper name
    pub platform_flavor: String,
    /// Version of the wrapper flavor, if any
    pub platform_flavor_version: Option<String>,
    /// Host application version
    pub app_version: String,
    /// Host application build number
    pub build_version: String,
    /// Whether this client finishes transactions itself
    pub finish_transactions: bool,
    /// Stable per-device identifier, if the host exposes one
    pub device_identifier: Option<String>,
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            platform: std::env::consts::OS.to_string(),
            platform_version: "unknown".to_string(),
            platform_flavor: "native".to_string(),
            platform_flavor_version: None,
            app_version: "unknown".to_string(),
            build_version: "unknown".to_string(),
            finish_transactions: true,
            device_identifier: None,
        }
    }
}

impl SystemInfo {
    /// Baseline headers attached to every request
    pub fn default_headers(&self) -> Headers {
        let observer_mode = if self.finish_transactions {
            "false"
        } else {
            "true"
        };

        let mut map = Headers::new();
        map.insert(
            headers::CONTENT_TYPE.to_string(),
            http::CONTENT_TYPE_JSON.to_string(),
        );
        map.insert(
            headers::VERSION.to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        map.insert(headers::PLATFORM.to_string(), self.platform.clone());
        map.insert(
            headers::PLATFORM_VERSION.to_string(),
            self.platform_version.clone(),
        );
        map.insert(
            headers::PLATFORM_FLAVOR.to_string(),
            self.platform_flavor.clone(),
        );
        map.insert(headers::CLIENT_VERSION.to_string(), self.app_version.clone());
        map.insert(
            headers::CLIENT_BUILD_VERSION.to_string(),
            self.build_version.clone(),
        );
        map.insert(
            headers::OBSERVER_MODE_ENABLED.to_string(),
            observer_mode.to_string(),
        );

        if let Some(flavor_version) = &self.platform_flavor_version {
            map.insert(
                headers::PLATFORM_FLAVOR_VERSION.to_string(),
                flavor_version.clone(),
            );
        }
        if let Some(device_identifier) = &self.device_identifier {
            map.insert(
                headers::DEVICE_IDENTIFIER.to_string(),
                device_identifier.clone(),
            );
        }

        map
    }
}

/// Configuration for the HTTP execution layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend host every relative path is resolved against
    pub base_url: String,
    /// API version prefix, joined as `/{api_version}{path}`
    pub api_version: String,
    /// API key sent as a bearer token, if configured
    pub api_key: Option<String>,
    /// Request timeout
    pub request_timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// TCP nodelay (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout
    pub pool_idle_timeout: Option<Duration>,
    /// Maximum idle connections per host
    pub pool_max_per_host: usize,
    /// Client identity headers
    pub system_info: SystemInfo,
}

impl Default for ClientConfig {
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
            system_info: SystemInfo::default(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration pointing at a custom backend host
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the API key sent as a bearer token
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the client identity
    pub fn with_system_info(mut self, system_info: SystemInfo) -> Self {
        self.system_info = system_info;
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Parse the configured base URL
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::InvalidPath` if the base URL does not parse
    pub fn parsed_base_url(&self) -> NetworkResult<Url> {
        Url::parse(&self.base_url).map_err(|e| NetworkError::InvalidPath {
            path: self.base_url.clone(),
            reason: e.to_string(),
        })
    }

    /// Baseline headers: identity headers plus authorization when a key is set
    pub fn default_headers(&self) -> Headers {
        let mut map = self.system_info.default_headers();
        if let Some(api_key) = &self.api_key {
            map.insert(
                headers::AUTHORIZATION.to_string(),
                format!("Bearer {}", api_key),
            );
        }
        map
    }

    /// Builds the HTTP client with the specified configuration
    ///
    /// Redirects are never followed and no cookie store is kept.
    pub fn build_http_client(&self) -> Result<Client, TransportError> {
        let mut client_builder = Client::builder()
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(http::USER_AGENT)
            .redirect(reqwest::redirect::Policy::none())
            .tcp_nodelay(self.tcp_nodelay)
            .pool_max_idle_per_host(self.pool_max_per_host);

        if let Some(idle_timeout) = self.pool_idle_timeout {
            client_builder = client_builder.pool_idle_timeout(idle_timeout);
        }

        client_builder.build().map_err(TransportError::from)
    }
}
