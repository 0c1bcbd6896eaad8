//! Error types for backend_http
//!
//! This module defines the error types for all components of the crate.
//! Errors surfaced through completions are `Clone` so a single outcome can be
//! fanned out to every caller waiting on a coalesced operation.

use std::path::PathBuf;

use thiserror::Error;

use crate::app::client::JsonObject;

/// Failures of a single network round trip, before any response arrived
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request did not complete within the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// The connection to the backend could not be established
    #[error("Could not connect to backend: {0}")]
    Connect(String),

    /// Any other failure reported by the networking stack
    #[error("Transport failure: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TransportError::Timeout
        } else if error.is_connect() {
            TransportError::Connect(error.to_string())
        } else {
            TransportError::Other(error.to_string())
        }
    }
}

/// Errors carried in the `error` slot of an [`HttpResponse`](crate::app::client::HttpResponse)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// The request path could not be joined under the API prefix
    #[error("Invalid request path: {path} - {reason}")]
    InvalidPath { path: String, reason: String },

    /// The request body does not serialize to a JSON object
    #[error("Request body for {path} is not a JSON object: {reason}")]
    InvalidBody { path: String, reason: String },

    /// A header name or value cannot be sent
    #[error("Invalid request header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    /// Connectivity, timeout or TLS failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The response body is not a JSON object
    #[error("Could not decode response body: {reason}")]
    Decode { reason: String },

    /// A 304 arrived for a request that already skipped revalidation
    #[error("Received 304 Not Modified for {signature} without a cached response")]
    NotModifiedWithoutCache { signature: String },
}

impl NetworkError {
    /// Whether this error was raised before any network attempt
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            NetworkError::InvalidPath { .. }
                | NetworkError::InvalidBody { .. }
                | NetworkError::InvalidHeader { .. }
        )
    }
}

/// Typed result of a cacheable backend operation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// The request never produced a usable response
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// The backend answered with a status the operation does not accept
    #[error("Unexpected backend response: HTTP {status_code}")]
    UnexpectedResponse {
        status_code: i32,
        body: Option<JsonObject>,
    },
}

impl BackendError {
    /// Status code reported by the backend, if one was received
    pub fn status_code(&self) -> Option<i32> {
        match self {
            BackendError::UnexpectedResponse { status_code, .. } => Some(*status_code),
            BackendError::Network(_) => None,
        }
    }
}

/// Conditional cache snapshot errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// I/O error reading or writing a snapshot
    #[error("Cache snapshot I/O error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot could not be encoded or decoded
    #[error("Cache snapshot serialization error")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// I/O error reading the configuration
    #[error("Failed to read configuration file")]
    Io(#[from] std::io::Error),
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Network error
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Backend operation error
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Conditional cache snapshot error
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable (transient)
    ///
    /// This crate never retries on its own; the answer is advice for the
    /// domain layer deciding whether to call again.
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Network(NetworkError::Transport(_))
            | AppError::Backend(BackendError::Network(NetworkError::Transport(_))) => true,
            AppError::Backend(BackendError::UnexpectedResponse { status_code, .. }) => {
                *status_code >= 500
            }
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Network(_) => "network",
            AppError::Backend(_) => "backend",
            AppError::Cache(_) => "cache",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Network result type alias
pub type NetworkResult<T> = std::result::Result<T, NetworkError>;

/// Backend operation result type alias
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Cache result type alias
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_errors_are_flagged() {
        let path_error = NetworkError::InvalidPath {
            path: "health".to_string(),
            reason: "must start with '/'".to_string(),
        };
        let body_error = NetworkError::InvalidBody {
            path: "/receipts".to_string(),
            reason: "not an object".to_string(),
        };

        let header_error = NetworkError::InvalidHeader {
            name: "x-bad".to_string(),
            reason: "invalid value".to_string(),
        };

        assert!(path_error.is_construction());
        assert!(body_error.is_construction());
        assert!(header_error.is_construction());
        assert!(!NetworkError::Transport(TransportError::Timeout).is_construction());
    }

    #[test]
    fn test_recoverable_classification() {
        let transport = AppError::Network(NetworkError::Transport(TransportError::Timeout));
        assert!(transport.is_recoverable());
        assert_eq!(transport.category(), "network");

        let server = AppError::Backend(BackendError::UnexpectedResponse {
            status_code: 503,
            body: None,
        });
        assert!(server.is_recoverable());

        let client = AppError::Backend(BackendError::UnexpectedResponse {
            status_code: 401,
            body: None,
        });
        assert!(!client.is_recoverable());
        assert_eq!(client.category(), "backend");
    }

    #[test]
    fn test_backend_error_status_code() {
        let error = BackendError::UnexpectedResponse {
            status_code: 404,
            body: None,
        };
        assert_eq!(error.status_code(), Some(404));

        let network = BackendError::from(NetworkError::Decode {
            reason: "eof".to_string(),
        });
        assert_eq!(network.status_code(), None);
    }

    #[test]
    fn test_error_display() {
        let error = NetworkError::NotModifiedWithoutCache {
            signature: "GET https://example.com/v1/health".to_string(),
        };
        assert!(error.to_string().contains("304"));
        assert!(error.to_string().contains("/v1/health"));
    }
}
