//! Application constants for backend_http
//!
//! This module centralizes all constants used throughout the crate,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names
pub mod env {
    /// Environment variable overriding the configured API key
    pub const API_KEY: &str = "BACKEND_API_KEY";

    /// Environment variable overriding the configured base URL
    pub const BASE_URL: &str = "BACKEND_BASE_URL";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = concat!("backend_http/", env!("CARGO_PKG_VERSION"));

    /// Fixed backend host every relative path is resolved against
    pub const BASE_URL: &str = "https://api.revenuecat.com";

    /// API version prefix joined in front of every request path
    pub const API_VERSION: &str = "v1";

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Keep at most one idle connection per host
    pub const POOL_MAX_PER_HOST: usize = 1;

    /// JSON content type sent with every request
    pub const CONTENT_TYPE_JSON: &str = "application/json";
}

/// Header names, lowercase so they can be compared directly
pub mod headers {
    pub const CONTENT_TYPE: &str = "content-type";
    pub const AUTHORIZATION: &str = "authorization";
    pub const IF_NONE_MATCH: &str = "if-none-match";
    pub const ETAG: &str = "etag";
    pub const NONCE: &str = "x-nonce";
    pub const VERSION: &str = "x-version";
    pub const PLATFORM: &str = "x-platform";
    pub const PLATFORM_VERSION: &str = "x-platform-version";
    pub const PLATFORM_FLAVOR: &str = "x-platform-flavor";
    pub const PLATFORM_FLAVOR_VERSION: &str = "x-platform-flavor-version";
    pub const CLIENT_VERSION: &str = "x-client-version";
    pub const CLIENT_BUILD_VERSION: &str = "x-client-build-version";
    pub const OBSERVER_MODE_ENABLED: &str = "x-observer-mode-enabled";
    pub const DEVICE_IDENTIFIER: &str = "x-device-identifier";
}

/// Status codes with special meaning in the result surface
pub mod status {
    /// Local failure before any network attempt (malformed request)
    pub const INVALID_REQUEST: i32 = -1;

    /// Returned by the server when the conditional request matched
    pub const NOT_MODIFIED: i32 = 304;

    /// Reported for transport failures where no response arrived
    pub const NETWORK_CONNECT_TIMEOUT_ERROR: i32 = 599;
}

/// Backend endpoint paths, relative to the API version prefix
pub mod paths {
    /// Health probe endpoint
    pub const HEALTH: &str = "/health";
}

/// Cacheable operation scheduling
pub mod operations {
    use super::Duration;

    /// Operations run one at a time unless configured otherwise
    pub const DEFAULT_MAX_CONCURRENT: usize = 1;

    /// Upper bound for the random start jitter
    pub const DEFAULT_RANDOM_DELAY_MAX: Duration = Duration::from_secs(5);

    /// Size in bytes of the random nonce attached to signed requests
    pub const NONCE_BYTES: usize = 12;
}

/// Conditional cache snapshot files
pub mod files {
    /// Default file name for an ETag snapshot
    pub const ETAG_SNAPSHOT_FILE_NAME: &str = "etags.json";

    /// Temporary file suffix for atomic writes
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";

    /// Directory under the OS config dir holding config and snapshots
    pub const APP_DIR_NAME: &str = "backend-http";

    /// Configuration file name
    pub const CONFIG_FILE_NAME: &str = "config.toml";
}

/// Logging constants
pub mod logging {
    /// Default log level
    pub const DEFAULT_LOG_LEVEL: &str = "info";
}

// Re-export commonly used constants for convenience
pub use http::{BASE_URL, DEFAULT_TIMEOUT as HTTP_TIMEOUT, USER_AGENT};
pub use status::{INVALID_REQUEST, NETWORK_CONNECT_TIMEOUT_ERROR, NOT_MODIFIED};
