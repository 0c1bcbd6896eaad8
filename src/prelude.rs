//! Prelude module for backend_http
//!
//! This module re-exports the most commonly used items from the library,
//! providing a convenient way to import everything needed for typical usage
//! with a single `use backend_http::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use backend_http::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = HttpClient::new(ClientConfig::default())?;
//!     let response = client.send(HttpRequest::get("/health"), true).await;
//!     println!("HTTP {}", response.status_code);
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, BackendError, NetworkError, Result};

// Request execution
pub use crate::app::{
    ClientConfig, Headers, HttpClient, HttpMethod, HttpRequest, HttpResponse, JsonObject,
    SystemInfo,
};

// Conditional cache
pub use crate::app::ETagManager;

// Coalescing and operations
pub use crate::app::{
    CacheKeyProviding, CacheableNetworkOperation, CacheableOperationFactory, CallbackCache,
    CallbackCacheStatus, DispatcherConfig, InternalApi, OperationDispatcher,
};

// Configuration
pub use crate::config::AppConfig;
