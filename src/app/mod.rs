//! Core application logic for the backend HTTP layer
//!
//! This module contains the request execution pipeline and the pieces that
//! sit on top of it:
//!
//! - [`client`] - builds, signs and dispatches requests
//! - [`queue`] - serializes requests that must not overlap
//! - [`etag`] - conditional request cache
//! - [`coalesce`] - groups concurrent callers of one logical operation
//! - [`operation`] - cacheable operations and their dispatcher
//! - [`api`] - backend endpoints built from the above
//!
//! # Examples
//!
//! ```rust,no_run
//! use backend_http::app::{ClientConfig, HttpClient, InternalApi, OperationDispatcher};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new(ClientConfig::default().with_api_key("appl_key"))?;
//! let api = InternalApi::new(client, OperationDispatcher::default());
//!
//! match api.health(true).await {
//!     Ok(()) => println!("Backend is healthy"),
//!     Err(e) => eprintln!("Backend is unhealthy: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod coalesce;
pub mod etag;
pub mod operation;
pub mod queue;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// Re-export main public API
pub use api::InternalApi;
pub use client::{
    ClientConfig, Completion, Headers, HttpClient, HttpMethod, HttpRequest, HttpResponse,
    JsonObject, NonceSigner, RequestSigner, ReqwestTransport, SystemInfo, Transport,
};
pub use coalesce::{CacheKeyProviding, CallbackCache, CallbackCacheStatus};
pub use etag::{CacheEntry, ETagManager, Reconciliation};
pub use operation::{
    CacheableNetworkOperation, CacheableOperationFactory, DispatcherConfig, OperationDispatcher,
};
pub use queue::{QueueSnapshot, RequestQueue};
