//! Internal backend API
//!
//! Entry points that run as cacheable operations: concurrent identical calls
//! share one request and all receive its result.

use std::fmt;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::app::client::HttpClient;
use crate::app::coalesce::CallbackCache;
use crate::app::operation::OperationDispatcher;
use crate::errors::{BackendError, NetworkError, TransportError};

pub mod health;

pub use health::{HealthCallback, HealthCompletion, HealthOperation};

/// Internal endpoints of the backend
pub struct InternalApi {
    http_client: HttpClient,
    dispatcher: OperationDispatcher,
    health_callbacks: Arc<CallbackCache<HealthCallback>>,
}

impl InternalApi {
    pub fn new(http_client: HttpClient, dispatcher: OperationDispatcher) -> Self {
        Self {
            http_client,
            dispatcher,
            health_callbacks: Arc::new(CallbackCache::new()),
        }
    }

    /// Probe backend health
    ///
    /// Concurrent probes with the same `signed` flag share one request.
    /// `completion` receives `None` when the backend answered 2xx.
    pub async fn health_request<F>(&self, signed: bool, completion: F)
    where
        F: FnOnce(Option<BackendError>) + Send + 'static,
    {
        let factory = HealthOperation::create_factory(
            self.http_client.clone(),
            Arc::clone(&self.health_callbacks),
            signed,
        );

        let callback = HealthCallback::new(factory.cache_key(), Box::new(completion));
        let status = self.health_callbacks.add(callback).await;

        self.dispatcher
            .add_cacheable_operation(factory, false, status);
    }

    /// Probe backend health and wait for the outcome
    pub async fn health(&self, signed: bool) -> Result<(), BackendError> {
        let (tx, rx) = oneshot::channel();
        self.health_request(signed, move |outcome| {
            let _ = tx.send(outcome);
        })
        .await;

        match rx.await {
            Ok(None) => Ok(()),
            Ok(Some(error)) => Err(error),
            Err(_) => Err(BackendError::Network(NetworkError::Transport(
                TransportError::Other("health probe ended without a result".to_string()),
            ))),
        }
    }

    pub fn http_client(&self) -> &HttpClient {
        &self.http_client
    }

    /// Number of health probe groups currently in flight
    pub async fn pending_health_groups(&self) -> usize {
        self.health_callbacks.len().await
    }
}

impl fmt::Debug for InternalApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InternalApi")
            .field("http_client", &self.http_client)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}
