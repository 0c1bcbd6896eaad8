//! Health probe operation

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::debug;

use crate::app::client::{HttpClient, HttpRequest, HttpResponse};
use crate::app::coalesce::{CacheKeyProviding, CallbackCache};
use crate::app::operation::{CacheableNetworkOperation, CacheableOperationFactory};
use crate::constants::paths;
use crate::errors::BackendError;

/// Receives the outcome of a health probe; `None` means healthy
pub type HealthCompletion = Box<dyn FnOnce(Option<BackendError>) + Send + 'static>;

/// A caller waiting on a health probe
pub struct HealthCallback {
    cache_key: String,
    completion: HealthCompletion,
}

impl HealthCallback {
    pub fn new(cache_key: impl Into<String>, completion: HealthCompletion) -> Self {
        Self {
            cache_key: cache_key.into(),
            completion,
        }
    }
}

impl CacheKeyProviding for HealthCallback {
    fn cache_key(&self) -> &str {
        &self.cache_key
    }
}

/// `GET /health`, optionally signed
pub struct HealthOperation {
    cache_key: String,
    signed: bool,
    http_client: HttpClient,
    callback_cache: Arc<CallbackCache<HealthCallback>>,
}

impl HealthOperation {
    /// Factory for a probe; signed and unsigned probes coalesce separately
    pub fn create_factory(
        http_client: HttpClient,
        callback_cache: Arc<CallbackCache<HealthCallback>>,
        signed: bool,
    ) -> CacheableOperationFactory<Self> {
        let individualized = if signed { "_signed" } else { "_unsigned" };
        CacheableOperationFactory::new(individualized, move |cache_key| Self {
            cache_key,
            signed,
            http_client,
            callback_cache,
        })
    }

    async fn run(self) {
        let mut request = HttpRequest::get(paths::HEALTH);
        if self.signed {
            request = request.signed();
        }

        let response = self.http_client.send(request, true).await;
        let outcome = interpret(response);
        debug!("Health probe {} finished: {:?}", self.cache_key, outcome);

        self.callback_cache
            .perform_on_all_and_remove(&self.cache_key, |callback| {
                (callback.completion)(outcome.clone());
            })
            .await;
    }
}

impl CacheableNetworkOperation for HealthOperation {
    fn cache_key(&self) -> &str {
        &self.cache_key
    }

    fn begin(self: Box<Self>) -> BoxFuture<'static, ()> {
        Box::pin(self.run())
    }
}

/// Map a response onto the probe's result
fn interpret(response: HttpResponse) -> Option<BackendError> {
    if let Some(error) = response.error {
        return Some(BackendError::Network(error));
    }
    if (200..300).contains(&response.status_code) {
        None
    } else {
        Some(BackendError::UnexpectedResponse {
            status_code: response.status_code,
            body: response.body,
        })
    }
}
