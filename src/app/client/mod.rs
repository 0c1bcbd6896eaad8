//! HTTP execution layer for the backend API
//!
//! [`HttpClient`] is the single entry point for backend requests. It resolves
//! paths under the API prefix, merges default and per-request headers, adds
//! conditional `If-None-Match` headers from the [`ETagManager`] and funnels
//! serial requests through the [`RequestQueue`] so at most one is in flight.
//!
//! The module is organized into specialized components:
//! - `types`: wire-level request and response types
//! - `request`: the caller-facing [`HttpRequest`] description
//! - `finite`: body serialization that refuses NaN and infinities
//! - `config`: client identity and connection configuration
//! - `transport`: the [`Transport`] seam and its `reqwest` implementation
//! - `signing`: signing transforms applied to signed requests
//! - `response`: decoding of raw bodies into cache-ready replies
//!
//! Every submitted request gets exactly one completion call, whether it fails
//! locally, fails in the transport, is answered from the cache or is retried.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::app::etag::{ETagManager, Reconciliation};
use crate::app::queue::{QueueEntry, QueueSnapshot, RequestId, RequestQueue};
use crate::constants::headers;
use crate::errors::{NetworkError, NetworkResult, TransportError};

// Module declarations
pub mod config;
mod finite;
pub mod request;
pub mod response;
pub mod signing;
pub mod transport;
pub mod types;

pub use config::{ClientConfig, SystemInfo};
pub use request::HttpRequest;
pub use signing::{NonceSigner, RequestSigner};
pub use transport::{ReqwestTransport, Transport};
pub use types::{
    Completion, Headers, HttpMethod, HttpResponse, JsonObject, PreparedRequest, RawResponse,
};

/// Backend HTTP client
///
/// Cheap to clone; clones share the queue, the conditional cache and the
/// transport.
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    base_url: Url,
    default_headers: Headers,
    transport: Arc<dyn Transport>,
    etag_manager: Arc<ETagManager>,
    queue: RequestQueue,
    signer: Arc<dyn RequestSigner>,
}

impl HttpClient {
    /// Creates a client talking to the backend over `reqwest`
    ///
    /// # Errors
    ///
    /// Returns `NetworkError` if the base URL is invalid or the underlying
    /// HTTP client cannot be built
    pub fn new(config: ClientConfig) -> NetworkResult<Self> {
        let transport = ReqwestTransport::from_config(&config)?;
        Self::with_transport(config, Arc::new(transport), Arc::new(ETagManager::new()))
    }

    /// Creates a client over a custom transport and conditional cache
    ///
    /// # Arguments
    ///
    /// * `config` - Client configuration settings
    /// * `transport` - Performs the actual round trips
    /// * `etag_manager` - Conditional cache, possibly shared or preloaded
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::InvalidPath` if the base URL is invalid
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        etag_manager: Arc<ETagManager>,
    ) -> NetworkResult<Self> {
        Self::with_parts(config, transport, etag_manager, Arc::new(NonceSigner))
    }

    /// Creates a client from all of its collaborators
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::InvalidPath` if the base URL is invalid
    pub fn with_parts(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        etag_manager: Arc<ETagManager>,
        signer: Arc<dyn RequestSigner>,
    ) -> NetworkResult<Self> {
        let base_url = config.parsed_base_url()?;
        let default_headers = config.default_headers();

        info!(
            "Created backend client for {} (API {})",
            base_url, config.api_version
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                base_url,
                default_headers,
                transport,
                etag_manager,
                queue: RequestQueue::new(),
                signer,
            }),
        })
    }

    /// Submit a request
    ///
    /// Returns once the request is dispatched or queued. `completion` is
    /// called exactly once: immediately with status `-1` if the request
    /// cannot be built, otherwise from the dispatch task when the outcome is
    /// known.
    ///
    /// # Arguments
    ///
    /// * `request` - What to send
    /// * `serial` - Whether to wait for the single serial slot
    /// * `completion` - Receives the final response
    pub async fn perform(&self, request: HttpRequest, serial: bool, completion: Completion) {
        let prepared = match self.prepare(&request) {
            Ok(prepared) => prepared,
            Err(e) => {
                error!("Could not create request to {}: {}", request.path(), e);
                completion(HttpResponse::construction_failure(e));
                return;
            }
        };

        let entry = QueueEntry::new(request, prepared, serial, completion);
        debug!("Request queued: {}", entry.describe());

        if let Some(entry) = self.inner.queue.submit(entry).await {
            self.dispatch(entry);
        }
    }

    /// Submit a GET request
    pub async fn perform_get<F>(&self, serial: bool, path: &str, extra_headers: &Headers, completion: F)
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        let request = HttpRequest::get(path).with_headers(extra_headers);
        self.perform(request, serial, Box::new(completion)).await;
    }

    /// Submit a POST request with a body that must serialize to a JSON object
    ///
    /// A body that does not serialize to an object is reported through
    /// `completion` with status `-1` and nothing is sent.
    pub async fn perform_post<T, F>(
        &self,
        serial: bool,
        path: &str,
        body: &T,
        extra_headers: &Headers,
        completion: F,
    ) where
        T: Serialize + ?Sized,
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        match HttpRequest::post_json(path, body) {
            Ok(request) => {
                let request = request.with_headers(extra_headers);
                self.perform(request, serial, Box::new(completion)).await;
            }
            Err(e) => {
                error!("Could not create request to {}: {}", path, e);
                completion(HttpResponse::construction_failure(e));
            }
        }
    }

    /// Submit a request and wait for its response
    pub async fn send(&self, request: HttpRequest, serial: bool) -> HttpResponse {
        let (tx, rx) = oneshot::channel();
        self.perform(
            request,
            serial,
            Box::new(move |response: HttpResponse| {
                let _ = tx.send(response);
            }),
        )
        .await;

        rx.await.unwrap_or_else(|_| {
            HttpResponse::transport_failure(NetworkError::Transport(TransportError::Other(
                "dispatch task ended without a response".to_string(),
            )))
        })
    }

    /// Drop every stored conditional response
    pub async fn clear_caches(&self) {
        self.inner.etag_manager.clear().await;
    }

    /// The conditional cache used by this client
    pub fn etag_manager(&self) -> &Arc<ETagManager> {
        &self.inner.etag_manager
    }

    /// Current depth of the serial queue
    pub async fn queue_snapshot(&self) -> QueueSnapshot {
        self.inner.queue.snapshot().await
    }

    /// The configuration this client was built with
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Resolve, encode and sign a request without touching the network
    fn prepare(&self, request: &HttpRequest) -> NetworkResult<PreparedRequest> {
        let url = request.resolve_url(&self.inner.base_url, &self.inner.config.api_version)?;
        let body = request.encode_body()?;

        let mut map = types::merge_headers(self.inner.default_headers.clone(), request.headers());
        if request.is_signed() {
            self.inner.signer.sign(&mut map);
        }
        types::validate_headers(&map)?;

        Ok(PreparedRequest {
            method: request.method(),
            url,
            headers: map,
            body,
        })
    }

    fn dispatch(&self, entry: QueueEntry) {
        let client = self.clone();
        tokio::spawn(async move {
            client.run(entry).await;
        });
    }

    async fn run(&self, entry: QueueEntry) {
        let id = entry.id();
        let holds_slot = entry.holds_slot();

        match self
            .round_trip(entry.prepared().clone(), entry.is_retried())
            .await
        {
            Reconciliation::Response(response) => {
                debug!(
                    "Request {} finished with status {}",
                    entry.describe(),
                    response.status_code
                );
                entry.complete(response);
                if holds_slot {
                    self.begin_next(id, None).await;
                }
            }
            Reconciliation::RetryRequired => {
                info!(
                    "Retrying request {} without cached ETag",
                    entry.describe()
                );
                let mut retry = entry.into_retry();
                if retry.request().is_signed() {
                    self.inner.signer.sign(retry.headers_mut());
                }
                if holds_slot {
                    self.begin_next(id, Some(retry)).await;
                } else {
                    self.dispatch(retry);
                }
            }
        }
    }

    async fn begin_next(&self, finished: RequestId, retry: Option<QueueEntry>) {
        if let Some(next) = self.inner.queue.finish(finished, retry).await {
            self.dispatch(next);
        }
    }

    async fn round_trip(&self, mut prepared: PreparedRequest, retried: bool) -> Reconciliation {
        let signature = prepared.signature();

        if let Some(etag) = self
            .inner
            .etag_manager
            .etag_header(&signature, retried)
            .await
        {
            prepared
                .headers
                .insert(headers::IF_NONE_MATCH.to_string(), etag);
        }

        debug!("API request started: {}", signature);

        let raw = match self.inner.transport.execute(prepared).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("API request failed: {}: {}", signature, e);
                return Reconciliation::Response(HttpResponse::transport_failure(e.into()));
            }
        };

        debug!("API request completed: {} {}", signature, raw.status_code);

        let reply = response::decode_reply(raw);
        self.inner
            .etag_manager
            .reconcile(&signature, reply, retried)
            .await
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("api_version", &self.inner.config.api_version)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::MockTransport;

    fn client_with(transport: Arc<MockTransport>) -> HttpClient {
        HttpClient::with_transport(
            ClientConfig::with_base_url("https://api.example.com"),
            transport,
            Arc::new(ETagManager::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let result = HttpClient::with_transport(
            ClientConfig::with_base_url("not a url"),
            Arc::new(MockTransport::new()),
            Arc::new(ETagManager::new()),
        );
        assert!(matches!(result, Err(NetworkError::InvalidPath { .. })));
    }

    #[tokio::test]
    async fn test_prepare_merges_headers_and_resolves_url() {
        let transport = Arc::new(MockTransport::new());
        let client = client_with(Arc::clone(&transport));

        let request = HttpRequest::get("/subscribers/abc").with_header("X-Platform", "override");
        let prepared = client.prepare(&request).unwrap();

        assert_eq!(
            prepared.url.as_str(),
            "https://api.example.com/v1/subscribers/abc"
        );
        assert_eq!(prepared.header("x-platform"), Some("override"));
        assert!(prepared.header(headers::NONCE).is_none());
    }

    #[tokio::test]
    async fn test_signed_request_gets_nonce() {
        let client = client_with(Arc::new(MockTransport::new()));
        let prepared = client.prepare(&HttpRequest::get("/health").signed()).unwrap();

        let nonce = prepared.header(headers::NONCE).unwrap();
        assert_eq!(nonce.len(), 24);
    }

    #[tokio::test]
    async fn test_send_returns_decoded_response() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, r#"{"ok":true}"#, None);
        let client = client_with(Arc::clone(&transport));

        let response = client.send(HttpRequest::get("/health"), true).await;
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body.unwrap()["ok"], serde_json::json!(true));
        assert_eq!(transport.call_count(), 1);
        assert_eq!(client.queue_snapshot().await, QueueSnapshot::default());
    }

    #[tokio::test]
    async fn test_perform_get_passes_extra_headers() {
        let transport = Arc::new(MockTransport::new());
        let client = client_with(Arc::clone(&transport));
        let (tx, rx) = oneshot::channel();

        let mut extra = Headers::new();
        extra.insert("X-Is-Sandbox".to_string(), "true".to_string());
        client
            .perform_get(false, "/offerings", &extra, move |response| {
                let _ = tx.send(response.status_code);
            })
            .await;

        assert_eq!(rx.await.unwrap(), 200);
        assert_eq!(
            transport.requests()[0].header("x-is-sandbox"),
            Some("true")
        );
        assert_eq!(client.config().api_version, "v1");
    }

    #[tokio::test]
    async fn test_invalid_path_completes_synchronously() {
        let transport = Arc::new(MockTransport::new());
        let client = client_with(Arc::clone(&transport));

        let response = client.send(HttpRequest::get("no-leading-slash"), true).await;
        assert_eq!(response.status_code, -1);
        assert!(matches!(
            response.error,
            Some(NetworkError::InvalidPath { .. })
        ));
        assert_eq!(transport.call_count(), 0);
    }
}
