//! Single network round trips
//!
//! The [`Transport`] trait is the seam between the execution layer and the
//! platform networking stack. [`ReqwestTransport`] is the production
//! implementation; tests substitute the scripted `MockTransport` from the
//! `testing` module, built with the `test-util` feature.

use futures::future::BoxFuture;
use reqwest::Client;
use tracing::debug;

use crate::constants::headers;
use crate::errors::TransportError;

use super::config::ClientConfig;
use super::types::{PreparedRequest, RawResponse};

/// Performs one network round trip for a prepared request
pub trait Transport: Send + Sync + 'static {
    /// Send `request` and yield the raw status, `ETag` and body
    fn execute(&self, request: PreparedRequest) -> BoxFuture<'_, Result<RawResponse, TransportError>>;
}

/// Transport backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport from an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates a transport tuned by `config`
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the underlying client cannot be built
    pub fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
        Ok(Self::new(config.build_http_client()?))
    }

    /// Get a reference to the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn round_trip(&self, request: PreparedRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.into(), request.url.clone());

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status_code = response.status().as_u16();
        let etag = response
            .headers()
            .get(headers::ETAG)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        debug!(
            "Round trip finished: {} {} -> {} ({} bytes)",
            request.method,
            request.url.path(),
            status_code,
            body.len()
        );

        Ok(RawResponse {
            status_code,
            etag,
            body,
        })
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: PreparedRequest) -> BoxFuture<'_, Result<RawResponse, TransportError>> {
        Box::pin(self.round_trip(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::client::types::{Headers, HttpMethod};
    use url::Url;

    #[tokio::test]
    async fn test_transport_creation() {
        let config = ClientConfig::default();
        let transport = ReqwestTransport::from_config(&config);
        assert!(transport.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        // Port 9 (discard) on localhost is closed on any sane test machine
        let transport = ReqwestTransport::from_config(&ClientConfig::default()).unwrap();
        let request = PreparedRequest {
            method: HttpMethod::Get,
            url: Url::parse("http://127.0.0.1:9/v1/health").unwrap(),
            headers: Headers::new(),
            body: None,
        };

        let result = transport.execute(request).await;
        assert!(result.is_err());
    }
}
