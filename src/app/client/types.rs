//! Core data structures shared by the client, queue and conditional cache
//!
//! This module defines the request method, header map, prepared request and
//! response types that flow between the components of the execution layer.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::status;
use crate::errors::NetworkError;

/// JSON object used for request and response bodies
///
/// Backed by `serde_json::Map` with `preserve_order`, so insertion order
/// survives serialization.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// Header map keyed by lowercase header name
pub type Headers = BTreeMap<String, String>;

/// Methods supported by the backend API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    /// Wire name of the method
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        }
    }
}

/// Merge `overrides` into `base`; header names are lowercased and the
/// override wins on conflict
pub fn merge_headers(mut base: Headers, overrides: &Headers) -> Headers {
    for (name, value) in overrides {
        base.insert(name.to_ascii_lowercase(), value.clone());
    }
    base
}

/// Check that every header is legal on the wire
///
/// # Errors
///
/// Returns `NetworkError::InvalidHeader` for the first name or value that
/// `reqwest` would refuse
pub fn validate_headers(headers: &Headers) -> Result<(), NetworkError> {
    for (name, value) in headers {
        let invalid = |reason: String| NetworkError::InvalidHeader {
            name: name.clone(),
            reason,
        };
        reqwest::header::HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| invalid(e.to_string()))?;
        reqwest::header::HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
    }
    Ok(())
}

/// A request ready to hand to the transport
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Absolute URL under the API version prefix
    pub url: Url,
    /// Final header set, including any conditional header
    pub headers: Headers,
    /// Serialized JSON body (POST only)
    pub body: Option<Vec<u8>>,
}

impl PreparedRequest {
    /// Signature indexing the conditional cache: method plus absolute URL
    pub fn signature(&self) -> String {
        signature_for(self.method, &self.url)
    }

    /// Look up a header by (case-insensitive) name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Build the conditional cache signature for a method and URL
pub fn signature_for(method: HttpMethod, url: &Url) -> String {
    format!("{} {}", method, url)
}

/// What came back from one network round trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status_code: u16,
    /// Value of the `ETag` response header, if any
    pub etag: Option<String>,
    /// Raw response body
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Create a raw response
    pub fn new(status_code: u16, etag: Option<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status_code,
            etag,
            body: body.into(),
        }
    }
}

/// Result surface handed to every completion
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code, or `-1` for local failures before any I/O
    pub status_code: i32,
    /// Parsed JSON object body
    pub body: Option<JsonObject>,
    /// Error that prevented a usable response
    pub error: Option<NetworkError>,
}

impl HttpResponse {
    /// A response with a parsed body and no error
    pub fn new(status_code: i32, body: Option<JsonObject>) -> Self {
        Self {
            status_code,
            body,
            error: None,
        }
    }

    /// A request that failed before reaching the network
    pub fn construction_failure(error: NetworkError) -> Self {
        Self {
            status_code: status::INVALID_REQUEST,
            body: None,
            error: Some(error),
        }
    }

    /// A round trip that failed in the transport
    pub fn transport_failure(error: NetworkError) -> Self {
        Self {
            status_code: status::NETWORK_CONNECT_TIMEOUT_ERROR,
            body: None,
            error: Some(error),
        }
    }

    /// Attach an error to this response
    pub fn with_error(mut self, error: NetworkError) -> Self {
        self.error = Some(error);
        self
    }

    /// Whether the status is in the 2xx range and no error is set
    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.status_code)
    }
}

/// Completion invoked exactly once with the outcome of a request
pub type Completion = Box<dyn FnOnce(HttpResponse) + Send + 'static>;
