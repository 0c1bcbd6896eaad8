//! Request descriptions and their translation into wire requests
//!
//! An [`HttpRequest`] is what the domain layer hands in: method, relative
//! path, optional JSON object body and extra headers. Resolving the URL and
//! encoding the body happen before anything is queued, so construction
//! failures never reach the queue or the network.

use serde::Serialize;
use url::Url;

use crate::errors::{NetworkError, NetworkResult};

use super::finite::Finite;
use super::types::{Headers, HttpMethod, JsonObject};

/// A request description supplied by the domain layer
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    method: HttpMethod,
    path: String,
    body: Option<JsonObject>,
    headers: Headers,
    retried: bool,
    signed: bool,
}

impl HttpRequest {
    /// Create a GET request for a path relative to the API prefix
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path.into(), None)
    }

    /// Create a POST request with a JSON object body
    pub fn post(path: impl Into<String>, body: JsonObject) -> Self {
        Self::new(HttpMethod::Post, path.into(), Some(body))
    }

    /// Create a POST request from any serializable body
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::InvalidBody` if the value does not serialize to
    /// a JSON object or contains a NaN or infinite float.
    pub fn post_json<T>(path: impl Into<String>, body: &T) -> NetworkResult<Self>
    where
        T: Serialize + ?Sized,
    {
        let path = path.into();
        let body = encode_object(&path, body)?;
        Ok(Self::new(HttpMethod::Post, path, Some(body)))
    }

    fn new(method: HttpMethod, path: String, body: Option<JsonObject>) -> Self {
        Self {
            method,
            path,
            body,
            headers: Headers::new(),
            retried: false,
            signed: false,
        }
    }

    /// Add a caller-supplied header; it wins over the baseline headers
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Add several caller-supplied headers
    pub fn with_headers(mut self, headers: &Headers) -> Self {
        for (name, value) in headers {
            self.headers.insert(name.to_ascii_lowercase(), value.clone());
        }
        self
    }

    /// Mark this request for signing before it is sent
    pub fn signed(mut self) -> Self {
        self.signed = true;
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> Option<&JsonObject> {
        self.body.as_ref()
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Whether this is a reissue with cache revalidation disabled
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    /// Copy of this request flagged as a retry
    pub fn retried_copy(&self) -> Self {
        Self {
            retried: true,
            ..self.clone()
        }
    }

    /// Resolve the relative path under `/{api_version}` against `base_url`
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::InvalidPath` if the path is empty, not rooted,
    /// contains whitespace, or cannot be joined.
    pub fn resolve_url(&self, base_url: &Url, api_version: &str) -> NetworkResult<Url> {
        let invalid = |reason: &str| NetworkError::InvalidPath {
            path: self.path.clone(),
            reason: reason.to_string(),
        };

        if !self.path.starts_with('/') {
            return Err(invalid("path must start with '/'"));
        }
        if self.path.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(invalid("path contains whitespace or control characters"));
        }

        base_url
            .join(&format!("/{}{}", api_version, self.path))
            .map_err(|e| invalid(&e.to_string()))
    }

    /// Serialize the body for the wire; only POST requests carry one
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::InvalidBody` if JSON encoding fails
    pub fn encode_body(&self) -> NetworkResult<Option<Vec<u8>>> {
        match (self.method, &self.body) {
            (HttpMethod::Post, Some(body)) => serde_json::to_vec(body)
                .map(Some)
                .map_err(|e| NetworkError::InvalidBody {
                    path: self.path.clone(),
                    reason: e.to_string(),
                }),
            _ => Ok(None),
        }
    }
}

/// Serialize `body` and require the result to be a JSON object
///
/// Non-finite floats are refused rather than written as `null`.
pub fn encode_object<T>(path: &str, body: &T) -> NetworkResult<JsonObject>
where
    T: Serialize + ?Sized,
{
    let invalid = |reason: String| NetworkError::InvalidBody {
        path: path.to_string(),
        reason,
    };

    match serde_json::to_value(Finite(body)).map_err(|e| invalid(e.to_string()))? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(invalid(format!("expected a JSON object, got {}", json_kind(&other)))),
    }
}

pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
