//! Data structures for the conditional cache

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::client::{HttpResponse, JsonObject};
use crate::errors::NetworkError;

/// A stored ETag together with the response it validated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Signature of the request this entry answers
    pub signature: String,
    /// Entity tag returned by the backend
    pub etag: String,
    /// Body of the last fresh response
    pub stored_body: JsonObject,
    /// Status code of the last fresh response
    pub stored_status_code: i32,
    /// When the entry was written
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Create a new entry stamped with the current time
    pub fn new(
        signature: impl Into<String>,
        etag: impl Into<String>,
        stored_body: JsonObject,
        stored_status_code: i32,
    ) -> Self {
        Self {
            signature: signature.into(),
            etag: etag.into(),
            stored_body,
            stored_status_code,
            stored_at: Utc::now(),
        }
    }

    /// Replay this entry as a response
    pub fn to_response(&self) -> HttpResponse {
        HttpResponse::new(self.stored_status_code, Some(self.stored_body.clone()))
    }
}

/// The parts of a backend reply the conditional cache needs to see
#[derive(Debug, Clone, PartialEq)]
pub struct BackendReply {
    /// HTTP status code
    pub status_code: i32,
    /// `ETag` response header
    pub etag: Option<String>,
    /// Parsed body, `None` when decoding failed
    pub body: Option<JsonObject>,
    /// Decoding failure for a non-empty body
    pub decode_error: Option<NetworkError>,
}

/// Outcome of reconciling a reply against the cache
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// Hand this response to the caller
    Response(HttpResponse),
    /// A 304 arrived without a cached entry; reissue without `If-None-Match`
    RetryRequired,
}

/// On-disk form of the cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSnapshot {
    /// When the snapshot was written
    pub saved_at: DateTime<Utc>,
    /// Entries ordered by signature
    pub entries: Vec<CacheEntry>,
}
