//! Core data structures for the request queue

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::app::client::{Completion, Headers, HttpRequest, HttpResponse, PreparedRequest};

/// Per-instance identity of a queued request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    /// Allocate the next process-wide identifier
    pub fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A request together with the completion waiting for it
///
/// Owned by the queue while pending and moved into the dispatch task once
/// it starts; the completion is consumed exactly once.
pub struct QueueEntry {
    id: RequestId,
    request: HttpRequest,
    prepared: PreparedRequest,
    serial: bool,
    holds_slot: bool,
    completion: Completion,
}

impl QueueEntry {
    /// Create an entry for an already validated request
    pub fn new(
        request: HttpRequest,
        prepared: PreparedRequest,
        serial: bool,
        completion: Completion,
    ) -> Self {
        Self {
            id: RequestId::next(),
            request,
            prepared,
            serial,
            holds_slot: false,
            completion,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// The wire request, without any conditional header yet
    pub fn prepared(&self) -> &PreparedRequest {
        &self.prepared
    }

    /// Headers of the wire request, for re-signing a retry
    pub(crate) fn headers_mut(&mut self) -> &mut Headers {
        &mut self.prepared.headers
    }

    pub fn is_serial(&self) -> bool {
        self.serial
    }

    pub fn is_retried(&self) -> bool {
        self.request.is_retried()
    }

    /// Whether this entry occupies the serial slot and must release it
    pub fn holds_slot(&self) -> bool {
        self.holds_slot
    }

    pub(crate) fn take_slot(&mut self) {
        self.holds_slot = true;
    }

    /// Short description for logging
    pub fn describe(&self) -> String {
        format!(
            "{} {} {}",
            self.id,
            self.request.method(),
            self.request.path()
        )
    }

    /// Turn this entry into its revalidation-free retry
    ///
    /// The retry gets a fresh identity but keeps the completion, so the
    /// caller only ever sees the final outcome. It does not hold the serial
    /// slot until the queue hands it over.
    pub fn into_retry(self) -> Self {
        Self {
            id: RequestId::next(),
            request: self.request.retried_copy(),
            prepared: self.prepared,
            serial: self.serial,
            holds_slot: false,
            completion: self.completion,
        }
    }

    /// Consume the entry, invoking its completion with `response`
    pub fn complete(self, response: HttpResponse) {
        (self.completion)(response);
    }
}

impl fmt::Debug for QueueEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueEntry")
            .field("id", &self.id)
            .field("request", &self.request)
            .field("serial", &self.serial)
            .field("holds_slot", &self.holds_slot)
            .finish_non_exhaustive()
    }
}

/// Point-in-time view of the queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    /// Serial requests waiting behind the current one
    pub pending: usize,
    /// Whether a serial request is in flight
    pub in_flight: bool,
}
