//! Core request queue implementation
//!
//! This module contains the [`RequestQueue`] that decides when a request may
//! go out. It never performs I/O itself: every method only transitions state
//! under the lock and returns the entry the caller must dispatch.

use tokio::sync::Mutex;
use tracing::debug;

use super::state::QueueState;
use super::types::{QueueEntry, QueueSnapshot, RequestId};

/// Single-flight execution gate for serial requests
#[derive(Debug, Default)]
pub struct RequestQueue {
    state: Mutex<QueueState>,
}

impl RequestQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a request
    ///
    /// Non-serial requests and retries bypass the queue and come straight
    /// back. A serial request comes back only if nothing else is in flight;
    /// otherwise it waits at the tail and `None` is returned.
    pub async fn submit(&self, entry: QueueEntry) -> Option<QueueEntry> {
        if !entry.is_serial() || entry.is_retried() {
            debug!("Dispatching without queueing: {}", entry.describe());
            return Some(entry);
        }

        self.state.lock().await.start_or_enqueue(entry)
    }

    /// Release the slot held by `finished` and return the next request to
    /// dispatch, if any
    ///
    /// A `retry` is placed at the head of the queue and therefore becomes
    /// the next request.
    pub async fn finish(&self, finished: RequestId, retry: Option<QueueEntry>) -> Option<QueueEntry> {
        self.state.lock().await.finish(finished, retry)
    }

    /// Current queue depth and in-flight flag
    pub async fn snapshot(&self) -> QueueSnapshot {
        self.state.lock().await.snapshot()
    }
}
