//! Test support
//!
//! [`MockTransport`] stands in for the network. Replies are scripted in
//! order; every request it receives is recorded along with the highest
//! number of round trips it saw running at once.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;

use crate::app::client::{PreparedRequest, RawResponse, Transport};
use crate::errors::TransportError;

/// Scripted in-memory transport
///
/// Once the script runs out every request is answered with `200 {}`.
#[derive(Debug, Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
    requests: Mutex<Vec<PreparedRequest>>,
    latency: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every round trip by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queue a reply
    pub fn push_response(&self, status_code: u16, body: &str, etag: Option<&str>) {
        lock(&self.replies).push_back(Ok(RawResponse::new(
            status_code,
            etag.map(str::to_string),
            body.as_bytes().to_vec(),
        )));
    }

    /// Queue a transport failure
    pub fn push_failure(&self, error: TransportError) {
        lock(&self.replies).push_back(Err(error));
    }

    /// Requests received so far, in arrival order
    pub fn requests(&self) -> Vec<PreparedRequest> {
        lock(&self.requests).clone()
    }

    /// Number of round trips started
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent round trips observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn round_trip(&self, request: PreparedRequest) -> Result<RawResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        lock(&self.requests).push(request);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let reply = lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| Ok(RawResponse::new(200, None, b"{}".to_vec())));

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        reply
    }
}

impl Transport for MockTransport {
    fn execute(&self, request: PreparedRequest) -> BoxFuture<'_, Result<RawResponse, TransportError>> {
        Box::pin(self.round_trip(request))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
