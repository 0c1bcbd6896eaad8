//! Internal state management for the request queue
//!
//! This module handles the low-level state transitions: which serial request
//! is current, and which are waiting behind it.

use std::collections::VecDeque;

use tracing::{debug, error};

use super::types::{QueueEntry, QueueSnapshot, RequestId};

/// Internal state of the request queue
#[derive(Debug, Default)]
pub struct QueueState {
    /// Serial requests waiting to run, head first
    pending: VecDeque<QueueEntry>,
    /// The serial request currently in flight
    current: Option<RequestId>,
}

impl QueueState {
    /// Create new empty queue state
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `entry` current if nothing is in flight, otherwise park it at
    /// the tail
    ///
    /// Returns the entry back when it should be dispatched now.
    pub fn start_or_enqueue(&mut self, mut entry: QueueEntry) -> Option<QueueEntry> {
        if self.current.is_some() {
            debug!(
                "Serial request queued behind {} others: {}",
                self.pending.len(),
                entry.describe()
            );
            self.pending.push_back(entry);
            None
        } else {
            debug!("Starting serial request: {}", entry.describe());
            self.current = Some(entry.id());
            entry.take_slot();
            Some(entry)
        }
    }

    /// Finish the current request and hand the slot to the next one
    ///
    /// A `retry` goes to the head of the pending list, so it runs before
    /// anything that was already waiting.
    pub fn finish(&mut self, finished: RequestId, retry: Option<QueueEntry>) -> Option<QueueEntry> {
        if self.current != Some(finished) {
            debug_assert!(
                false,
                "finished request {} is not current ({:?})",
                finished, self.current
            );
            error!(
                "Finished request {} is not the current serial request ({:?})",
                finished, self.current
            );
        }

        if let Some(retry) = retry {
            debug!("Retry inserted at head of queue: {}", retry.describe());
            self.pending.push_front(retry);
        }

        debug!(
            "Serial request done: {}, {} requests left in queue",
            finished,
            self.pending.len()
        );

        self.current = None;
        let mut next = self.pending.pop_front()?;
        debug!("Starting next request: {}", next.describe());
        self.current = Some(next.id());
        next.take_slot();
        Some(next)
    }

    /// The request currently in flight
    pub fn current(&self) -> Option<RequestId> {
        self.current
    }

    /// Number of waiting requests
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            pending: self.pending.len(),
            in_flight: self.current.is_some(),
        }
    }
}
