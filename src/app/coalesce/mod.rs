//! Operation coalescing
//!
//! Concurrent callers asking for the same logical operation are grouped by a
//! cache key. Only the first caller of a group starts the work; everyone who
//! joins while it runs is answered with the same result, in join order.
//!
//! Detaching a group is a swap under the lock: the callbacks are removed
//! first and invoked afterwards, so a callback may safely start a new
//! operation for the same key.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tokio::sync::Mutex;
use tracing::debug;

/// Something that belongs to a coalescing group
pub trait CacheKeyProviding {
    /// Key of the logical operation this belongs to
    fn cache_key(&self) -> &str;
}

/// Outcome of joining a coalescing group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackCacheStatus {
    /// No operation was in flight; the caller must start one
    FirstInFlight,
    /// An operation is already running and will answer this callback
    JoinedExisting,
}

/// Groups of callbacks waiting on in-flight operations, keyed by cache key
#[derive(Debug)]
pub struct CallbackCache<C> {
    groups: Mutex<HashMap<String, Vec<C>>>,
}

impl<C> Default for CallbackCache<C> {
    fn default() -> Self {
        Self {
            groups: Mutex::new(HashMap::new()),
        }
    }
}

impl<C: CacheKeyProviding> CallbackCache<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the group for the callback's key, creating it if needed
    pub async fn add(&self, callback: C) -> CallbackCacheStatus {
        let mut groups = self.groups.lock().await;
        match groups.entry(callback.cache_key().to_string()) {
            Entry::Occupied(mut group) => {
                group.get_mut().push(callback);
                debug!(
                    "Joined in-flight operation {} ({} waiting)",
                    group.key(),
                    group.get().len()
                );
                CallbackCacheStatus::JoinedExisting
            }
            Entry::Vacant(slot) => {
                debug!("Starting operation {}", slot.key());
                slot.insert(vec![callback]);
                CallbackCacheStatus::FirstInFlight
            }
        }
    }

    /// Detach the group for `cache_key` and hand every callback to `action`
    ///
    /// Callbacks are invoked in join order after the lock is released. A
    /// later [`add`](Self::add) for the same key starts a fresh group.
    pub async fn perform_on_all_and_remove<F>(&self, cache_key: &str, mut action: F)
    where
        F: FnMut(C),
    {
        let group = self.groups.lock().await.remove(cache_key);
        let Some(callbacks) = group else {
            debug!("No callbacks waiting on {}", cache_key);
            return;
        };

        debug!(
            "Completing operation {} for {} callbacks",
            cache_key,
            callbacks.len()
        );
        for callback in callbacks {
            action(callback);
        }
    }

    /// Whether a group is in flight for `cache_key`
    pub async fn contains(&self, cache_key: &str) -> bool {
        self.groups.lock().await.contains_key(cache_key)
    }

    /// Number of groups in flight
    pub async fn len(&self) -> usize {
        self.groups.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
