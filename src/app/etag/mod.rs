//! Conditional request cache
//!
//! Stores the last fresh response for every request signature together with
//! its entity tag, so later requests can ask the backend for changes only.
//!
//! - [`types`] - cache entries, backend replies and reconciliation outcomes
//! - [`manager`] - the [`ETagManager`] owning the table
//!
//! # Protocol
//!
//! 1. Before a request is sent, [`ETagManager::etag_header`] yields the stored
//!    ETag for `If-None-Match`, unless the request is a forced refetch.
//! 2. A 2xx reply with an `ETag` header replaces the stored entry.
//! 3. A 304 reply is answered from the stored entry with its original status.
//! 4. A 304 reply with nothing stored yields
//!    [`Reconciliation::RetryRequired`]; the request queue reissues the
//!    request without the conditional header.

pub mod manager;
pub mod types;

pub use manager::ETagManager;
pub use types::{BackendReply, CacheEntry, CacheSnapshot, Reconciliation};
