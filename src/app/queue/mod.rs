//! Serial request queue
//!
//! Guarantees that at most one serial request is in flight. Requests that
//! arrive while another is running wait in FIFO order; a retry synthesized
//! after a failed cache revalidation jumps to the head of the line.
//!
//! # Module Organization
//!
//! - [`types`] - queue entries, request identities and snapshots
//! - [`state`] - the pending deque and current slot
//! - [`core`] - the [`RequestQueue`] wrapping the state in an async mutex
//!
//! The queue never touches the network. [`RequestQueue::submit`] and
//! [`RequestQueue::finish`] return the entry that must be dispatched next,
//! and the caller performs the round trip outside the lock.

pub mod core;
pub mod state;
pub mod types;

pub use core::RequestQueue;
pub use types::{QueueEntry, QueueSnapshot, RequestId};
