//! Cacheable backend operations
//!
//! A cacheable operation is one logical backend call whose result is shared
//! by every caller in its coalescing group. Callers build a
//! [`CacheableOperationFactory`], join the group in a
//! [`CallbackCache`](crate::app::coalesce::CallbackCache), and hand the
//! factory to the [`OperationDispatcher`]. Only the first caller of a group
//! ever creates and starts the operation.
//!
//! An operation's [`begin`](CacheableNetworkOperation::begin) future builds
//! and submits its request, interprets the response, answers every waiting
//! callback and then resolves.

use futures::future::BoxFuture;

pub mod dispatcher;
pub mod factory;

pub use dispatcher::{DispatcherConfig, OperationDispatcher};
pub use factory::CacheableOperationFactory;

/// A backend operation whose result is fanned out to a coalescing group
pub trait CacheableNetworkOperation: Send + 'static {
    /// Key of the coalescing group this operation answers
    fn cache_key(&self) -> &str;

    /// Run the operation to completion
    fn begin(self: Box<Self>) -> BoxFuture<'static, ()>;
}
