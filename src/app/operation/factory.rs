//! Deferred construction of cacheable operations

use std::any::type_name;
use std::fmt;

use super::CacheableNetworkOperation;

/// Holds the cache key of an operation and how to build it
///
/// The key is the operation's type name followed by an individualized part,
/// so two operations of the same type only coalesce when their
/// individualized parts match.
pub struct CacheableOperationFactory<O> {
    cache_key: String,
    creator: Box<dyn FnOnce(String) -> O + Send>,
}

impl<O: CacheableNetworkOperation> CacheableOperationFactory<O> {
    /// Create a factory
    ///
    /// # Arguments
    ///
    /// * `individualized_key_part` - Distinguishes operations of the same type
    /// * `creator` - Builds the operation from its cache key
    pub fn new<F>(individualized_key_part: &str, creator: F) -> Self
    where
        F: FnOnce(String) -> O + Send + 'static,
    {
        Self {
            cache_key: format!("{}{}", short_type_name::<O>(), individualized_key_part),
            creator: Box::new(creator),
        }
    }

    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    /// Build the operation
    pub fn create(self) -> O {
        (self.creator)(self.cache_key)
    }
}

impl<O> fmt::Debug for CacheableOperationFactory<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheableOperationFactory")
            .field("cache_key", &self.cache_key)
            .finish_non_exhaustive()
    }
}

/// Type name without its module path
fn short_type_name<T>() -> &'static str {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
