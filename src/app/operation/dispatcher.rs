//! Operation dispatcher
//!
//! Runs created operations on the tokio runtime. A semaphore bounds how many
//! operations run at once, and operations may opt into a random start delay
//! to spread load across clients.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::app::coalesce::CallbackCacheStatus;
use crate::constants::operations;

use super::{CacheableNetworkOperation, CacheableOperationFactory};

/// Dispatcher configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Operations allowed to run at the same time
    pub max_concurrent_operations: usize,
    /// Upper bound of the random start delay
    pub random_delay_max: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent_operations: operations::DEFAULT_MAX_CONCURRENT,
            random_delay_max: operations::DEFAULT_RANDOM_DELAY_MAX,
        }
    }
}

impl DispatcherConfig {
    pub fn with_max_concurrent_operations(mut self, max: usize) -> Self {
        self.max_concurrent_operations = max;
        self
    }

    pub fn with_random_delay_max(mut self, delay: Duration) -> Self {
        self.random_delay_max = delay;
        self
    }
}

/// Starts operations, respecting the concurrency limit
#[derive(Debug, Clone)]
pub struct OperationDispatcher {
    config: DispatcherConfig,
    permits: Arc<Semaphore>,
}

impl Default for OperationDispatcher {
    fn default() -> Self {
        Self::new(DispatcherConfig::default())
    }
}

impl OperationDispatcher {
    /// Create a dispatcher; a limit of zero is raised to one
    pub fn new(config: DispatcherConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_operations.max(1)));
        Self { config, permits }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Create and start the operation if the caller opened its group
    ///
    /// Callers that joined an existing group get `None`; their factory is
    /// dropped and the running operation answers them.
    pub fn add_cacheable_operation<O>(
        &self,
        factory: CacheableOperationFactory<O>,
        with_random_delay: bool,
        status: CallbackCacheStatus,
    ) -> Option<JoinHandle<()>>
    where
        O: CacheableNetworkOperation,
    {
        match status {
            CallbackCacheStatus::FirstInFlight => {
                Some(self.dispatch(Box::new(factory.create()), with_random_delay))
            }
            CallbackCacheStatus::JoinedExisting => {
                debug!(
                    "Operation {} already in flight, not starting another",
                    factory.cache_key()
                );
                None
            }
        }
    }

    /// Run `operation` on the runtime
    pub fn dispatch(
        &self,
        operation: Box<dyn CacheableNetworkOperation>,
        with_random_delay: bool,
    ) -> JoinHandle<()> {
        let delay = if with_random_delay {
            self.random_delay()
        } else {
            Duration::ZERO
        };
        let permits = Arc::clone(&self.permits);

        tokio::spawn(async move {
            if !delay.is_zero() {
                debug!(
                    "Delaying operation {} by {}ms",
                    operation.cache_key(),
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    warn!("Operation {} not started: {}", operation.cache_key(), e);
                    return;
                }
            };

            debug!("Operation {} started", operation.cache_key());
            operation.begin().await;
        })
    }

    fn random_delay(&self) -> Duration {
        let max_ms = u64::try_from(self.config.random_delay_max.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(fastrand::u64(0..=max_ms))
    }
}
