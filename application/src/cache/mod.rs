//! Cache lifecycle manager
//!
//! A periodic sweep over the result cache. The eviction rule lives on the
//! domain entry (`consumed`, or expired regardless of consumption); the
//! store applies it under its own lock via [`CacheStorePort::evict`], so the
//! sweep never deletes an entry mid-update by a completing execution.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::ports::cache_store::{CacheStoreError, CacheStorePort};

/// Default sweep interval
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Periodic evictor of consumed and expired cache entries
pub struct CacheLifecycle {
    cache: Arc<dyn CacheStorePort>,
    interval: Duration,
}

impl CacheLifecycle {
    pub fn new(cache: Arc<dyn CacheStorePort>) -> Self {
        Self {
            cache,
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run one sweep now; returns how many entries were evicted
    pub async fn sweep(&self) -> Result<usize, CacheStoreError> {
        let evicted = self.cache.evict(chrono::Utc::now()).await?;
        if evicted > 0 {
            debug!(evicted, "Cache sweep evicted entries");
        }
        Ok(evicted)
    }

    /// Start the periodic sweep loop.
    ///
    /// The loop stops when the returned handle is cancelled or dropped.
    pub fn spawn(self) -> LifecycleHandle {
        let token = CancellationToken::new();
        let loop_token = token.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            // The first tick fires immediately; skip it so spawn is not a sweep
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = loop_token.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = self.sweep().await {
                            warn!(error = %e, "Cache sweep failed");
                        }
                    }
                }
            }
        });
        LifecycleHandle { token, task: Some(task) }
    }
}

/// Handle stopping the sweep loop
pub struct LifecycleHandle {
    token: CancellationToken,
    // Option so shutdown can take the handle out from under the Drop impl
    task: Option<JoinHandle<()>>,
}

impl LifecycleHandle {
    /// Stop the loop and wait for it to exit
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for LifecycleHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
