//! Cache store port
//!
//! The store is key-addressable and serializes every mutation internally, so
//! callers never see a multi-step read-modify-write window. The compound
//! operations (`take_deliverable`, `complete`, `evict`) exist precisely so
//! the check and the write happen under one lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use toolgate_domain::cache::entities::{CacheEntry, CacheStatus};
use toolgate_domain::tool::value_objects::ToolCallResult;

/// Infrastructure failures of the cache store.
///
/// This is the one error class the gateway propagates to its caller: without
/// the store it cannot make progress.
#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("Cache store I/O failed: {0}")]
    Io(String),

    #[error("Cache store serialization failed: {0}")]
    Serialization(String),
}

/// Port for the durable result cache
#[async_trait]
pub trait CacheStorePort: Send + Sync {
    /// Read one entry
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheStoreError>;

    /// Insert or replace one entry
    async fn insert(&self, key: &str, entry: CacheEntry) -> Result<(), CacheStoreError>;

    /// Atomically return a deliverable entry and mark it consumed.
    ///
    /// Deliverable means: terminal status, unconsumed, unexpired at `now`.
    /// This is the gateway's fast path; doing the check and the consumption
    /// under the store's lock is what makes delivery at-most-once.
    async fn take_deliverable(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<CacheEntry>, CacheStoreError>;

    /// Transition an entry to a terminal state with its real result.
    ///
    /// A missing entry is created terminal (the sweep may have raced the
    /// completing execution).
    async fn complete(
        &self,
        key: &str,
        status: CacheStatus,
        result: ToolCallResult,
        task_id: &str,
    ) -> Result<(), CacheStoreError>;

    /// Remove one entry
    async fn remove(&self, key: &str) -> Result<(), CacheStoreError>;

    /// Delete every evictable entry (consumed, or expired at `now`) and
    /// return how many were removed
    async fn evict(&self, now: DateTime<Utc>) -> Result<usize, CacheStoreError>;

    /// Number of live entries
    async fn len(&self) -> Result<usize, CacheStoreError>;
}
