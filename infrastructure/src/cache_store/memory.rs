//! In-memory cache store

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use toolgate_application::ports::cache_store::{CacheStoreError, CacheStorePort};
use toolgate_domain::cache::entities::{CacheEntry, CacheStatus};
use toolgate_domain::tool::value_objects::ToolCallResult;
use tracing::warn;

use super::DEFAULT_SYNTHESIZED_TTL_SECS;

/// Process-local cache store; the map's write lock is the atomicity boundary
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorePort for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheStoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn insert(&self, key: &str, entry: CacheEntry) -> Result<(), CacheStoreError> {
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn take_deliverable(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<CacheEntry>, CacheStoreError> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(entry) if entry.is_deliverable(now) => {
                entry.mark_consumed();
                Ok(Some(entry.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn complete(
        &self,
        key: &str,
        status: CacheStatus,
        result: ToolCallResult,
        task_id: &str,
    ) -> Result<(), CacheStoreError> {
        let mut entries = self.entries.write().await;
        let entry = entries.entry(key.to_string()).or_insert_with(|| {
            warn!(%key, "Completing a cache entry that was already evicted");
            CacheEntry::pending(task_id, Duration::seconds(DEFAULT_SYNTHESIZED_TTL_SECS))
        });
        entry.complete(status, result);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheStoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn evict(&self, now: DateTime<Utc>) -> Result<usize, CacheStoreError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_evictable(now));
        Ok(before - entries.len())
    }

    async fn len(&self) -> Result<usize, CacheStoreError> {
        Ok(self.entries.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TASK: &str = "t-0123456789abcdef";

    fn completed(ttl_secs: i64) -> CacheEntry {
        let mut entry = CacheEntry::pending(TASK, Duration::seconds(ttl_secs));
        entry.complete(CacheStatus::Completed, ToolCallResult::text("cached"));
        entry
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = MemoryCacheStore::new();
        store.insert("k", completed(300)).await.unwrap();
        let entry = store.get("k").await.unwrap().unwrap();
        assert_eq!(entry.result.first_text(), Some("cached"));
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_take_deliverable_consumes_exactly_once() {
        let store = MemoryCacheStore::new();
        store.insert("k", completed(300)).await.unwrap();

        let now = Utc::now();
        let first = store.take_deliverable("k", now).await.unwrap();
        assert!(first.is_some());

        let second = store.take_deliverable("k", now).await.unwrap();
        assert!(second.is_none());

        // The consumed entry is still there until a sweep removes it.
        assert!(store.get("k").await.unwrap().unwrap().consumed);
    }

    #[tokio::test]
    async fn test_pending_entry_is_not_taken() {
        let store = MemoryCacheStore::new();
        store
            .insert("k", CacheEntry::pending(TASK, Duration::seconds(300)))
            .await
            .unwrap();
        assert!(store.take_deliverable("k", Utc::now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_complete_recreates_evicted_entry() {
        let store = MemoryCacheStore::new();
        store
            .complete("k", CacheStatus::Failed, ToolCallResult::error("late"), TASK)
            .await
            .unwrap();

        let entry = store.get("k").await.unwrap().unwrap();
        assert_eq!(entry.status, CacheStatus::Failed);
        assert!(!entry.consumed);
        assert_eq!(entry.task_id, TASK);
    }

    #[tokio::test]
    async fn test_evict_removes_consumed_and_expired() {
        let store = MemoryCacheStore::new();
        store.insert("consumed", completed(300)).await.unwrap();
        store.take_deliverable("consumed", Utc::now()).await.unwrap();
        store.insert("expired", completed(-1)).await.unwrap();
        store.insert("fresh", completed(300)).await.unwrap();

        let evicted = store.evict(Utc::now()).await.unwrap();
        assert_eq!(evicted, 2);
        assert_eq!(store.len().await.unwrap(), 1);
        assert!(store.get("fresh").await.unwrap().is_some());
    }
}
