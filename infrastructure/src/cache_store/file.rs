//! JSON-file cache store
//!
//! Persists the whole cache as one JSON document. Every operation takes the
//! store mutex, reads the file, mutates, and rewrites it, so the compound
//! port operations stay atomic at the cost of throughput; this adapter is
//! for small deployments that want results to survive a restart.
//!
//! Top-level fields other than `entries` are preserved untouched across
//! rewrites: other processes may annotate the file with their own metadata.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use toolgate_application::ports::cache_store::{CacheStoreError, CacheStorePort};
use toolgate_domain::cache::entities::{CacheEntry, CacheStatus};
use toolgate_domain::tool::value_objects::ToolCallResult;
use tracing::warn;

use super::DEFAULT_SYNTHESIZED_TTL_SECS;

/// On-disk document shape
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheDocument {
    #[serde(default)]
    entries: HashMap<String, CacheEntry>,
    /// Foreign top-level fields, rewritten verbatim
    #[serde(flatten)]
    metadata: serde_json::Map<String, serde_json::Value>,
}

/// File-backed cache store
pub struct JsonFileCacheStore {
    path: PathBuf,
    /// Serializes the read-modify-write cycle
    lock: Mutex<()>,
}

impl JsonFileCacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<CacheDocument, CacheStoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|error| CacheStoreError::Serialization(error.to_string())),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                Ok(CacheDocument::default())
            }
            Err(error) => Err(CacheStoreError::Io(error.to_string())),
        }
    }

    async fn write_document(&self, document: &CacheDocument) -> Result<(), CacheStoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|error| CacheStoreError::Io(error.to_string()))?;
            }
        }
        let raw = serde_json::to_string_pretty(document)
            .map_err(|error| CacheStoreError::Serialization(error.to_string()))?;
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|error| CacheStoreError::Io(error.to_string()))
    }
}

#[async_trait]
impl CacheStorePort for JsonFileCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheStoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_document().await?.entries.get(key).cloned())
    }

    async fn insert(&self, key: &str, entry: CacheEntry) -> Result<(), CacheStoreError> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;
        document.entries.insert(key.to_string(), entry);
        self.write_document(&document).await
    }

    async fn take_deliverable(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<CacheEntry>, CacheStoreError> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;
        let Some(entry) = document.entries.get_mut(key) else {
            return Ok(None);
        };
        if !entry.is_deliverable(now) {
            return Ok(None);
        }
        entry.mark_consumed();
        let delivered = entry.clone();
        self.write_document(&document).await?;
        Ok(Some(delivered))
    }

    async fn complete(
        &self,
        key: &str,
        status: CacheStatus,
        result: ToolCallResult,
        task_id: &str,
    ) -> Result<(), CacheStoreError> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;
        let entry = document.entries.entry(key.to_string()).or_insert_with(|| {
            warn!(%key, "Completing a cache entry that was already evicted");
            CacheEntry::pending(task_id, Duration::seconds(DEFAULT_SYNTHESIZED_TTL_SECS))
        });
        entry.complete(status, result);
        self.write_document(&document).await
    }

    async fn remove(&self, key: &str) -> Result<(), CacheStoreError> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;
        if document.entries.remove(key).is_some() {
            self.write_document(&document).await?;
        }
        Ok(())
    }

    async fn evict(&self, now: DateTime<Utc>) -> Result<usize, CacheStoreError> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;
        let before = document.entries.len();
        document.entries.retain(|_, entry| !entry.is_evictable(now));
        let evicted = before - document.entries.len();
        if evicted > 0 {
            self.write_document(&document).await?;
        }
        Ok(evicted)
    }

    async fn len(&self) -> Result<usize, CacheStoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_document().await?.entries.len())
    }
}
