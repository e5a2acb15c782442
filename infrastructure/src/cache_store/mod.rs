//! Cache store adapters
//!
//! Two implementations of the application's `CacheStorePort`:
//!
//! | Adapter | Backing | Use |
//! |---------|---------|-----|
//! | [`MemoryCacheStore`] | `tokio::sync::RwLock<HashMap>` | default, tests |
//! | [`JsonFileCacheStore`] | one JSON file behind a mutex | survives restarts |
//!
//! Both serialize mutations internally so the compound port operations
//! (`take_deliverable`, `complete`, `evict`) are atomic per store.

pub mod file;
pub mod memory;

pub use file::JsonFileCacheStore;
pub use memory::MemoryCacheStore;

/// Default TTL for entries a store must synthesize itself (seconds).
///
/// `complete` on a missing key recreates the entry; the store has no call
/// context, so the entry gets this conservative window.
pub(crate) const DEFAULT_SYNTHESIZED_TTL_SECS: i64 = 300;
