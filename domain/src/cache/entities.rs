//! Cache entry lifecycle
//!
//! One entry exists per call key at any time. It is created `Pending` when a
//! call is dispatched, transitions to `Completed` or `Failed` exactly once
//! when the execution resolves, and is delivered to a caller **at most
//! once**: the first delivery sets `consumed`, which makes the entry
//! eligible for eviction regardless of remaining TTL.
//!
//! Eviction rule (applied by the lifecycle sweep): delete when `consumed`,
//! or when `now - timestamp > ttl` regardless of consumption.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::tool::value_objects::ToolCallResult;

/// Execution state recorded in a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Dispatched, no terminal result yet
    Pending,
    /// Execution resolved with a result
    Completed,
    /// Execution raised past the dispatcher boundary
    Failed,
}

impl CacheStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CacheStatus::Pending)
    }
}

/// One cached call result, keyed externally by the call key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The result; a progress placeholder while `Pending`
    pub result: ToolCallResult,
    /// When the entry was created or last transitioned
    pub timestamp: DateTime<Utc>,
    /// Time to live measured from `timestamp`, in seconds
    pub ttl_secs: i64,
    /// Lifecycle state
    pub status: CacheStatus,
    /// Whether the terminal result has been delivered to a caller
    pub consumed: bool,
    /// Task id correlated with this entry
    pub task_id: String,
    /// Attempts recorded by the owning execution
    #[serde(default)]
    pub retry_count: u32,
}

impl CacheEntry {
    /// Create the pending entry written when a call is dispatched
    pub fn pending(task_id: impl Into<String>, ttl: Duration) -> Self {
        Self {
            result: ToolCallResult::text("Tool call is still running"),
            timestamp: Utc::now(),
            ttl_secs: ttl.num_seconds(),
            status: CacheStatus::Pending,
            consumed: false,
            task_id: task_id.into(),
            retry_count: 0,
        }
    }

    /// Transition to a terminal state with the real result.
    ///
    /// Resets the timestamp so the TTL window starts when the result became
    /// available, not when the call was dispatched.
    pub fn complete(&mut self, status: CacheStatus, result: ToolCallResult) {
        debug_assert!(status.is_terminal());
        self.status = status;
        self.result = result;
        self.timestamp = Utc::now();
        self.consumed = false;
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.timestamp > Duration::seconds(self.ttl_secs)
    }

    /// Whether a fast-path read may return this entry (and consume it)
    pub fn is_deliverable(&self, now: DateTime<Utc>) -> bool {
        self.status.is_terminal() && !self.consumed && !self.is_expired(now)
    }

    /// Whether the lifecycle sweep should delete this entry
    pub fn is_evictable(&self, now: DateTime<Utc>) -> bool {
        self.consumed || self.is_expired(now)
    }

    /// Mark the one-time delivery
    pub fn mark_consumed(&mut self) {
        self.consumed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed_entry() -> CacheEntry {
        let mut entry = CacheEntry::pending("t-0123456789abcdef", Duration::seconds(300));
        entry.complete(CacheStatus::Completed, ToolCallResult::text("15°C"));
        entry
    }

    #[test]
    fn test_pending_entry_is_not_deliverable() {
        let entry = CacheEntry::pending("t-0123456789abcdef", Duration::seconds(300));
        assert_eq!(entry.status, CacheStatus::Pending);
        assert!(!entry.is_deliverable(Utc::now()));
        assert!(!entry.is_evictable(Utc::now()));
    }

    #[test]
    fn test_completed_entry_is_deliverable_once() {
        let mut entry = completed_entry();
        let now = Utc::now();
        assert!(entry.is_deliverable(now));

        entry.mark_consumed();
        assert!(!entry.is_deliverable(now));
        // Consumed entries are evicted regardless of remaining TTL
        assert!(entry.is_evictable(now));
    }

    #[test]
    fn test_failed_entry_is_deliverable() {
        let mut entry = CacheEntry::pending("t-0123456789abcdef", Duration::seconds(300));
        entry.complete(CacheStatus::Failed, ToolCallResult::error("upstream exploded"));
        assert!(entry.is_deliverable(Utc::now()));
        assert!(entry.result.is_error);
    }

    #[test]
    fn test_expiry() {
        let entry = completed_entry();
        let later = entry.timestamp + Duration::seconds(301);
        assert!(entry.is_expired(later));
        assert!(!entry.is_deliverable(later));
        // Unconsumed but expired: still evictable
        assert!(entry.is_evictable(later));
    }

    #[test]
    fn test_unconsumed_unexpired_survives_sweep() {
        let entry = completed_entry();
        let now = entry.timestamp + Duration::seconds(10);
        assert!(!entry.is_evictable(now));
    }
}
