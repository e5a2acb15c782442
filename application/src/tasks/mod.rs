//! Task state manager
//!
//! Tracks the lifecycle of background executions so a client's later poll
//! can be correlated with the original call. The manager mirrors the cache
//! entries but is the authoritative structure for task-centric queries:
//! status lookup, stalled-task detection, and statistics.
//!
//! Transitions are `pending → completed` or `pending → failed` only; an
//! attempt to move a terminal task is logged and ignored (the cache entry,
//! written first, already carries the authoritative result).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use toolgate_domain::task::entities::{TaskRecord, TaskStatus};
use toolgate_domain::tool::call_key::CallKey;
use toolgate_domain::tool::value_objects::ToolCallResult;

/// Counts by state, for observability
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub pending: usize,
    pub completed: usize,
    pub failed: usize,
}

impl TaskStats {
    pub fn total(&self) -> usize {
        self.pending + self.completed + self.failed
    }
}

/// In-memory table of background execution records
#[derive(Clone, Default)]
pub struct TaskManager {
    tasks: Arc<RwLock<HashMap<String, TaskRecord>>>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly dispatched execution.
    ///
    /// A repeated call for the same task id (a client re-dispatching after
    /// its previous entry was consumed) resets the record to pending.
    pub async fn mark_pending(
        &self,
        task_id: &str,
        tool_name: &str,
        arguments: serde_json::Value,
    ) {
        let record = TaskRecord::pending(task_id, tool_name, arguments);
        self.tasks.write().await.insert(task_id.to_string(), record);
        tracing::debug!(task_id = %task_id, tool = %tool_name, "Task pending");
    }

    /// Move a task to `Completed`
    pub async fn mark_completed(&self, task_id: &str, result: ToolCallResult) {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(task_id) {
            Some(task) => {
                if !task.complete(result) {
                    tracing::debug!(
                        task_id = %task_id,
                        status = %task.status,
                        "Ignoring completion of terminal task"
                    );
                }
            }
            None => tracing::warn!(task_id = %task_id, "Completion for unknown task"),
        }
    }

    /// Move a task to `Failed`
    pub async fn mark_failed(&self, task_id: &str, reason: impl Into<String>) {
        let reason = reason.into();
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(task_id) {
            Some(task) => {
                if !task.fail(reason) {
                    tracing::debug!(
                        task_id = %task_id,
                        status = %task.status,
                        "Ignoring failure of terminal task"
                    );
                }
            }
            None => tracing::warn!(task_id = %task_id, "Failure for unknown task"),
        }
    }

    /// Status of one task
    pub async fn get_status(&self, task_id: &str) -> Option<TaskStatus> {
        self.tasks.read().await.get(task_id).map(|t| t.status)
    }

    /// Full record of one task
    pub async fn get(&self, task_id: &str) -> Option<TaskRecord> {
        self.tasks.read().await.get(task_id).cloned()
    }

    /// Shape check for an externally supplied task id (format, not existence)
    pub fn validate_task_id(task_id: &str) -> bool {
        CallKey::is_valid_task_id(task_id)
    }

    /// Fail every task that has sat in `Pending` longer than `max_age`.
    ///
    /// Covers executions that crashed without reaching a terminal state.
    /// Returns how many tasks were flagged.
    pub async fn restart_stalled_tasks(&self, max_age: Duration) -> usize {
        let now = Utc::now();
        let mut flagged = 0;
        let mut tasks = self.tasks.write().await;
        for task in tasks.values_mut() {
            if task.is_stalled(now, max_age) {
                task.fail(format!(
                    "Stalled: no terminal state after {}s",
                    max_age.num_seconds()
                ));
                flagged += 1;
                tracing::warn!(task_id = %task.task_id, tool = %task.tool_name, "Stalled task failed");
            }
        }
        flagged
    }

    /// Counts by state
    pub async fn stats(&self) -> TaskStats {
        let tasks = self.tasks.read().await;
        let mut stats = TaskStats::default();
        for task in tasks.values() {
            match task.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    /// Drop terminal records older than `max_age` (housekeeping)
    pub async fn prune_terminal(&self, max_age: Duration) -> usize {
        let now = Utc::now();
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|_, task| !(task.status.is_terminal() && task.age(now) > max_age));
        before - tasks.len()
    }
}
