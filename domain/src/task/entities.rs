//! Background task records
//!
//! A [`TaskRecord`] mirrors the cache entry for task-centric queries: status
//! lookup for a poll, stalled-task detection, and statistics. States move
//! `pending → completed` or `pending → failed` and never leave a terminal
//! state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tool::value_objects::ToolCallResult;

/// Finite task states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle record of one background execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Task id derived from the call key
    pub task_id: String,
    /// Tool being executed
    pub tool_name: String,
    /// Original call arguments
    pub arguments: serde_json::Value,
    /// Lifecycle state
    pub status: TaskStatus,
    /// When the execution was dispatched
    pub start_time: DateTime<Utc>,
    /// When the execution reached a terminal state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Result of a completed execution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ToolCallResult>,
    /// Diagnostic of a failed execution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskRecord {
    /// Create a fresh pending record
    pub fn pending(
        task_id: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            tool_name: tool_name.into(),
            arguments,
            status: TaskStatus::Pending,
            start_time: Utc::now(),
            end_time: None,
            result: None,
            error: None,
        }
    }

    /// Transition to `Completed`. Returns false if already terminal.
    pub fn complete(&mut self, result: ToolCallResult) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Completed;
        self.end_time = Some(Utc::now());
        self.result = Some(result);
        true
    }

    /// Transition to `Failed`. Returns false if already terminal.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Failed;
        self.end_time = Some(Utc::now());
        self.error = Some(error.into());
        true
    }

    /// How long the task has been (or was) running
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        self.end_time.unwrap_or(now) - self.start_time
    }

    /// Whether the task has sat in `Pending` longer than `max_age`
    pub fn is_stalled(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
        self.status == TaskStatus::Pending && now - self.start_time > max_age
    }
}
