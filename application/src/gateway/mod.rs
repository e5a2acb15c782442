//! Tool gateway: the timeout/continuation controller
//!
//! The gateway is the entry point for a logical `(tool, arguments)` call.
//! It decides how the call runs (via the dispatcher port), what happens when
//! it runs too long (a deadline race that never cancels the work), and how a
//! delayed result is made available exactly once (the consumable cache).
//!
//! # Call flow
//!
//! ```text
//! call_tool(name, args)
//!   ├─ registry lookup            → GatewayError::UnknownTool on miss
//!   ├─ cache fast path            → deliverable entry: consume and return
//!   ├─ write Pending entry + task record
//!   ├─ spawn detached execution   → always writes the terminal entry
//!   └─ race oneshot vs deadline
//!        ├─ execution wins        → CallOutcome::Completed (direct return)
//!        └─ deadline wins         → CallOutcome::Pending { task_id }
//! ```
//!
//! Losing the race does not cancel the execution: downstream work (remote
//! workflows, subprocess scripts) may be stateful or non-idempotent, so the
//! gateway trades a cancellation guarantee for availability of eventual
//! results. Callers must be prepared to poll with the same arguments.
//!
//! # Known race
//!
//! Two concurrent calls with the same call key can both lose the fast path
//! and dispatch; their terminal writes land last-writer-wins. Callers should
//! treat identical concurrent calls as producing a single observable result.
//! This is deliberate and probed by a test rather than serialized away.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;
use toolgate_domain::cache::entities::{CacheEntry, CacheStatus};
use toolgate_domain::tool::call_key::CallKey;
use toolgate_domain::tool::value_objects::{CallOutcome, ToolCallResult};
use tracing::{debug, warn};

use crate::ports::cache_store::{CacheStoreError, CacheStorePort};
use crate::ports::dispatcher::{DispatchError, DispatcherPort};
use crate::ports::tool_source::{ConfigChange, ToolSourceError, ToolSourcePort};
use crate::registry::ToolRegistry;
use crate::tasks::TaskManager;

/// Default deadline for standard tools
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(8);

/// Default TTL of terminal cache entries
pub const DEFAULT_CACHE_TTL_SECS: i64 = 300;

/// Per-call options
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Deadline override; explicitly slow integrations should raise this
    pub timeout: Option<Duration>,
}

impl CallOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// Gateway failures visible to the calling protocol layer
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The call names a tool absent from the registry
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// A handler configuration error detected at dispatch time
    #[error("Configuration error: {0}")]
    Configuration(#[from] DispatchError),

    /// The cache store is unreachable, the only infrastructure class
    #[error("Cache store error: {0}")]
    Store(#[from] CacheStoreError),

    /// Failed to (re)load tool definitions
    #[error("Tool source error: {0}")]
    ToolSource(#[from] ToolSourceError),

    /// The execution task ended without reporting (panicked or was aborted)
    #[error("Execution ended unexpectedly for task {0}")]
    ExecutionLost(String),
}

/// The tool-call gateway
pub struct ToolGateway {
    registry: Arc<ToolRegistry>,
    dispatcher: Arc<dyn DispatcherPort>,
    cache: Arc<dyn CacheStorePort>,
    tasks: TaskManager,
    source: Arc<dyn ToolSourcePort>,
    default_timeout: Duration,
    cache_ttl: chrono::Duration,
}

impl ToolGateway {
    pub fn new(
        registry: Arc<ToolRegistry>,
        dispatcher: Arc<dyn DispatcherPort>,
        cache: Arc<dyn CacheStorePort>,
        tasks: TaskManager,
        source: Arc<dyn ToolSourcePort>,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            cache,
            tasks,
            source,
            default_timeout: DEFAULT_CALL_TIMEOUT,
            cache_ttl: chrono::Duration::seconds(DEFAULT_CACHE_TTL_SECS),
        }
    }

    /// Override the default deadline
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Override the terminal-entry TTL
    pub fn with_cache_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Populate the registry from the tool source
    pub async fn initialize(&self) -> Result<(), GatewayError> {
        let tools = self.source.get_tools().await?;
        debug!(count = tools.len(), "Initializing tool registry");
        self.registry.replace(tools).await;
        Ok(())
    }

    /// Repopulate the registry after a configuration-changed notification
    pub async fn reinitialize(&self, change: ConfigChange) -> Result<(), GatewayError> {
        debug!(change = ?change, "Reinitializing tool registry");
        self.initialize().await
    }

    /// Execute a tool call under the deadline race.
    ///
    /// Returns either the real result (the execution won the race, or a
    /// prior execution's unconsumed result was waiting in the cache) or a
    /// pending placeholder whose task id a caller can correlate later.
    pub async fn call_tool(
        &self,
        tool_name: &str,
        arguments: serde_json::Value,
        options: CallOptions,
    ) -> Result<CallOutcome, GatewayError> {
        let tool = self
            .registry
            .get(tool_name)
            .await
            .ok_or_else(|| GatewayError::UnknownTool(tool_name.to_string()))?;

        let key = CallKey::derive(tool_name, &arguments);
        let task_id = key.task_id();

        // Fast path: a prior execution finished and nobody consumed it yet.
        // The store checks and consumes under one lock.
        if let Some(entry) = self
            .cache
            .take_deliverable(key.as_str(), chrono::Utc::now())
            .await?
        {
            debug!(tool = %tool_name, task_id = %entry.task_id, "Delivering cached result");
            return Ok(CallOutcome::Completed(entry.result));
        }

        self.cache
            .insert(key.as_str(), CacheEntry::pending(&task_id, self.cache_ttl))
            .await?;
        self.tasks
            .mark_pending(&task_id, tool_name, arguments.clone())
            .await;

        let rx = self.spawn_execution(&key, &task_id, tool_name, tool, arguments);

        let deadline = options.timeout.unwrap_or(self.default_timeout);
        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(Ok(result))) => {
                debug!(tool = %tool_name, task_id = %task_id, "Execution won the race");
                Ok(CallOutcome::Completed(result))
            }
            Ok(Ok(Err(config_error))) => Err(GatewayError::Configuration(config_error)),
            Ok(Err(_closed)) => Err(GatewayError::ExecutionLost(task_id)),
            Err(_elapsed) => {
                debug!(tool = %tool_name, task_id = %task_id, timeout_ms = deadline.as_millis() as u64,
                    "Deadline won the race; execution continues in background");
                Ok(CallOutcome::Pending {
                    task_id,
                    tool_name: tool_name.to_string(),
                })
            }
        }
    }

    /// Start the detached execution and return the receiver the caller races.
    ///
    /// The spawned task owns the full completion path: it always writes the
    /// terminal cache entry first and the task record second, whether or not
    /// the caller is still listening.
    fn spawn_execution(
        &self,
        key: &CallKey,
        task_id: &str,
        tool_name: &str,
        tool: toolgate_domain::tool::entities::ToolDefinition,
        arguments: serde_json::Value,
    ) -> oneshot::Receiver<Result<ToolCallResult, DispatchError>> {
        let (tx, rx) = oneshot::channel();
        let dispatcher = Arc::clone(&self.dispatcher);
        let cache = Arc::clone(&self.cache);
        let tasks = self.tasks.clone();
        let key = key.as_str().to_string();
        let task_id = task_id.to_string();
        let tool_name = tool_name.to_string();

        tokio::spawn(async move {
            let outcome = dispatcher.dispatch(&tool, &arguments).await;

            match &outcome {
                Ok(result) => {
                    if let Err(e) = cache
                        .complete(&key, CacheStatus::Completed, result.clone(), &task_id)
                        .await
                    {
                        warn!(task_id = %task_id, error = %e, "Failed to cache result");
                    }
                    tasks.mark_completed(&task_id, result.clone()).await;
                }
                Err(error) => {
                    let failure = ToolCallResult::error(error.to_string());
                    if let Err(e) = cache
                        .complete(&key, CacheStatus::Failed, failure, &task_id)
                        .await
                    {
                        warn!(task_id = %task_id, error = %e, "Failed to cache failure");
                    }
                    tasks.mark_failed(&task_id, error.to_string()).await;
                }
            }

            debug!(tool = %tool_name, task_id = %task_id, "Execution resolved");
            // The caller may have stopped waiting after the deadline
            let _ = tx.send(outcome);
        });

        rx
    }

    /// Status of a background task, for task-centric queries
    pub async fn task_status(
        &self,
        task_id: &str,
    ) -> Option<toolgate_domain::task::entities::TaskStatus> {
        self.tasks.get_status(task_id).await
    }

    /// The task manager owning the lifecycle records
    pub fn tasks(&self) -> &TaskManager {
        &self.tasks
    }

    /// The cache store the gateway writes through
    pub fn cache(&self) -> &Arc<dyn CacheStorePort> {
        &self.cache
    }
}
