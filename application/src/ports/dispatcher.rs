//! Dispatcher port
//!
//! Defines how the gateway hands a tool definition and arguments to the
//! polymorphic handler executor.

use async_trait::async_trait;
use thiserror::Error;
use toolgate_domain::tool::{entities::ToolDefinition, value_objects::ToolCallResult};

/// Configuration errors surfaced by the dispatcher.
///
/// These are the only failures a dispatcher may raise: expected execution
/// failures (remote errors, non-zero exits, per-handler timeouts) are
/// converted into `is_error` results instead. An unknown handler type cannot
/// occur; the handler union is closed.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The function handler names a callback nobody registered
    #[error("Function '{0}' is not registered")]
    UnregisteredFunction(String),

    /// A chain step names a tool absent from the gateway registry
    #[error("Chain step '{0}' is not a configured tool")]
    UnknownChainStep(String),
}

/// Port for the polymorphic handler executor
///
/// Implementations switch exhaustively on the tool's handler variant and
/// normalize every expected failure mode into the result's error flag.
#[async_trait]
pub trait DispatcherPort: Send + Sync {
    /// Execute one tool call to completion
    async fn dispatch(
        &self,
        tool: &ToolDefinition,
        arguments: &serde_json::Value,
    ) -> Result<ToolCallResult, DispatchError>;
}
