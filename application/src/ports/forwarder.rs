//! Forwarder port
//!
//! The downstream aggregator owns the connections to tool-providing servers;
//! the gateway's `forward` handler delegates to it unmodified and wraps any
//! failure into an error result rather than propagating it.

use async_trait::async_trait;
use thiserror::Error;
use toolgate_domain::tool::value_objects::ToolCallResult;

/// Aggregator-side failures
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("Service '{0}' is not connected")]
    ServiceUnavailable(String),

    #[error("Forwarded call failed: {0}")]
    CallFailed(String),
}

/// Port for the downstream tool aggregator
#[async_trait]
pub trait ToolForwarderPort: Send + Sync {
    /// Invoke `tool` on `service`; existence is resolved downstream
    async fn call_tool(
        &self,
        service: &str,
        tool: &str,
        arguments: &serde_json::Value,
    ) -> Result<ToolCallResult, ForwardError>;
}
