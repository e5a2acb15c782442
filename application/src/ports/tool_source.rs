//! Tool source port
//!
//! Supplies the tool definitions the gateway registry is (re)populated from.
//! Reinitialization is triggered by an external configuration-changed
//! notification carrying a [`ConfigChange`] discriminator.

use async_trait::async_trait;
use thiserror::Error;
use toolgate_domain::tool::entities::ToolDefinition;

/// Which part of the configuration changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigChange {
    /// Locally configured tools changed (handlers added/updated/removed)
    CustomTools,
    /// The downstream aggregator's tool set changed
    ServerTools,
}

/// Tool source failures
#[derive(Debug, Error)]
pub enum ToolSourceError {
    #[error("Failed to load tool definitions: {0}")]
    LoadFailed(String),
}

/// Port for the configuration store owning the tool definitions
#[async_trait]
pub trait ToolSourcePort: Send + Sync {
    /// All tool definitions, in registration order
    async fn get_tools(&self) -> Result<Vec<ToolDefinition>, ToolSourceError>;
}
