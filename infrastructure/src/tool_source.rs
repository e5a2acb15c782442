//! Tool source backed by the loaded configuration

use async_trait::async_trait;
use toolgate_application::ports::tool_source::{ToolSourceError, ToolSourcePort};
use toolgate_domain::tool::entities::ToolDefinition;

/// Serves the tool definitions converted from a [`crate::config::FileConfig`]
#[derive(Debug, Clone, Default)]
pub struct StaticToolSource {
    tools: Vec<ToolDefinition>,
}

impl StaticToolSource {
    pub fn new(tools: Vec<ToolDefinition>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl ToolSourcePort for StaticToolSource {
    async fn get_tools(&self) -> Result<Vec<ToolDefinition>, ToolSourceError> {
        Ok(self.tools.clone())
    }
}
