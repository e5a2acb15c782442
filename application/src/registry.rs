//! In-memory tool registry
//!
//! A shared name → [`ToolDefinition`] map owned by the composition root and
//! read by both the gateway (call resolution) and the dispatcher (chain step
//! resolution). Population happens through [`ToolRegistry::replace`] on
//! initialize/reinitialize; lookups clone the definition so no lock is held
//! across an execution.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use toolgate_domain::tool::entities::ToolDefinition;

/// Shared registry of the tools the gateway serves
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, ToolDefinition>>,
}

impl ToolRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Swap in a freshly loaded tool set
    pub async fn replace(&self, tools: Vec<ToolDefinition>) {
        let mut map = HashMap::with_capacity(tools.len());
        for tool in tools {
            if let Some(previous) = map.insert(tool.name.clone(), tool) {
                tracing::warn!(tool = %previous.name, "Duplicate tool definition replaced");
            }
        }
        *self.tools.write().await = map;
    }

    /// Look up a tool by name
    pub async fn get(&self, name: &str) -> Option<ToolDefinition> {
        self.tools.read().await.get(name).cloned()
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.tools.read().await.contains_key(name)
    }

    /// Names of all registered tools, sorted
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn len(&self) -> usize {
        self.tools.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tools.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolgate_domain::tool::entities::{ForwardHandler, HandlerConfig};

    fn tool(name: &str) -> ToolDefinition {
        ToolDefinition::new(
            name,
            "test tool",
            HandlerConfig::Forward(ForwardHandler {
                service: "svc".to_string(),
                tool: name.to_string(),
            }),
        )
    }

    #[tokio::test]
    async fn test_replace_and_lookup() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty().await);

        registry.replace(vec![tool("alpha"), tool("beta")]).await;
        assert_eq!(registry.len().await, 2);
        assert!(registry.contains("alpha").await);
        assert_eq!(registry.get("beta").await.unwrap().name, "beta");
        assert!(registry.get("gamma").await.is_none());
    }

    #[tokio::test]
    async fn test_replace_discards_previous_set() {
        let registry = ToolRegistry::new();
        registry.replace(vec![tool("old")]).await;
        registry.replace(vec![tool("new")]).await;

        assert!(!registry.contains("old").await);
        assert_eq!(registry.names().await, vec!["new".to_string()]);
    }
}
