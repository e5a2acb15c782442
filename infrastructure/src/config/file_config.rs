//! Configuration file structures (`toolgate.toml`)
//!
//! Example configuration:
//!
//! ```toml
//! [gateway]
//! call_timeout_secs = 8
//! cache_ttl_secs = 300
//! sweep_interval_secs = 60
//!
//! [gateway.platforms.coze]
//! base_url = "https://api.coze.cn"
//! token = "pat_..."
//!
//! [tools.weather]
//! description = "Current weather for a city"
//! [tools.weather.handler]
//! type = "http"
//! url = "https://weather.example.com/v1/now"
//! method = "GET"
//! retry_count = 2
//!
//! [tools.daily_digest]
//! description = "Summarize, then translate"
//! [tools.daily_digest.handler]
//! type = "chain"
//! tools = ["summarize", "translate"]
//! mode = "sequential"
//! error_handling = "continue"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use toolgate_domain::tool::entities::{HandlerConfig, ToolDefinition};

/// Problems detected while validating a loaded configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("Tool '{tool}': chain step '{step}' is not a configured tool")]
    UnknownChainStep { tool: String, step: String },

    #[error("Tool '{tool}': chain cycle through '{via}'")]
    ChainCycle { tool: String, via: String },

    #[error("Tool '{tool}': chain has no steps")]
    EmptyChain { tool: String },

    #[error("Tool '{tool}': proxy handler needs workflow_id or bot_id")]
    ProxyWithoutTarget { tool: String },

    #[error("Tool '{tool}': http handler has an empty url")]
    EmptyUrl { tool: String },
}

/// Credential material for one proxy platform
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePlatformConfig {
    /// Default base URL for this platform's workflow endpoint
    pub base_url: Option<String>,
    /// Bearer token sent with proxy requests
    pub token: String,
}

/// `[gateway]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGatewayConfig {
    /// Deadline for standard tool calls, in seconds
    pub call_timeout_secs: u64,
    /// TTL of terminal cache entries, in seconds
    pub cache_ttl_secs: i64,
    /// Cache sweep interval, in seconds
    pub sweep_interval_secs: u64,
    /// Proxy platform credentials, keyed by platform identifier
    pub platforms: BTreeMap<String, FilePlatformConfig>,
}

impl Default for FileGatewayConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: 8,
            cache_ttl_secs: 300,
            sweep_interval_secs: 60,
            platforms: BTreeMap::new(),
        }
    }
}

/// One `[tools.<name>]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileToolConfig {
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// JSON-Schema-like argument description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<serde_json::Value>,
    /// Execution strategy (tagged by `type`)
    pub handler: HandlerConfig,
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub gateway: FileGatewayConfig,
    pub tools: BTreeMap<String, FileToolConfig>,
}

impl FileConfig {
    /// Convert the configured tools into domain definitions
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|(name, config)| {
                let mut tool =
                    ToolDefinition::new(name, config.description.clone(), config.handler.clone());
                if let Some(schema) = &config.input_schema {
                    tool = tool.with_input_schema(schema.clone());
                }
                tool
            })
            .collect()
    }

    /// Validate handler shapes and chain references.
    ///
    /// Returns every problem found, not just the first, so a configuration
    /// can be fixed in one pass.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        for (name, config) in &self.tools {
            match &config.handler {
                HandlerConfig::Chain(chain) => {
                    if chain.tools.is_empty() {
                        errors.push(ConfigValidationError::EmptyChain { tool: name.clone() });
                    }
                    for step in &chain.tools {
                        if !self.tools.contains_key(step) {
                            errors.push(ConfigValidationError::UnknownChainStep {
                                tool: name.clone(),
                                step: step.clone(),
                            });
                        }
                    }
                    if let Some(via) = self.find_chain_cycle(name) {
                        errors.push(ConfigValidationError::ChainCycle {
                            tool: name.clone(),
                            via,
                        });
                    }
                }
                HandlerConfig::Proxy(proxy) => {
                    if proxy.workflow_id.is_none() && proxy.bot_id.is_none() {
                        errors.push(ConfigValidationError::ProxyWithoutTarget {
                            tool: name.clone(),
                        });
                    }
                }
                HandlerConfig::Http(http) => {
                    if http.url.trim().is_empty() {
                        errors.push(ConfigValidationError::EmptyUrl { tool: name.clone() });
                    }
                }
                _ => {}
            }
        }

        errors
    }

    /// Depth-first walk over chain references starting at `root`.
    ///
    /// Chains of chains are allowed; revisiting the root means the chain
    /// would re-enter itself at dispatch time.
    fn find_chain_cycle(&self, root: &str) -> Option<String> {
        let mut stack = vec![root.to_string()];
        let mut visited = BTreeSet::new();
        while let Some(current) = stack.pop() {
            let Some(config) = self.tools.get(&current) else {
                continue;
            };
            if let HandlerConfig::Chain(chain) = &config.handler {
                for step in &chain.tools {
                    if step == root {
                        return Some(current);
                    }
                    if visited.insert(step.clone()) {
                        stack.push(step.clone());
                    }
                }
            }
        }
        None
    }
}
