//! Tool domain entities
//!
//! A [`ToolDefinition`] binds a name and input schema to exactly one
//! [`HandlerConfig`] variant. The union is closed: dispatch is an exhaustive
//! match, so adding a handler kind is a compile-time-checked change.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Definition of a tool the gateway can invoke
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique name of the tool (e.g., "weather")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON-Schema-like description of the accepted arguments
    #[serde(default = "default_input_schema")]
    pub input_schema: serde_json::Value,
    /// Execution strategy bound to this tool
    pub handler: HandlerConfig,
}

fn default_input_schema() -> serde_json::Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: HandlerConfig,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: default_input_schema(),
            handler,
        }
    }

    pub fn with_input_schema(mut self, schema: serde_json::Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Short name of the bound handler variant (for logs and diagnostics)
    pub fn handler_kind(&self) -> &'static str {
        self.handler.kind()
    }
}

/// Execution strategy of a tool: a closed tagged union.
///
/// | Variant | Runs |
/// |---------|------|
/// | `Proxy` | Remote workflow-style API (platform + workflow/bot id) |
/// | `Function` | A callback registered in the gateway's function registry |
/// | `Http` | A generic HTTP call with auth, templating and retries |
/// | `Script` | A subprocess running inline source or a script file |
/// | `Chain` | Other tools, sequenced or parallelized |
/// | `Forward` | Delegation to the downstream tool aggregator |
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HandlerConfig {
    Proxy(ProxyHandler),
    Function(FunctionHandler),
    Http(HttpHandler),
    Script(ScriptHandler),
    Chain(ChainHandler),
    /// Also accepted as `mcp-forward` in configuration
    #[serde(alias = "mcp-forward")]
    Forward(ForwardHandler),
}

impl HandlerConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            HandlerConfig::Proxy(_) => "proxy",
            HandlerConfig::Function(_) => "function",
            HandlerConfig::Http(_) => "http",
            HandlerConfig::Script(_) => "script",
            HandlerConfig::Chain(_) => "chain",
            HandlerConfig::Forward(_) => "forward",
        }
    }
}

/// Remote workflow proxy configuration (e.g., a Coze workflow)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyHandler {
    /// Platform identifier; selects the credential and default base URL
    pub platform: String,
    /// Workflow to invoke (platform-specific)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    /// Bot to invoke (platform-specific alternative to a workflow)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_id: Option<String>,
    /// Override of the platform base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Extra request headers
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Static parameters merged under the call arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    /// Request timeout in seconds (default: 30)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Registered-callback configuration.
///
/// The original design loaded modules dynamically at call time; here the
/// callable must be registered in the function registry at startup, keyed
/// by this name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionHandler {
    /// Registry key of the callback to invoke
    pub function: String,
    /// Optional second argument passed alongside the call arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
    /// Invocation timeout in seconds (default: 30)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Generic HTTP call configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpHandler {
    /// Target URL
    pub url: String,
    /// HTTP method (default: POST; GET serializes arguments as the query string)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Extra request headers
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Authentication scheme
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<HttpAuth>,
    /// Body template with `{{var}}` placeholders; raw JSON arguments when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_template: Option<String>,
    /// Dotted-path extraction applied to the response body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mapping: Option<ResponseMapping>,
    /// Number of retries after the first attempt (default: 0)
    #[serde(default)]
    pub retry_count: u32,
    /// Fixed delay between attempts in milliseconds (default: 1000)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay_ms: Option<u64>,
    /// Per-attempt timeout in seconds (default: 30)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Authentication for the http handler
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "kebab-case")]
pub enum HttpAuth {
    Bearer {
        token: String,
    },
    Basic {
        username: String,
        password: String,
    },
    ApiKey {
        key: String,
        /// Header carrying the key (default: "X-Api-Key")
        #[serde(default, skip_serializing_if = "Option::is_none")]
        header: Option<String>,
    },
}

/// Dotted-path response extraction for the http handler.
///
/// `success_path` points at a truthiness indicator in the response body;
/// `data_path` points at the value returned as the result text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_path: Option<String>,
}

/// Subprocess script configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptHandler {
    /// Inline script source, or a path to a script file.
    ///
    /// Treated as inline source when it contains a newline or exceeds the
    /// path-length heuristic; inline source is materialized as a temporary
    /// file for the duration of the run.
    pub script: String,
    /// Interpreter binary (default: "sh")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<String>,
    /// Extra environment variables for the subprocess
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    /// Run timeout in seconds; the subprocess is killed on expiry (default: 30)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Composite handler sequencing or parallelizing other tools
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainHandler {
    /// Step tool names, resolved against the gateway's own registry
    pub tools: Vec<String>,
    /// Execution mode
    #[serde(default)]
    pub mode: ChainMode,
    /// Policy applied when a sequential step produces an error
    #[serde(default)]
    pub error_handling: ChainErrorHandling,
}

/// Chain execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainMode {
    /// Steps run in order; each step's output feeds the next step's arguments
    #[default]
    Sequential,
    /// All steps run concurrently against the original arguments
    Parallel,
}

/// Error policy for sequential chains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainErrorHandling {
    /// Abort the remaining chain on the first error step
    #[default]
    Stop,
    /// Re-invoke the failed step exactly once more, then abort if it errors again
    Retry,
    /// Proceed to the next step, carrying the previous successful arguments
    Continue,
}

/// Delegation to the downstream tool aggregator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardHandler {
    /// Downstream service name
    pub service: String,
    /// Tool name on that service
    pub tool: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_kind() {
        let handler = HandlerConfig::Script(ScriptHandler {
            script: "echo hi".to_string(),
            interpreter: None,
            env: BTreeMap::new(),
            timeout_secs: None,
        });
        assert_eq!(handler.kind(), "script");
    }

    #[test]
    fn test_handler_config_tagged_deserialization() {
        let json = serde_json::json!({
            "type": "http",
            "url": "https://api.example.com/v1/run",
            "method": "GET",
            "retry_count": 2
        });
        let handler: HandlerConfig = serde_json::from_value(json).unwrap();
        match handler {
            HandlerConfig::Http(http) => {
                assert_eq!(http.url, "https://api.example.com/v1/run");
                assert_eq!(http.method.as_deref(), Some("GET"));
                assert_eq!(http.retry_count, 2);
                assert!(http.auth.is_none());
            }
            other => panic!("expected http handler, got {}", other.kind()),
        }
    }

    #[test]
    fn test_forward_accepts_both_spellings() {
        for kind in ["forward", "mcp-forward"] {
            let json = serde_json::json!({ "type": kind, "service": "calendar", "tool": "list" });
            let handler: HandlerConfig = serde_json::from_value(json).unwrap();
            assert_eq!(handler.kind(), "forward");
        }
    }

    #[test]
    fn test_unknown_handler_type_is_rejected() {
        let json = serde_json::json!({ "type": "grpc", "url": "http://x" });
        let result: Result<HandlerConfig, _> = serde_json::from_value(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_chain_defaults() {
        let json = serde_json::json!({ "type": "chain", "tools": ["a", "b"] });
        let handler: HandlerConfig = serde_json::from_value(json).unwrap();
        match handler {
            HandlerConfig::Chain(chain) => {
                assert_eq!(chain.mode, ChainMode::Sequential);
                assert_eq!(chain.error_handling, ChainErrorHandling::Stop);
            }
            other => panic!("expected chain handler, got {}", other.kind()),
        }
    }

    #[test]
    fn test_tool_definition_builder() {
        let tool = ToolDefinition::new(
            "forwarded",
            "Forwarded tool",
            HandlerConfig::Forward(ForwardHandler {
                service: "calendar".to_string(),
                tool: "list_events".to_string(),
            }),
        )
        .with_input_schema(serde_json::json!({ "type": "object" }));

        assert_eq!(tool.name, "forwarded");
        assert_eq!(tool.handler_kind(), "forward");
        assert_eq!(tool.input_schema["type"], "object");
    }
}
