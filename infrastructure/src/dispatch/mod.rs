//! Handler dispatcher: the polymorphic executor
//!
//! [`HandlerDispatcher`] implements the application layer's
//! [`DispatcherPort`] by switching exhaustively on a tool's handler variant:
//!
//! ```text
//! DispatcherPort::dispatch()
//!   ├─ Proxy    → proxy::execute     (reqwest, platform credential)
//!   ├─ Function → function registry  (registered callback, timed)
//!   ├─ Http     → http::execute      (reqwest, auth/templating/retries)
//!   ├─ Script   → script::execute    (tokio subprocess, killed on timeout)
//!   ├─ Chain    → chain::execute     (re-enters dispatch per step)
//!   └─ Forward  → forwarder port     (downstream aggregator)
//! ```
//!
//! Every expected failure mode is converted into an `is_error` result with
//! diagnostic text; the only `Err` returns are configuration errors
//! (unregistered callback, unknown chain step).

pub mod chain;
pub mod function;
pub mod http;
pub mod proxy;
pub mod script;

pub use function::{FunctionRegistry, ToolFunction};

use std::sync::Arc;

use async_trait::async_trait;
use toolgate_application::ports::credentials::CredentialResolverPort;
use toolgate_application::ports::dispatcher::{DispatchError, DispatcherPort};
use toolgate_application::ports::forwarder::ToolForwarderPort;
use toolgate_application::registry::ToolRegistry;
use toolgate_domain::tool::entities::{HandlerConfig, ToolDefinition};
use toolgate_domain::tool::value_objects::ToolCallResult;
use tracing::debug;

/// Executor over the six handler strategies
pub struct HandlerDispatcher {
    /// Shared with the gateway; chains resolve their steps against it
    registry: Arc<ToolRegistry>,
    functions: Arc<FunctionRegistry>,
    forwarder: Arc<dyn ToolForwarderPort>,
    credentials: Arc<dyn CredentialResolverPort>,
    client: reqwest::Client,
}

impl HandlerDispatcher {
    pub fn new(
        registry: Arc<ToolRegistry>,
        functions: Arc<FunctionRegistry>,
        forwarder: Arc<dyn ToolForwarderPort>,
        credentials: Arc<dyn CredentialResolverPort>,
    ) -> Self {
        Self {
            registry,
            functions,
            forwarder,
            credentials,
            client: reqwest::Client::new(),
        }
    }

    /// Use a preconfigured HTTP client (proxies, default headers, ...)
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub(crate) fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }
}

#[async_trait]
impl DispatcherPort for HandlerDispatcher {
    async fn dispatch(
        &self,
        tool: &ToolDefinition,
        arguments: &serde_json::Value,
    ) -> Result<ToolCallResult, DispatchError> {
        debug!(tool = %tool.name, handler = tool.handler_kind(), "Dispatching tool call");

        match &tool.handler {
            HandlerConfig::Proxy(config) => Ok(proxy::execute(
                &self.client,
                self.credentials.as_ref(),
                config,
                arguments,
            )
            .await),
            HandlerConfig::Function(config) => self.functions.execute(config, arguments).await,
            HandlerConfig::Http(config) => {
                Ok(http::execute(&self.client, config, arguments).await)
            }
            HandlerConfig::Script(config) => Ok(script::execute(config, arguments).await),
            HandlerConfig::Chain(config) => chain::execute(self, config, arguments).await,
            HandlerConfig::Forward(config) => {
                match self
                    .forwarder
                    .call_tool(&config.service, &config.tool, arguments)
                    .await
                {
                    Ok(result) => Ok(result),
                    Err(error) => Ok(ToolCallResult::error(format!(
                        "Forwarded call to '{}/{}' failed: {}",
                        config.service, config.tool, error
                    ))),
                }
            }
        }
    }
}
