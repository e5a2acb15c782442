//! Composition root
//!
//! [`GatewayBuilder`] wires a [`ToolGateway`] from a loaded [`FileConfig`]:
//! validation, credential resolver, dispatcher, cache store and tool source
//! are all assembled here and nowhere else; there are no global singletons.
//! Callers register their function-handler callbacks and may swap in the
//! file-backed cache store or a real downstream forwarder before building.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use toolgate_application::cache::{CacheLifecycle, LifecycleHandle};
use toolgate_application::gateway::{GatewayError, ToolGateway};
use toolgate_application::ports::cache_store::CacheStorePort;
use toolgate_application::ports::forwarder::{ForwardError, ToolForwarderPort};
use toolgate_application::registry::ToolRegistry;
use toolgate_application::tasks::TaskManager;
use toolgate_domain::tool::value_objects::ToolCallResult;
use tracing::info;

use crate::cache_store::MemoryCacheStore;
use crate::config::{ConfigLoader, ConfigValidationError, FileConfig};
use crate::credentials::ConfigCredentialResolver;
use crate::dispatch::{FunctionRegistry, HandlerDispatcher};
use crate::tool_source::StaticToolSource;

/// Failures while assembling a gateway
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid configuration: {}", format_validation_errors(.0))]
    InvalidConfig(Vec<ConfigValidationError>),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

fn format_validation_errors(errors: &[ConfigValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Forwarder used when no downstream aggregator is wired in
struct NullForwarder;

#[async_trait]
impl ToolForwarderPort for NullForwarder {
    async fn call_tool(
        &self,
        service: &str,
        _tool: &str,
        _arguments: &serde_json::Value,
    ) -> Result<ToolCallResult, ForwardError> {
        Err(ForwardError::ServiceUnavailable(service.to_string()))
    }
}

/// Assembles a [`ToolGateway`] from configuration
pub struct GatewayBuilder {
    config: FileConfig,
    functions: FunctionRegistry,
    cache: Option<Arc<dyn CacheStorePort>>,
    forwarder: Option<Arc<dyn ToolForwarderPort>>,
    client: Option<reqwest::Client>,
}

impl GatewayBuilder {
    pub fn new(config: FileConfig) -> Self {
        Self {
            config,
            functions: FunctionRegistry::new(),
            cache: None,
            forwarder: None,
            client: None,
        }
    }

    /// Load configuration from the standard locations (or `path`) first
    pub fn from_path(path: Option<&PathBuf>) -> Result<Self, BootstrapError> {
        Ok(Self::new(ConfigLoader::load(path)?))
    }

    /// Register a callback for a function handler
    pub fn register_function<F, Fut>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(serde_json::Value, Option<serde_json::Value>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<String, String>> + Send + 'static,
    {
        self.functions.register(name, func);
        self
    }

    /// Replace the default in-memory cache store
    pub fn with_cache_store(mut self, cache: Arc<dyn CacheStorePort>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Wire in the downstream aggregator for forward handlers
    pub fn with_forwarder(mut self, forwarder: Arc<dyn ToolForwarderPort>) -> Self {
        self.forwarder = Some(forwarder);
        self
    }

    /// Use a preconfigured HTTP client for the http and proxy handlers
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Validate, wire and initialize the gateway
    pub async fn build(self) -> Result<ToolGateway, BootstrapError> {
        let errors = self.config.validate();
        if !errors.is_empty() {
            return Err(BootstrapError::InvalidConfig(errors));
        }

        let registry = ToolRegistry::new();
        let credentials = Arc::new(ConfigCredentialResolver::new(
            self.config.gateway.platforms.clone(),
        ));
        let forwarder = self.forwarder.unwrap_or_else(|| Arc::new(NullForwarder));

        let mut dispatcher = HandlerDispatcher::new(
            registry.clone(),
            Arc::new(self.functions),
            forwarder,
            credentials,
        );
        if let Some(client) = self.client {
            dispatcher = dispatcher.with_client(client);
        }

        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(MemoryCacheStore::new()));
        let source = Arc::new(StaticToolSource::new(self.config.tool_definitions()));

        let gateway = ToolGateway::new(
            registry,
            Arc::new(dispatcher),
            cache,
            TaskManager::new(),
            source,
        )
        .with_default_timeout(Duration::from_secs(self.config.gateway.call_timeout_secs))
        .with_cache_ttl(chrono::Duration::seconds(self.config.gateway.cache_ttl_secs));

        gateway.initialize().await?;
        info!(
            tools = self.config.tools.len(),
            timeout_secs = self.config.gateway.call_timeout_secs,
            "Gateway assembled"
        );
        Ok(gateway)
    }

    /// [`build`](Self::build), plus a running cache lifecycle sweep
    pub async fn build_with_lifecycle(
        self,
    ) -> Result<(ToolGateway, LifecycleHandle), BootstrapError> {
        let sweep_interval = Duration::from_secs(self.config.gateway.sweep_interval_secs);
        let gateway = self.build().await?;
        let lifecycle = CacheLifecycle::new(gateway.cache().clone())
            .with_interval(sweep_interval)
            .spawn();
        Ok((gateway, lifecycle))
    }
}
