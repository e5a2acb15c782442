//! Function handler: registered async callbacks
//!
//! The original design resolved callables dynamically at call time; here
//! every callable is registered up front in a [`FunctionRegistry`], keyed by
//! the name the handler configuration refers to. A registry miss is a
//! configuration error, not an execution failure.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use toolgate_application::ports::dispatcher::DispatchError;
use toolgate_domain::tool::entities::FunctionHandler;
use toolgate_domain::tool::value_objects::ToolCallResult;
use tracing::debug;

/// Default invocation timeout (30 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A registered callback: `(arguments, context) -> text or diagnostic`
pub type ToolFunction = Arc<
    dyn Fn(serde_json::Value, Option<serde_json::Value>) -> BoxFuture<'static, Result<String, String>>
        + Send
        + Sync,
>;

/// Startup-time registry of callable functions
#[derive(Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, ToolFunction>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback under `name`, replacing any previous registration
    pub fn register<F, Fut>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(serde_json::Value, Option<serde_json::Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, String>> + Send + 'static,
    {
        self.functions.insert(
            name.into(),
            Arc::new(move |args, context| Box::pin(func(args, context))),
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Invoke the callback named by `config`, raced against its timeout
    pub async fn execute(
        &self,
        config: &FunctionHandler,
        arguments: &serde_json::Value,
    ) -> Result<ToolCallResult, DispatchError> {
        let func = self
            .functions
            .get(&config.function)
            .cloned()
            .ok_or_else(|| DispatchError::UnregisteredFunction(config.function.clone()))?;

        let timeout_secs = config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        debug!(function = %config.function, timeout_secs, "Invoking registered function");

        let invocation = func(arguments.clone(), config.context.clone());
        match tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), invocation).await
        {
            Ok(Ok(text)) => Ok(ToolCallResult::text(text)),
            Ok(Err(message)) => Ok(ToolCallResult::error(format!(
                "Function '{}' failed: {}",
                config.function, message
            ))),
            Err(_) => Ok(ToolCallResult::error(format!(
                "Function '{}' timed out after {} seconds",
                config.function, timeout_secs
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler(function: &str, timeout_secs: Option<u64>) -> FunctionHandler {
        FunctionHandler {
            function: function.to_string(),
            context: None,
            timeout_secs,
        }
    }

    #[tokio::test]
    async fn test_registered_function_runs() {
        let mut registry = FunctionRegistry::new();
        registry.register("greet", |args, _context| async move {
            let name = args["name"].as_str().unwrap_or("world").to_string();
            Ok(format!("hello {}", name))
        });

        let result = registry
            .execute(&handler("greet", None), &serde_json::json!({ "name": "toolgate" }))
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(result.first_text(), Some("hello toolgate"));
    }

    #[tokio::test]
    async fn test_context_is_passed_through() {
        let mut registry = FunctionRegistry::new();
        registry.register("with_ctx", |_args, context| async move {
            Ok(context.map(|c| c.to_string()).unwrap_or_default())
        });

        let config = FunctionHandler {
            function: "with_ctx".to_string(),
            context: Some(serde_json::json!({ "tenant": "a" })),
            timeout_secs: None,
        };
        let result = registry.execute(&config, &serde_json::json!({})).await.unwrap();
        assert!(result.first_text().unwrap().contains("tenant"));
    }

    #[tokio::test]
    async fn test_unregistered_function_is_config_error() {
        let registry = FunctionRegistry::new();
        let error = registry
            .execute(&handler("missing", None), &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(error, DispatchError::UnregisteredFunction(name) if name == "missing"));
    }

    #[tokio::test]
    async fn test_callback_error_becomes_error_result() {
        let mut registry = FunctionRegistry::new();
        registry.register("broken", |_args, _context| async move {
            Err("database offline".to_string())
        });

        let result = registry
            .execute(&handler("broken", None), &serde_json::json!({}))
            .await
            .unwrap();
        assert!(result.is_error);
        assert!(result.combined_text().contains("database offline"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_callback_times_out() {
        let mut registry = FunctionRegistry::new();
        registry.register("slow", |_args, _context| async move {
            tokio::time::sleep(std::time::Duration::from_secs(120)).await;
            Ok("too late".to_string())
        });

        let result = registry
            .execute(&handler("slow", Some(1)), &serde_json::json!({}))
            .await
            .unwrap();
        assert!(result.is_error);
        assert!(result.combined_text().contains("timed out after 1 seconds"));
    }
}
