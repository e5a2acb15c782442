//! Chain composer: tools built from other tools
//!
//! Steps resolve against the same registry the dispatcher serves, so chains
//! may contain proxies, scripts or other chains.
//! Sequential chains pipe each step's text into the next step's arguments;
//! parallel chains fan the original arguments out to every step. The chain
//! result is the merge of the step results: concatenated content, OR-ed
//! error flag.

use futures::future::join_all;
use toolgate_application::ports::dispatcher::{DispatchError, DispatcherPort};
use toolgate_domain::tool::entities::{ChainErrorHandling, ChainHandler, ChainMode, ToolDefinition};
use toolgate_domain::tool::value_objects::ToolCallResult;
use tracing::{debug, warn};

use super::HandlerDispatcher;

/// Execute one chain-handler call
pub async fn execute(
    dispatcher: &HandlerDispatcher,
    config: &ChainHandler,
    arguments: &serde_json::Value,
) -> Result<ToolCallResult, DispatchError> {
    let steps = resolve_steps(dispatcher, &config.tools).await?;
    match config.mode {
        ChainMode::Sequential => {
            run_sequential(dispatcher, &steps, config.error_handling, arguments).await
        }
        ChainMode::Parallel => run_parallel(dispatcher, &steps, arguments).await,
    }
}

/// Resolve every step up front so a misconfigured chain fails before side effects
async fn resolve_steps(
    dispatcher: &HandlerDispatcher,
    names: &[String],
) -> Result<Vec<ToolDefinition>, DispatchError> {
    let mut steps = Vec::with_capacity(names.len());
    for name in names {
        let tool = dispatcher
            .registry()
            .get(name)
            .await
            .ok_or_else(|| DispatchError::UnknownChainStep(name.clone()))?;
        steps.push(tool);
    }
    Ok(steps)
}

async fn run_sequential(
    dispatcher: &HandlerDispatcher,
    steps: &[ToolDefinition],
    error_handling: ChainErrorHandling,
    arguments: &serde_json::Value,
) -> Result<ToolCallResult, DispatchError> {
    let mut results = Vec::with_capacity(steps.len());
    let mut current_args = arguments.clone();

    for step in steps {
        debug!(step = %step.name, "Running sequential chain step");
        let mut result = dispatcher.dispatch(step, &current_args).await?;

        if result.is_error && error_handling == ChainErrorHandling::Retry {
            warn!(step = %step.name, "Chain step errored, retrying once");
            result = dispatcher.dispatch(step, &current_args).await?;
        }

        if result.is_error {
            match error_handling {
                ChainErrorHandling::Continue => {
                    // Keep going; the next step sees the last successful args.
                    warn!(step = %step.name, "Chain step errored, continuing");
                    results.push(result);
                }
                ChainErrorHandling::Stop | ChainErrorHandling::Retry => {
                    warn!(step = %step.name, "Chain aborted on errored step");
                    results.push(result);
                    break;
                }
            }
        } else {
            current_args = next_arguments(&result, arguments);
            results.push(result);
        }
    }

    Ok(ToolCallResult::merge(results))
}

async fn run_parallel(
    dispatcher: &HandlerDispatcher,
    steps: &[ToolDefinition],
    arguments: &serde_json::Value,
) -> Result<ToolCallResult, DispatchError> {
    debug!(steps = steps.len(), "Running parallel chain");
    let executions = steps.iter().map(|step| dispatcher.dispatch(step, arguments));
    let results: Result<Vec<ToolCallResult>, DispatchError> =
        join_all(executions).await.into_iter().collect();
    Ok(ToolCallResult::merge(results?))
}

/// Arguments for the next step: the previous step's text if it parses as a
/// JSON object, otherwise the text wrapped as `input` over the original args
fn next_arguments(result: &ToolCallResult, original: &serde_json::Value) -> serde_json::Value {
    let text = result.combined_text();
    if let Ok(parsed @ serde_json::Value::Object(_)) = serde_json::from_str(&text) {
        return parsed;
    }

    let mut wrapped = serde_json::Map::new();
    if let Some(object) = original.as_object() {
        wrapped.extend(object.clone());
    }
    wrapped.insert("input".to_string(), serde_json::Value::String(text));
    serde_json::Value::Object(wrapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::test_support::dispatcher_with;
    use crate::dispatch::FunctionRegistry;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use toolgate_application::registry::ToolRegistry;
    use toolgate_domain::tool::entities::{FunctionHandler, HandlerConfig};

    fn function_tool(name: &str, function: &str) -> ToolDefinition {
        ToolDefinition::new(
            name,
            "chain step",
            HandlerConfig::Function(FunctionHandler {
                function: function.to_string(),
                context: None,
                timeout_secs: None,
            }),
        )
    }

    fn chain_tool(name: &str, steps: &[&str], mode: ChainMode, error_handling: ChainErrorHandling) -> ToolDefinition {
        ToolDefinition::new(
            name,
            "chain",
            HandlerConfig::Chain(ChainHandler {
                tools: steps.iter().map(|s| s.to_string()).collect(),
                mode,
                error_handling,
            }),
        )
    }

    async fn registry_with(tools: Vec<ToolDefinition>) -> Arc<ToolRegistry> {
        let registry = ToolRegistry::new();
        registry.replace(tools).await;
        registry
    }

    #[tokio::test]
    async fn test_sequential_pipes_json_output_forward() {
        let mut functions = FunctionRegistry::new();
        functions.register("first", |_args, _ctx| async move {
            Ok(r#"{"city": "Kyoto"}"#.to_string())
        });
        functions.register("second", |args, _ctx| async move {
            Ok(format!("weather for {}", args["city"].as_str().unwrap_or("?")))
        });

        let registry = registry_with(vec![
            function_tool("lookup", "first"),
            function_tool("weather", "second"),
            chain_tool("trip", &["lookup", "weather"], ChainMode::Sequential, ChainErrorHandling::Stop),
        ])
        .await;

        let dispatcher = dispatcher_with(registry.clone(), Arc::new(functions));
        let chain = registry.get("trip").await.unwrap();
        let result = dispatcher.dispatch(&chain, &serde_json::json!({})).await.unwrap();

        assert!(!result.is_error);
        assert!(result.combined_text().contains("weather for Kyoto"));
    }

    #[tokio::test]
    async fn test_sequential_wraps_plain_text_as_input() {
        let mut functions = FunctionRegistry::new();
        functions.register("first", |_args, _ctx| async move { Ok("plain text".to_string()) });
        functions.register("second", |args, _ctx| async move {
            Ok(format!(
                "input={} keep={}",
                args["input"].as_str().unwrap_or("?"),
                args["keep"].as_str().unwrap_or("?")
            ))
        });

        let registry = registry_with(vec![
            function_tool("a", "first"),
            function_tool("b", "second"),
            chain_tool("c", &["a", "b"], ChainMode::Sequential, ChainErrorHandling::Stop),
        ])
        .await;

        let dispatcher = dispatcher_with(registry.clone(), Arc::new(functions));
        let chain = registry.get("c").await.unwrap();
        let result = dispatcher
            .dispatch(&chain, &serde_json::json!({ "keep": "original" }))
            .await
            .unwrap();

        assert!(result.combined_text().contains("input=plain text keep=original"));
    }

    #[tokio::test]
    async fn test_stop_aborts_remaining_steps() {
        let ran_last = Arc::new(AtomicUsize::new(0));
        let ran_last_probe = ran_last.clone();

        let mut functions = FunctionRegistry::new();
        functions.register("boom", |_args, _ctx| async move { Err("failed".to_string()) });
        functions.register("after", move |_args, _ctx| {
            let ran = ran_last_probe.clone();
            async move {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok("ran".to_string())
            }
        });

        let registry = registry_with(vec![
            function_tool("bad", "boom"),
            function_tool("tail", "after"),
            chain_tool("c", &["bad", "tail"], ChainMode::Sequential, ChainErrorHandling::Stop),
        ])
        .await;

        let dispatcher = dispatcher_with(registry.clone(), Arc::new(functions));
        let chain = registry.get("c").await.unwrap();
        let result = dispatcher.dispatch(&chain, &serde_json::json!({})).await.unwrap();

        assert!(result.is_error);
        assert_eq!(ran_last.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_continue_runs_remaining_steps_with_previous_args() {
        let mut functions = FunctionRegistry::new();
        functions.register("boom", |_args, _ctx| async move { Err("failed".to_string()) });
        functions.register("after", |args, _ctx| async move {
            Ok(format!("saw {}", args["seed"].as_str().unwrap_or("nothing")))
        });

        let registry = registry_with(vec![
            function_tool("bad", "boom"),
            function_tool("tail", "after"),
            chain_tool("c", &["bad", "tail"], ChainMode::Sequential, ChainErrorHandling::Continue),
        ])
        .await;

        let dispatcher = dispatcher_with(registry.clone(), Arc::new(functions));
        let chain = registry.get("c").await.unwrap();
        let result = dispatcher
            .dispatch(&chain, &serde_json::json!({ "seed": "original" }))
            .await
            .unwrap();

        // Error flag survives the merge, but the tail step still ran with
        // the original arguments.
        assert!(result.is_error);
        assert!(result.combined_text().contains("saw original"));
    }

    #[tokio::test]
    async fn test_retry_reinvokes_exactly_once() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_probe = attempts.clone();

        let mut functions = FunctionRegistry::new();
        functions.register("flaky", move |_args, _ctx| {
            let attempts = attempts_probe.clone();
            async move {
                // Fails the first time, succeeds on the retry.
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err("transient".to_string())
                } else {
                    Ok("recovered".to_string())
                }
            }
        });

        let registry = registry_with(vec![
            function_tool("step", "flaky"),
            chain_tool("c", &["step"], ChainMode::Sequential, ChainErrorHandling::Retry),
        ])
        .await;

        let dispatcher = dispatcher_with(registry.clone(), Arc::new(functions));
        let chain = registry.get("c").await.unwrap();
        let result = dispatcher.dispatch(&chain, &serde_json::json!({})).await.unwrap();

        assert!(!result.is_error);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(result.combined_text().contains("recovered"));
    }

    #[tokio::test]
    async fn test_parallel_merges_all_results() {
        let mut functions = FunctionRegistry::new();
        functions.register("left", |_args, _ctx| async move { Ok("left done".to_string()) });
        functions.register("right", |_args, _ctx| async move { Err("right broke".to_string()) });

        let registry = registry_with(vec![
            function_tool("l", "left"),
            function_tool("r", "right"),
            chain_tool("c", &["l", "r"], ChainMode::Parallel, ChainErrorHandling::Stop),
        ])
        .await;

        let dispatcher = dispatcher_with(registry.clone(), Arc::new(functions));
        let chain = registry.get("c").await.unwrap();
        let result = dispatcher.dispatch(&chain, &serde_json::json!({})).await.unwrap();

        // No early termination: both outputs are present, error flag OR-ed.
        assert!(result.is_error);
        assert_eq!(result.content.len(), 2);
        assert!(result.combined_text().contains("left done"));
        assert!(result.combined_text().contains("right broke"));
    }

    #[tokio::test]
    async fn test_unknown_step_is_config_error() {
        let registry = registry_with(vec![chain_tool(
            "c",
            &["ghost"],
            ChainMode::Sequential,
            ChainErrorHandling::Stop,
        )])
        .await;

        let dispatcher = dispatcher_with(registry.clone(), Arc::new(FunctionRegistry::new()));
        let chain = registry.get("c").await.unwrap();
        let error = dispatcher
            .dispatch(&chain, &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(error, DispatchError::UnknownChainStep(name) if name == "ghost"));
    }

    #[tokio::test]
    async fn test_chain_of_chains() {
        let mut functions = FunctionRegistry::new();
        functions.register("inner_fn", |_args, _ctx| async move { Ok("inner".to_string()) });

        let registry = registry_with(vec![
            function_tool("leaf", "inner_fn"),
            chain_tool("inner", &["leaf"], ChainMode::Sequential, ChainErrorHandling::Stop),
            chain_tool("outer", &["inner"], ChainMode::Sequential, ChainErrorHandling::Stop),
        ])
        .await;

        let dispatcher = dispatcher_with(registry.clone(), Arc::new(functions));
        let chain = registry.get("outer").await.unwrap();
        let result = dispatcher.dispatch(&chain, &serde_json::json!({})).await.unwrap();

        assert!(!result.is_error);
        assert!(result.combined_text().contains("inner"));
    }
}
