//! Proxy handler: remote workflow platforms
//!
//! Invokes a workflow or bot hosted on an external platform (e.g. a Coze
//! workspace). The bearer token and default base URL come from the
//! credential resolver; static `params` from the handler configuration are
//! merged under the call arguments, with the call arguments winning on
//! conflicts. The provider's response envelope is unwrapped into plain text.

use std::time::Duration;

use toolgate_application::ports::credentials::CredentialResolverPort;
use toolgate_domain::tool::entities::ProxyHandler;
use toolgate_domain::tool::value_objects::ToolCallResult;
use tracing::debug;

/// Default request timeout (30 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Execute one proxy-handler call
pub async fn execute(
    client: &reqwest::Client,
    credentials: &dyn CredentialResolverPort,
    config: &ProxyHandler,
    arguments: &serde_json::Value,
) -> ToolCallResult {
    let Some(credential) = credentials.resolve(&config.platform) else {
        return ToolCallResult::error(format!(
            "No credential configured for platform '{}'",
            config.platform
        ));
    };

    let base_url = match config.base_url.as_deref().or(credential.base_url.as_deref()) {
        Some(base) => base.trim_end_matches('/').to_string(),
        None => {
            return ToolCallResult::error(format!(
                "No base URL configured for platform '{}'",
                config.platform
            ));
        }
    };

    let parameters = merge_parameters(config.params.as_ref(), arguments);
    let (endpoint, body) = match (&config.workflow_id, &config.bot_id) {
        (Some(workflow_id), _) => (
            format!("{}/v1/workflow/run", base_url),
            serde_json::json!({ "workflow_id": workflow_id, "parameters": parameters }),
        ),
        (None, Some(bot_id)) => (
            format!("{}/v1/bot/run", base_url),
            serde_json::json!({ "bot_id": bot_id, "parameters": parameters }),
        ),
        (None, None) => {
            return ToolCallResult::error(format!(
                "Proxy tool on platform '{}' has neither workflow_id nor bot_id",
                config.platform
            ));
        }
    };

    debug!(platform = %config.platform, %endpoint, "Calling proxy platform");

    let timeout = Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
    let mut request = client
        .post(&endpoint)
        .bearer_auth(&credential.token)
        .timeout(timeout)
        .json(&body);
    for (name, value) in &config.headers {
        request = request.header(name, value);
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(error) if error.is_timeout() => {
            return ToolCallResult::error(format!(
                "Proxy call to '{}' timed out after {} seconds",
                config.platform,
                timeout.as_secs()
            ));
        }
        Err(error) => {
            return ToolCallResult::error(format!(
                "Proxy call to '{}' failed: {}",
                config.platform, error
            ));
        }
    };

    let status = response.status();
    let body_text = match response.text().await {
        Ok(text) => text,
        Err(error) => {
            return ToolCallResult::error(format!(
                "Failed reading proxy response from '{}': {}",
                config.platform, error
            ));
        }
    };

    if !status.is_success() {
        return ToolCallResult::error(format!(
            "Proxy platform '{}' returned HTTP {}: {}",
            config.platform,
            status.as_u16(),
            body_text
        ));
    }

    unwrap_envelope(&config.platform, &body_text)
}

/// Static config params under the call arguments; call arguments win
pub(crate) fn merge_parameters(
    params: Option<&serde_json::Value>,
    arguments: &serde_json::Value,
) -> serde_json::Value {
    let mut merged = serde_json::Map::new();
    if let Some(serde_json::Value::Object(statics)) = params {
        merged.extend(statics.clone());
    }
    if let Some(call_args) = arguments.as_object() {
        merged.extend(call_args.clone());
    }
    serde_json::Value::Object(merged)
}

/// Unwrap the provider envelope into result text.
///
/// Recognized shapes, in order: an error `code`/`msg` pair, a `data` string,
/// a `data` object with an `output` or `content` string, any other `data`
/// value (re-serialized), then the raw body.
pub(crate) fn unwrap_envelope(platform: &str, body: &str) -> ToolCallResult {
    let Ok(parsed) = serde_json::from_str::<serde_json::Value>(body) else {
        return ToolCallResult::text(body);
    };

    if let Some(code) = parsed.get("code").and_then(serde_json::Value::as_i64) {
        if code != 0 {
            let message = parsed
                .get("msg")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("no message");
            return ToolCallResult::error(format!(
                "Proxy platform '{}' reported error code {}: {}",
                platform, code, message
            ));
        }
    }

    match parsed.get("data") {
        Some(serde_json::Value::String(text)) => ToolCallResult::text(text),
        Some(data @ serde_json::Value::Object(fields)) => {
            let inner = fields
                .get("output")
                .or_else(|| fields.get("content"))
                .and_then(serde_json::Value::as_str);
            match inner {
                Some(text) => ToolCallResult::text(text),
                None => ToolCallResult::text(data.to_string()),
            }
        }
        Some(data) => ToolCallResult::text(data.to_string()),
        None => ToolCallResult::text(body),
    }
}
