//! Generic HTTP handler
//!
//! Builds a request from static handler configuration plus call arguments:
//! method (GET turns the arguments into the query string, everything else
//! sends a JSON body), headers, auth scheme, an optional `{{var}}` body
//! template and an optional dotted-path response mapping. Failed attempts
//! are retried up to `retry_count` times with a fixed delay; timeouts and
//! non-2xx statuses are reported distinctly.

use std::time::Duration;

use toolgate_domain::tool::entities::{HttpAuth, HttpHandler, ResponseMapping};
use toolgate_domain::tool::value_objects::ToolCallResult;
use tracing::{debug, warn};

/// Default per-attempt timeout (30 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default delay between attempts (1 second)
const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Maximum response body characters carried into a diagnostic
const MAX_DIAGNOSTIC_BODY: usize = 512;

/// Execute one http-handler call, retries included
pub async fn execute(
    client: &reqwest::Client,
    config: &HttpHandler,
    arguments: &serde_json::Value,
) -> ToolCallResult {
    let method_name = config.method.as_deref().unwrap_or("POST").to_uppercase();
    let method: reqwest::Method = match method_name.parse() {
        Ok(method) => method,
        Err(_) => {
            return ToolCallResult::error(format!("Invalid HTTP method '{}'", method_name));
        }
    };

    let attempts = config.retry_count + 1;
    let delay = Duration::from_millis(config.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS));
    let mut last_diagnostic = String::new();

    for attempt in 1..=attempts {
        if attempt > 1 {
            tokio::time::sleep(delay).await;
        }
        debug!(url = %config.url, %method, attempt, "Sending HTTP handler request");

        match send_once(client, &method, config, arguments).await {
            Ok(result) => return result,
            Err(diagnostic) => {
                warn!(url = %config.url, attempt, %diagnostic, "HTTP handler attempt failed");
                last_diagnostic = diagnostic;
            }
        }
    }

    ToolCallResult::error(format!(
        "HTTP call to '{}' failed after {} attempt(s): {}",
        config.url, attempts, last_diagnostic
    ))
}

/// One attempt. `Err` is a retriable diagnostic; `Ok` ends the retry loop
/// (including mapped-failure error results, which are definitive responses).
async fn send_once(
    client: &reqwest::Client,
    method: &reqwest::Method,
    config: &HttpHandler,
    arguments: &serde_json::Value,
) -> Result<ToolCallResult, String> {
    let timeout = Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
    let mut request = client.request(method.clone(), &config.url).timeout(timeout);

    if *method == reqwest::Method::GET {
        request = request.query(&query_pairs(arguments));
    } else if let Some(template) = &config.body_template {
        request = request
            .header("Content-Type", "application/json")
            .body(substitute_template(template, arguments));
    } else {
        request = request.json(arguments);
    }

    for (name, value) in &config.headers {
        request = request.header(name, value);
    }
    request = match &config.auth {
        Some(HttpAuth::Bearer { token }) => request.bearer_auth(token),
        Some(HttpAuth::Basic { username, password }) => {
            request.basic_auth(username, Some(password))
        }
        Some(HttpAuth::ApiKey { key, header }) => {
            request.header(header.as_deref().unwrap_or("X-Api-Key"), key)
        }
        None => request,
    };

    let response = request.send().await.map_err(|error| {
        if error.is_timeout() {
            format!("timed out after {} seconds", timeout.as_secs())
        } else {
            format!("transport error: {}", error)
        }
    })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|error| format!("failed reading response body: {}", error))?;

    if !status.is_success() {
        return Err(format!("HTTP {}: {}", status.as_u16(), truncate(&body)));
    }

    Ok(map_response(config.response_mapping.as_ref(), &body))
}

/// Apply the optional dotted-path mapping to a successful response body
fn map_response(mapping: Option<&ResponseMapping>, body: &str) -> ToolCallResult {
    let Some(mapping) = mapping else {
        return ToolCallResult::text(body);
    };

    let parsed: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(error) => {
            return ToolCallResult::error(format!(
                "Response mapping requires JSON, got unparseable body: {}",
                error
            ));
        }
    };

    if let Some(path) = &mapping.success_path {
        let indicator = lookup_path(&parsed, path);
        if !indicator.map(is_truthy).unwrap_or(false) {
            return ToolCallResult::error(format!(
                "Upstream reported failure ('{}' not truthy): {}",
                path,
                truncate(body)
            ));
        }
    }

    match &mapping.data_path {
        Some(path) => match lookup_path(&parsed, path) {
            Some(value) => ToolCallResult::text(render_value(value)),
            None => ToolCallResult::error(format!(
                "Response path '{}' not found in: {}",
                path,
                truncate(body)
            )),
        },
        None => ToolCallResult::text(body),
    }
}

/// Replace each `{{key}}` with the matching argument value.
///
/// Strings are inserted raw; other values are inserted as JSON text.
pub(crate) fn substitute_template(template: &str, arguments: &serde_json::Value) -> String {
    let Some(object) = arguments.as_object() else {
        return template.to_string();
    };
    let mut rendered = template.to_string();
    for (key, value) in object {
        let placeholder = format!("{{{{{}}}}}", key);
        let replacement = match value {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        rendered = rendered.replace(&placeholder, &replacement);
    }
    rendered
}

/// Flatten an arguments object into query pairs for GET requests
pub(crate) fn query_pairs(arguments: &serde_json::Value) -> Vec<(String, String)> {
    let Some(object) = arguments.as_object() else {
        return Vec::new();
    };
    object
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                serde_json::Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            (key.clone(), rendered)
        })
        .collect()
}

/// Walk a dotted path through objects and numerically-indexed arrays
pub(crate) fn lookup_path<'a>(
    value: &'a serde_json::Value,
    path: &str,
) -> Option<&'a serde_json::Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            serde_json::Value::Object(map) => map.get(segment)?,
            serde_json::Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Truthiness of a success indicator field
pub(crate) fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(flag) => *flag,
        serde_json::Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        serde_json::Value::String(text) => {
            !text.is_empty() && text != "false" && text != "0"
        }
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    }
}

/// Render an extracted value as result text
fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(MAX_DIAGNOSTIC_BODY) {
        Some((index, _)) => &body[..index],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Minimal HTTP server answering every request with a fixed response;
    /// counts how many requests it saw
    async fn spawn_server(status_line: &'static str, body: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status_line,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        (format!("http://{}", addr), hits)
    }

    fn handler(url: String, retry_count: u32) -> HttpHandler {
        HttpHandler {
            url,
            method: None,
            headers: BTreeMap::new(),
            auth: None,
            body_template: None,
            response_mapping: None,
            retry_count,
            retry_delay_ms: Some(1),
            timeout_secs: Some(5),
        }
    }

    #[tokio::test]
    async fn test_success_returns_body() {
        let (url, hits) = spawn_server("200 OK", "15°C").await;
        let client = reqwest::Client::new();
        let result = execute(&client, &handler(url, 2), &serde_json::json!({ "city": "Paris" })).await;
        assert!(!result.is_error, "unexpected error: {}", result.combined_text());
        assert_eq!(result.first_text(), Some("15°C"));
        // A successful first attempt consumes no retries
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_count_bounds_total_attempts() {
        let (url, hits) = spawn_server("502 Bad Gateway", "upstream down").await;
        let client = reqwest::Client::new();
        let result = execute(&client, &handler(url, 2), &serde_json::json!({})).await;
        assert!(result.is_error);
        let text = result.combined_text();
        assert!(text.contains("3 attempt(s)"));
        assert!(text.contains("HTTP 502"));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_invalid_method_is_an_error_result() {
        let client = reqwest::Client::new();
        let mut config = handler("http://127.0.0.1:9/unused".to_string(), 0);
        config.method = Some("NOT A METHOD".to_string());
        let result = execute(&client, &config, &serde_json::json!({})).await;
        assert!(result.is_error);
    }

    #[test]
    fn test_substitute_template() {
        let args = serde_json::json!({ "city": "Tokyo", "days": 3, "metric": true });
        let rendered = substitute_template(
            r#"{"location": "{{city}}", "span": {{days}}, "metric": {{metric}}}"#,
            &args,
        );
        assert_eq!(rendered, r#"{"location": "Tokyo", "span": 3, "metric": true}"#);
    }

    #[test]
    fn test_substitute_leaves_unknown_placeholders() {
        let rendered = substitute_template("{{known}} {{unknown}}", &serde_json::json!({ "known": "x" }));
        assert_eq!(rendered, "x {{unknown}}");
    }

    #[test]
    fn test_query_pairs_renders_scalars() {
        let pairs = query_pairs(&serde_json::json!({ "q": "rust", "page": 2 }));
        assert!(pairs.contains(&("q".to_string(), "rust".to_string())));
        assert!(pairs.contains(&("page".to_string(), "2".to_string())));
    }

    #[test]
    fn test_lookup_path_objects_and_arrays() {
        let value = serde_json::json!({ "data": { "items": [ { "name": "first" } ] } });
        let found = lookup_path(&value, "data.items.0.name").unwrap();
        assert_eq!(found, "first");
        assert!(lookup_path(&value, "data.items.1").is_none());
        assert!(lookup_path(&value, "data.missing").is_none());
    }

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy(&serde_json::json!(true)));
        assert!(is_truthy(&serde_json::json!(1)));
        assert!(is_truthy(&serde_json::json!("ok")));
        assert!(!is_truthy(&serde_json::json!(false)));
        assert!(!is_truthy(&serde_json::json!(0)));
        assert!(!is_truthy(&serde_json::json!("")));
        assert!(!is_truthy(&serde_json::json!("false")));
        assert!(!is_truthy(&serde_json::Value::Null));
    }

    #[test]
    fn test_map_response_success_and_data_paths() {
        let mapping = ResponseMapping {
            success_path: Some("ok".to_string()),
            data_path: Some("data.answer".to_string()),
        };
        let result = map_response(Some(&mapping), r#"{"ok": true, "data": {"answer": "42"}}"#);
        assert!(!result.is_error);
        assert_eq!(result.first_text(), Some("42"));

        let failed = map_response(Some(&mapping), r#"{"ok": false, "data": {}}"#);
        assert!(failed.is_error);
    }

    #[test]
    fn test_map_response_without_mapping_returns_raw_body() {
        let result = map_response(None, "plain text body");
        assert!(!result.is_error);
        assert_eq!(result.first_text(), Some("plain text body"));
    }
}
