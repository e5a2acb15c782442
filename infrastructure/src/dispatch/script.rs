//! Script handler: interpreter subprocess
//!
//! The configured `script` is either a path to an existing script or inline
//! source; inline source is written to a temporary file that lives exactly
//! as long as the run. Arguments are always piped to stdin as JSON; payloads
//! small enough for the kernel's per-string environment limit are also
//! mirrored into the `TOOLGATE_ARGS` environment variable. On timeout the
//! subprocess is killed, not orphaned.

use std::io::Write;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use toolgate_domain::tool::entities::ScriptHandler;
use toolgate_domain::tool::value_objects::ToolCallResult;
use tracing::debug;

/// Default run timeout (30 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Scripts longer than this are treated as inline source even without a newline
const MAX_PATH_LENGTH: usize = 120;

/// Environment variable carrying the JSON-serialized call arguments
const ARGS_ENV_VAR: &str = "TOOLGATE_ARGS";

/// Arguments above this size are delivered over stdin only; a larger
/// environment entry would hit the kernel's per-string limit and the
/// interpreter would fail to spawn with E2BIG.
const MAX_ENV_ARGS_BYTES: usize = 64 * 1024;

/// Execute one script-handler call
pub async fn execute(config: &ScriptHandler, arguments: &serde_json::Value) -> ToolCallResult {
    let interpreter = config.interpreter.as_deref().unwrap_or("sh");
    let timeout_secs = config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
    let args_json = arguments.to_string();

    // Inline source gets a temp file; the guard removes it on every exit path.
    let mut _inline_guard = None;
    let script_path = if is_inline_source(&config.script) {
        let mut file = match tempfile::NamedTempFile::new() {
            Ok(file) => file,
            Err(error) => {
                return ToolCallResult::error(format!(
                    "Failed to create temporary script file: {}",
                    error
                ));
            }
        };
        if let Err(error) = file.write_all(config.script.as_bytes()) {
            return ToolCallResult::error(format!(
                "Failed to write temporary script file: {}",
                error
            ));
        }
        let path = file.path().to_path_buf();
        _inline_guard = Some(file);
        path
    } else {
        std::path::PathBuf::from(&config.script)
    };

    debug!(%interpreter, script = %script_path.display(), timeout_secs, "Running script handler");

    let mut command = Command::new(interpreter);
    command.arg(&script_path);
    if args_json.len() <= MAX_ENV_ARGS_BYTES {
        command.env(ARGS_ENV_VAR, &args_json);
    }
    command
        .envs(&config.env)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(error) => {
            return ToolCallResult::error(format!(
                "Failed to spawn interpreter '{}': {}",
                interpreter, error
            ));
        }
    };

    // The stdin write runs concurrently with the wait, inside the timeout.
    // A script that never reads stdin cannot stall the deadline once the
    // arguments outgrow the pipe buffer, and a script that exits early just
    // turns the write into an ignored broken-pipe error.
    let stdin = child.stdin.take();
    let feed_stdin = async move {
        if let Some(mut stdin) = stdin {
            let _ = stdin.write_all(args_json.as_bytes()).await;
            let _ = stdin.shutdown().await;
        }
    };
    let waited = tokio::time::timeout(Duration::from_secs(timeout_secs), async {
        let (_, output) = tokio::join!(feed_stdin, child.wait_with_output());
        output
    })
    .await;

    let output = match waited {
        Ok(Ok(output)) => output,
        Ok(Err(error)) => {
            return ToolCallResult::error(format!("Script execution failed: {}", error));
        }
        // Dropping the in-flight wait drops the child, which kills it.
        Err(_) => {
            return ToolCallResult::error(format!(
                "Script killed after exceeding {} second timeout",
                timeout_secs
            ));
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    if output.status.success() {
        return ToolCallResult::text(stdout.trim_end());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    ToolCallResult::error(format!(
        "Script exited with status {}: {}",
        output.status.code().unwrap_or(-1),
        if stderr.trim().is_empty() {
            stdout.trim_end()
        } else {
            stderr.trim_end()
        }
    ))
}

/// Inline source contains a newline or is too long to be a path
fn is_inline_source(script: &str) -> bool {
    script.contains('\n') || script.len() > MAX_PATH_LENGTH
}
