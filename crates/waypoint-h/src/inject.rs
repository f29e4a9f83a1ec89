use chromiumoxide::Page;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use waypoint_engine::surface::SurfaceError;
use waypoint_scanner::{INSTALLED_CHECK, SCANNER_JS};

/// Default timeout for JavaScript evaluation (10 seconds).
/// This prevents hanging when dialogs (alert/confirm/prompt) block the JS thread.
const EVAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum retries for context errors during page navigation.
const MAX_CONTEXT_RETRIES: u32 = 10;

/// Delay between retries when context is not found (page navigating).
const CONTEXT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Check if an error indicates the page context is unavailable (e.g., during navigation).
fn is_context_error(err: &str) -> bool {
    err.contains("Cannot find context")
        || err.contains("Execution context was destroyed")
        || err.contains("-32000")
}

/// Check if an error means the browser connection itself is gone.
pub(crate) fn is_disconnect_error(err: &str) -> bool {
    let lower = err.to_lowercase();
    lower.contains("channel closed")
        || lower.contains("connection closed")
        || lower.contains("receiver is gone")
        || lower.contains("websocket")
        || lower.contains("target closed")
}

/// Map a chromiumoxide failure onto the surface error taxonomy.
pub(crate) fn classify_error(err: impl std::fmt::Display) -> SurfaceError {
    let message = err.to_string();
    if is_disconnect_error(&message) {
        SurfaceError::Disconnected(message)
    } else {
        SurfaceError::Script(message)
    }
}

/// Retry an async operation that may fail due to context errors during page navigation.
/// Returns immediately on success or non-context errors; retries only on context errors.
async fn retry_on_context_error<T, F, Fut>(
    operation_name: &str,
    mut operation: F,
) -> Result<T, SurfaceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EvalError>>,
{
    let mut last_error = None;

    for attempt in 0..MAX_CONTEXT_RETRIES {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(EvalError::Context(err_str)) => {
                tracing::debug!(
                    "{} context error (attempt {}/{}), retrying...",
                    operation_name,
                    attempt + 1,
                    MAX_CONTEXT_RETRIES
                );
                last_error = Some(err_str);
                tokio::time::sleep(CONTEXT_RETRY_DELAY).await;
            }
            Err(EvalError::Timeout) => {
                return Err(SurfaceError::Timeout(format!(
                    "{} timed out - possibly blocked by a dialog (alert/confirm/prompt)",
                    operation_name
                )));
            }
            Err(EvalError::Other(err_str)) => return Err(classify_error(err_str)),
        }
    }

    Err(SurfaceError::Script(last_error.unwrap_or_else(|| {
        format!("{} failed after retries", operation_name)
    })))
}

pub async fn inject_scanner(page: &Page) -> Result<(), SurfaceError> {
    retry_on_context_error("Scanner injection", || try_inject_scanner(page)).await
}

/// Attempts scanner injection once.
async fn try_inject_scanner(page: &Page) -> Result<(), EvalError> {
    let is_loaded = evaluate_with_timeout(page, INSTALLED_CHECK)
        .await?
        .as_bool()
        .unwrap_or(false);

    if !is_loaded {
        evaluate_with_timeout(page, SCANNER_JS).await?;
    }

    Ok(())
}

#[derive(Debug, Deserialize)]
struct AgentResponse {
    ok: bool,
    #[serde(default)]
    data: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

/// Send one command to the in-page agent and unwrap its `{ok, data, error}` envelope.
pub async fn execute_command(
    page: &Page,
    command: serde_json::Value,
) -> Result<serde_json::Value, SurfaceError> {
    let expression = format!("window.Waypoint.process({})", serde_json::to_string(&command)?);

    tracing::trace!("Evaluating script: {}", expression);

    let expression = expression.as_str();
    let raw = retry_on_context_error("Agent command", move || async move {
        inject_scanner(page).await.map_err(|e| match e {
            SurfaceError::Timeout(_) => EvalError::Timeout,
            other => EvalError::Other(other.to_string()),
        })?;
        evaluate_with_timeout(page, expression).await
    })
    .await?;

    let response: AgentResponse = serde_json::from_value(raw)?;
    if response.ok {
        Ok(response.data)
    } else {
        Err(SurfaceError::Script(
            response
                .error
                .unwrap_or_else(|| "agent reported failure".to_string()),
        ))
    }
}

enum EvalError {
    Timeout,
    Context(String),
    Other(String),
}

async fn evaluate_with_timeout(
    page: &Page,
    expression: &str,
) -> Result<serde_json::Value, EvalError> {
    let eval_result = tokio::time::timeout(EVAL_TIMEOUT, page.evaluate(expression)).await;

    match eval_result {
        Err(_) => Err(EvalError::Timeout),
        Ok(Err(e)) => {
            let err_str = e.to_string();
            if is_context_error(&err_str) {
                Err(EvalError::Context(err_str))
            } else {
                Err(EvalError::Other(err_str))
            }
        }
        Ok(Ok(remote_object)) => Ok(remote_object
            .into_value::<serde_json::Value>()
            .unwrap_or(serde_json::Value::Null)),
    }
}
