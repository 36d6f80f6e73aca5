use chromiumoxide::Page;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use hirebot_engine::backend::BackendError;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;

const HELPER_JS: &str = include_str!("page.js");

/// Default timeout for JavaScript evaluation.
/// Dialogs block the JS thread; this keeps a blocked page from hanging us.
pub const EVAL_TIMEOUT: Duration = Duration::from_secs(10);

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

/// Retry an async operation that may fail due to context errors during page navigation.
async fn retry_on_context_error<T, F, Fut>(
    operation_name: &str,
    mut operation: F,
) -> Result<T, BackendError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EvalError>>,
{
    let mut last_error = None;

    for attempt in 0..MAX_CONTEXT_RETRIES {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(EvalError::Context(err)) => {
                tracing::debug!(
                    "{} context error (attempt {}/{}), retrying...",
                    operation_name,
                    attempt + 1,
                    MAX_CONTEXT_RETRIES
                );
                last_error = Some(err);
                tokio::time::sleep(CONTEXT_RETRY_DELAY).await;
            }
            Err(EvalError::Timeout) => {
                return Err(BackendError::Timeout(format!(
                    "{} timed out, possibly blocked by a dialog",
                    operation_name
                )));
            }
            Err(EvalError::Other(err)) => {
                return Err(BackendError::Script(format!("{}: {}", operation_name, err)));
            }
        }
    }

    Err(BackendError::Script(last_error.unwrap_or_else(|| {
        format!("{} failed after retries", operation_name)
    })))
}

pub enum EvalError {
    Timeout,
    Context(String),
    Other(String),
}

async fn evaluate_with_timeout(
    page: &Page,
    expression: &str,
    timeout: Duration,
) -> Result<serde_json::Value, EvalError> {
    let params = EvaluateParams::builder()
        .expression(expression)
        .await_promise(true)
        .return_by_value(true)
        .build()
        .map_err(EvalError::Other)?;

    match tokio::time::timeout(timeout, page.evaluate_expression(params)).await {
        Err(_) => Err(EvalError::Timeout),
        Ok(Err(e)) => {
            let err_str = e.to_string();
            if is_context_error(&err_str) {
                Err(EvalError::Context(err_str))
            } else {
                Err(EvalError::Other(err_str))
            }
        }
        Ok(Ok(result)) => result
            .into_value::<serde_json::Value>()
            .map_err(|e| EvalError::Other(format!("Failed to get result: {}", e))),
    }
}

/// Installs the page helper unless this document already has it.
async fn try_inject_helper(page: &Page) -> Result<(), EvalError> {
    let loaded = evaluate_with_timeout(
        page,
        "typeof window.__hirebot !== 'undefined'",
        EVAL_TIMEOUT,
    )
    .await?;

    if loaded != serde_json::Value::Bool(true) {
        evaluate_with_timeout(page, HELPER_JS, EVAL_TIMEOUT).await?;
        tracing::debug!("Page helper injected");
    }
    Ok(())
}

/// Calls `window.__hirebot.<method>(args...)` in the page.
///
/// The helper is (re)injected first, since every navigation drops it.
pub async fn call_helper<T: DeserializeOwned>(
    page: &Page,
    method: &str,
    args: &[serde_json::Value],
    timeout: Duration,
) -> Result<T, BackendError> {
    let args = args
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()?
        .join(", ");
    let expression = format!("window.__hirebot.{}({})", method, args);
    tracing::trace!("Evaluating {}", expression);

    let expression = expression.as_str();
    let value = retry_on_context_error(method, move || async move {
        try_inject_helper(page).await?;
        evaluate_with_timeout(page, expression, timeout).await
    })
    .await?;

    Ok(serde_json::from_value(value)?)
}
