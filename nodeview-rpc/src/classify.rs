//! Response classification shared by the single-call and batch paths.
//!
//! This is the decision core of the client. Success-shaped bodies resolve or
//! become [`RpcError::Server`]; failure-shaped exchanges are mapped to an
//! error by HTTP status. The status is carried as `i32` so the two
//! no-response cases get the sentinel codes browsers use: `0` for a refused
//! connection, `-1` for a timeout or cancellation.

use crate::error::RpcError;
use nodeview_core::{ErrorObject, JSONRPC_VERSION};
use serde_json::Value;

/// Sentinel status for a connection that was never established.
pub(crate) const STATUS_REFUSED: i32 = 0;

/// Sentinel status for a timed-out or cancelled exchange.
pub(crate) const STATUS_TIMEOUT: i32 = -1;

/// Classify a failure-shaped exchange by status code and body.
pub(crate) fn classify_failure(status: i32, body: &str, url: &str) -> RpcError {
    match status {
        STATUS_REFUSED => RpcError::transport(format!("Connection refused at {url}")),
        404 => RpcError::transport(format!("404 not found at {url}")),
        500 => {
            // Heuristic, best-effort: a 500 whose body is a JSON-RPC document
            // means the server itself was reached and answered with an
            // application error. Anything else is infrastructure.
            if let Ok(value) = serde_json::from_str::<Value>(body) {
                if value.get("jsonrpc").and_then(Value::as_str) == Some(JSONRPC_VERSION) {
                    if let Some(error) = value.get("error") {
                        if let Ok(error) = serde_json::from_value::<ErrorObject>(error.clone()) {
                            return RpcError::server(error);
                        }
                    }
                }
            }
            RpcError::transport(format!("500 internal server error at {url}: {body}"))
        }
        STATUS_TIMEOUT => RpcError::transport("Timeout or cancelled"),
        other => RpcError::transport(format!(
            "Unknown error. HTTP status: {other}, data: {body}"
        )),
    }
}

/// Classify one success-shaped response entry.
///
/// A present `result` member resolves, even when its value is JSON `null`.
/// Otherwise the entry's `error` member becomes a server error; some backends
/// wrap JSON-RPC errors in a 200 response, so this path is routine.
pub(crate) fn classify_entry(entry: &Value) -> Result<Value, RpcError> {
    if let Some(result) = entry.get("result") {
        return Ok(result.clone());
    }
    let error = entry
        .get("error")
        .cloned()
        .and_then(|e| serde_json::from_value::<ErrorObject>(e).ok())
        .unwrap_or(ErrorObject {
            code: None,
            message: "response carried neither result nor error".to_string(),
            data: None,
        });
    Err(RpcError::server(error))
}

/// Parse a success-shaped body into a JSON value.
///
/// An empty body is rejected rather than silently resolved: a 200 with no
/// content means a proxy or other intermediary swallowed the JSON-RPC reply.
pub(crate) fn parse_success_body(body: &[u8], url: &str) -> Result<Value, RpcError> {
    let text = String::from_utf8_lossy(body);
    if text.trim().is_empty() {
        return Err(RpcError::transport(format!(
            "empty response body from {url}, check for a misconfigured proxy or intermediary"
        )));
    }
    serde_json::from_str(&text)
        .map_err(|e| RpcError::transport(format!("unparseable response from {url}: {e}")))
}
