//! JSON-RPC 2.0 wire shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The protocol version stamped on every outgoing request.
pub const JSONRPC_VERSION: &str = "2.0";

/// An outgoing JSON-RPC 2.0 request.
///
/// Serializes to `{"jsonrpc":"2.0","id":<n>,"method":"...","params":[...]}`.
/// Batches are plain JSON arrays of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Protocol version, always "2.0".
    pub jsonrpc: String,
    /// Correlation id, echoed back in the response.
    pub id: u64,
    /// Method name, e.g. `eth_blockNumber`.
    pub method: String,
    /// Positional or named parameters.
    pub params: Value,
}

impl RequestEnvelope {
    /// Build an envelope for the given id, method, and params.
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// The `error` member of a JSON-RPC response.
///
/// Servers in the wild are loose about this shape; `code` is optional and
/// `data` is free-form, so everything except `message` is tolerated missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    /// Numeric error code, when the server provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    /// Human-readable error message.
    #[serde(default)]
    pub message: String,
    /// Additional server-supplied detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_envelope_wire_shape() {
        let envelope = RequestEnvelope::new(7, "eth_blockNumber", json!([]));
        let encoded = serde_json::to_value(&envelope).expect("serialize");
        assert_eq!(
            encoded,
            json!({"jsonrpc": "2.0", "id": 7, "method": "eth_blockNumber", "params": []})
        );
    }

    #[test]
    fn error_object_tolerates_missing_code_and_data() {
        let error: ErrorObject =
            serde_json::from_value(json!({"message": "boom"})).expect("deserialize");
        assert_eq!(error.message, "boom");
        assert_eq!(error.code, None);
        assert_eq!(error.data, None);
    }

    #[test]
    fn error_object_keeps_data() {
        let error: ErrorObject = serde_json::from_value(
            json!({"code": -32000, "message": "Unlocked account is required", "data": {"address": "0xab"}}),
        )
        .expect("deserialize");
        assert_eq!(error.code, Some(-32000));
        assert_eq!(error.data, Some(json!({"address": "0xab"})));
    }
}
