//! Error taxonomy for the JSON-RPC client.

use nodeview_core::{ConfigError, ErrorObject};
use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by calls and batches.
///
/// Three kinds, matching how the embedding UI reacts to them:
///
/// - [`RpcError::Config`]: programming or setup error (unknown endpoint name,
///   nothing configured). Surfaced before any I/O.
/// - [`RpcError::Transport`]: the request never reached the server, or the
///   response could not be interpreted as JSON-RPC. Recoverable by manual
///   retry.
/// - [`RpcError::Server`]: the server understood the request and returned an
///   application-level JSON-RPC error. Carries the server's `message` and
///   free-form `data`, which callers inspect to drive follow-up flows (e.g.
///   "Unlocked account is required").
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RpcError {
    /// Endpoint configuration misuse.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Request did not complete, or the reply was not JSON-RPC.
    #[error("{message}")]
    Transport {
        /// Human-readable description, includes the endpoint URL where known.
        message: String,
    },

    /// Application-level error returned by the server.
    #[error("{message}")]
    Server {
        /// The server's error message.
        message: String,
        /// The server's free-form error detail.
        data: Option<Value>,
    },
}

impl RpcError {
    /// Build a transport error from a message.
    pub fn transport(message: impl Into<String>) -> Self {
        RpcError::Transport {
            message: message.into(),
        }
    }

    /// Build a server error from a decoded JSON-RPC error object.
    pub fn server(error: ErrorObject) -> Self {
        RpcError::Server {
            message: error.message,
            data: error.data,
        }
    }
}
