//! Error types for the STOMP session.

use crate::frame::FrameError;
use thiserror::Error;

/// Errors surfaced by the session's public API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StompError {
    /// An operation that needs a live connection was attempted while
    /// disconnected.
    #[error("not connected")]
    NotConnected,

    /// A message body could not be serialized to JSON.
    #[error("serialization failed: {message}")]
    Serialization {
        /// Details about the serialization failure.
        message: String,
    },

    /// A frame could not be encoded or parsed.
    #[error(transparent)]
    Frame(#[from] FrameError),
}

impl From<serde_json::Error> for StompError {
    fn from(err: serde_json::Error) -> Self {
        StompError::Serialization {
            message: err.to_string(),
        }
    }
}
