//! HTTP transport abstraction for the JSON-RPC client.
//!
//! The dispatcher never talks to a socket directly; it POSTs through
//! [`HttpTransport`] so integration tests can script responses. The real
//! implementation is [`crate::HyperHttpTransport`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Per-call options merged onto the outgoing request.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Abort the call if no response arrives within this duration.
    pub timeout: Option<Duration>,
}

impl CallOptions {
    /// Options with a timeout set.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// A completed HTTP exchange, success or not.
///
/// Non-2xx responses are returned here too, with their status and body
/// intact; only failures to complete the exchange at all become
/// [`HttpError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// The body decoded as UTF-8, lossily.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Failures where no HTTP response was obtained at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    /// TCP connect was refused or the host was unreachable.
    #[error("connection refused")]
    Refused,

    /// The exchange did not complete within the caller's timeout.
    #[error("timed out or cancelled")]
    Timeout,

    /// Any other I/O or protocol failure.
    #[error("http i/o error: {0}")]
    Io(String),
}

/// Provider trait for POSTing JSON-RPC payloads.
///
/// Single-threaded model: no `Send` bound, implementations may hold
/// `Rc<RefCell<...>>` state.
#[async_trait(?Send)]
pub trait HttpTransport {
    /// POST `body` to `url` with the given headers and return the response.
    async fn post(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: Vec<u8>,
    ) -> Result<HttpResponse, HttpError>;
}
