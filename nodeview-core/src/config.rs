//! Named JSON-RPC endpoint configuration.
//!
//! A client is configured once at startup with either a single URL (which
//! becomes the default server) or a list of named servers, each with its own
//! base headers. The configuration is immutable afterwards; per-call header
//! overlays live on the client, not here.

use std::collections::HashMap;
use thiserror::Error;

/// Name given to the server created by [`RpcConfig::single_url`].
pub const DEFAULT_SERVER_NAME: &str = "main";

/// Errors from endpoint configuration and lookup.
///
/// These are always programming or setup errors and are surfaced before any
/// I/O happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No servers have been configured at all.
    #[error("no JSON-RPC servers configured")]
    NoServers,

    /// A lookup was made for a server name that was never configured.
    #[error("server \"{name}\" has not been configured")]
    UnknownServer {
        /// The name that failed to resolve.
        name: String,
    },
}

/// A named JSON-RPC endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerEndpoint {
    /// Unique key used to select this endpoint on each call.
    pub name: String,
    /// HTTP URL the envelopes are POSTed to.
    pub url: String,
    /// Base headers sent with every request to this endpoint.
    pub headers: HashMap<String, String>,
}

impl ServerEndpoint {
    /// Create an endpoint with no base headers.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            headers: HashMap::new(),
        }
    }

    /// Attach base headers to this endpoint.
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }
}

/// The full set of configured endpoints.
#[derive(Debug, Clone, Default)]
pub struct RpcConfig {
    servers: Vec<ServerEndpoint>,
}

impl RpcConfig {
    /// Configure a single endpoint under [`DEFAULT_SERVER_NAME`].
    pub fn single_url(url: impl Into<String>) -> Self {
        Self {
            servers: vec![ServerEndpoint::new(DEFAULT_SERVER_NAME, url)],
        }
    }

    /// Configure a list of named endpoints.
    pub fn with_servers(servers: Vec<ServerEndpoint>) -> Self {
        Self { servers }
    }

    /// Resolve an endpoint by name.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NoServers`] when nothing is configured,
    /// [`ConfigError::UnknownServer`] when the name does not match.
    pub fn find(&self, name: &str) -> Result<&ServerEndpoint, ConfigError> {
        if self.servers.is_empty() {
            return Err(ConfigError::NoServers);
        }
        self.servers
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ConfigError::UnknownServer {
                name: name.to_string(),
            })
    }

    /// All configured endpoints, in configuration order.
    pub fn servers(&self) -> &[ServerEndpoint] {
        &self.servers
    }
}
