//! JSON-RPC call dispatcher.

use std::cell::RefCell;
use std::collections::HashMap;

use nodeview_core::{
    RequestEnvelope, RequestIdAllocator, RpcConfig, ServerEndpoint, TimeError, TimeProvider,
    TokioTimeProvider, DEFAULT_SERVER_NAME,
};
use serde_json::Value;

use crate::classify::{classify_entry, classify_failure, parse_success_body, STATUS_REFUSED, STATUS_TIMEOUT};
use crate::error::RpcError;
use crate::http::{CallOptions, HttpError, HttpResponse, HttpTransport};
use crate::RpcBatch;

/// JSON-RPC 2.0 client over an [`HttpTransport`].
///
/// Owns the id allocator, the endpoint configuration, and the per-endpoint
/// header overrides; one instance is constructed per application session and
/// passed by reference to consumers. There is no ambient global state.
///
/// # Example
///
/// ```rust,ignore
/// let client = RpcClient::new(
///     HyperHttpTransport::new(),
///     TokioTimeProvider::new(),
///     RpcConfig::single_url("http://127.0.0.1:8545/rpc"),
/// );
/// let block = client.call_default("eth_blockNumber", json!([])).await?;
/// ```
pub struct RpcClient<H: HttpTransport, T: TimeProvider = TokioTimeProvider> {
    transport: H,
    time: T,
    config: RpcConfig,
    ids: RequestIdAllocator,
    /// Per-endpoint header overlays set via [`RpcClient::set_headers`].
    overrides: RefCell<HashMap<String, HashMap<String, String>>>,
}

impl<H: HttpTransport, T: TimeProvider> RpcClient<H, T> {
    /// Create a client over the given transport, time provider, and endpoints.
    pub fn new(transport: H, time: T, config: RpcConfig) -> Self {
        Self {
            transport,
            time,
            config,
            ids: RequestIdAllocator::new(),
            overrides: RefCell::new(HashMap::new()),
        }
    }

    /// Set an override header map for one endpoint.
    ///
    /// Overrides win over the endpoint's configured headers on key conflict;
    /// `Content-Type: application/json` is forced regardless.
    pub fn set_headers(&self, server: &str, headers: HashMap<String, String>) {
        self.overrides
            .borrow_mut()
            .insert(server.to_string(), headers);
    }

    /// Call a method on the default endpoint.
    pub async fn call_default(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        self.call(DEFAULT_SERVER_NAME, method, params).await
    }

    /// Call a method on a named endpoint.
    pub async fn call(&self, server: &str, method: &str, params: Value) -> Result<Value, RpcError> {
        self.call_with_options(server, method, params, CallOptions::default())
            .await
    }

    /// Call a method with per-call transport options.
    pub async fn call_with_options(
        &self,
        server: &str,
        method: &str,
        params: Value,
        options: CallOptions,
    ) -> Result<Value, RpcError> {
        let endpoint = self.config.find(server)?;
        let id = self.ids.next_id();
        let envelope = RequestEnvelope::new(id, method, params);
        let body = serde_json::to_vec(&envelope)
            .map_err(|e| RpcError::transport(format!("failed to encode request: {e}")))?;
        tracing::debug!(server, method, id, "dispatching JSON-RPC call");
        let value = self.exchange(endpoint, body, &options).await?;
        classify_entry(&value)
    }

    /// Call a method and return the raw HTTP response without classification.
    ///
    /// For callers that want to inspect status and body themselves. Config
    /// errors and failures to complete the exchange still surface as errors.
    pub async fn call_raw(
        &self,
        server: &str,
        method: &str,
        params: Value,
        options: CallOptions,
    ) -> Result<HttpResponse, RpcError> {
        let endpoint = self.config.find(server)?;
        let id = self.ids.next_id();
        let envelope = RequestEnvelope::new(id, method, params);
        let body = serde_json::to_vec(&envelope)
            .map_err(|e| RpcError::transport(format!("failed to encode request: {e}")))?;
        self.post(endpoint, body, &options)
            .await
            .map_err(|e| RpcError::transport(e.to_string()))
    }

    /// Start a batch scoped to a named endpoint.
    ///
    /// Nothing is sent until [`RpcBatch::send`] is called.
    pub fn batch(&self, server: &str) -> RpcBatch<'_, H, T> {
        RpcBatch::new(self, server)
    }

    pub(crate) fn config(&self) -> &RpcConfig {
        &self.config
    }

    pub(crate) fn ids(&self) -> &RequestIdAllocator {
        &self.ids
    }

    /// POST a payload and normalize it to a parsed success-shaped JSON value.
    ///
    /// All failure shapes are classified here, once, for both the single-call
    /// and batch paths.
    pub(crate) async fn exchange(
        &self,
        endpoint: &ServerEndpoint,
        body: Vec<u8>,
        options: &CallOptions,
    ) -> Result<Value, RpcError> {
        let response = match self.post(endpoint, body, options).await {
            Ok(response) => response,
            // No response at all. Browsers report every network-level
            // failure as status 0 and timeouts as -1; the sentinels keep the
            // classification table keyed on one status axis.
            Err(HttpError::Refused) => {
                return Err(classify_failure(STATUS_REFUSED, "", &endpoint.url));
            }
            Err(HttpError::Io(message)) => {
                return Err(classify_failure(STATUS_REFUSED, &message, &endpoint.url));
            }
            Err(HttpError::Timeout) => {
                return Err(classify_failure(STATUS_TIMEOUT, "", &endpoint.url));
            }
        };
        if !(200..300).contains(&response.status) {
            return Err(classify_failure(
                i32::from(response.status),
                &response.body_text(),
                &endpoint.url,
            ));
        }
        parse_success_body(&response.body, &endpoint.url)
    }

    async fn post(
        &self,
        endpoint: &ServerEndpoint,
        body: Vec<u8>,
        options: &CallOptions,
    ) -> Result<HttpResponse, HttpError> {
        let headers = self.effective_headers(endpoint);
        match options.timeout {
            Some(limit) => {
                match self
                    .time
                    .timeout(limit, self.transport.post(&endpoint.url, &headers, body))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(TimeError::Elapsed) => Err(HttpError::Timeout),
                }
            }
            None => self.transport.post(&endpoint.url, &headers, body).await,
        }
    }

    /// defaults ∪ endpoint headers ∪ per-endpoint overrides, content type last.
    fn effective_headers(&self, endpoint: &ServerEndpoint) -> HashMap<String, String> {
        let mut headers = endpoint.headers.clone();
        if let Some(overrides) = self.overrides.borrow().get(&endpoint.name) {
            headers.extend(overrides.clone());
        }
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers
    }
}
