//! JSON-RPC batch aggregator.

use std::cell::RefCell;
use std::collections::HashMap;

use nodeview_core::{RequestEnvelope, TimeProvider};
use serde_json::Value;

use crate::classify::classify_entry;
use crate::client::RpcClient;
use crate::error::RpcError;
use crate::http::{CallOptions, HttpTransport};
use crate::reply::{reply_pair, ReplyFuture, ReplyPromise};

struct PendingCall {
    envelope: RequestEnvelope,
    promise: ReplyPromise,
}

/// Accumulates calls for one endpoint and sends them as a single array POST.
///
/// [`RpcBatch::add`] returns each caller's future immediately; nothing goes
/// on the wire until [`RpcBatch::send`]. The response array is demultiplexed
/// strictly by id, never by position: servers may answer out of order.
/// After `send` returns the batch is empty and reusable.
pub struct RpcBatch<'a, H: HttpTransport, T: TimeProvider> {
    client: &'a RpcClient<H, T>,
    server: String,
    pending: RefCell<Vec<PendingCall>>,
}

impl<'a, H: HttpTransport, T: TimeProvider> RpcBatch<'a, H, T> {
    pub(crate) fn new(client: &'a RpcClient<H, T>, server: &str) -> Self {
        Self {
            client,
            server: server.to_string(),
            pending: RefCell::new(Vec::new()),
        }
    }

    /// Queue a call and return its future.
    ///
    /// The id is allocated now, so ids across a batch (and across batches and
    /// single calls on the same client) stay strictly increasing.
    pub fn add(&self, method: &str, params: Value) -> ReplyFuture {
        let id = self.client.ids().next_id();
        let envelope = RequestEnvelope::new(id, method, params);
        let (promise, future) = reply_pair(id);
        self.pending
            .borrow_mut()
            .push(PendingCall { envelope, promise });
        future
    }

    /// Number of queued, unsent calls.
    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Whether the batch has no queued calls.
    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    /// POST the queued calls as one JSON array and settle every future.
    ///
    /// On any failure the shared classification applies once, with the
    /// failing endpoint's URL, and every pending future is rejected with it.
    /// Response entries whose id matches no pending call are dropped with a
    /// warning; pending calls the response never answers are rejected when
    /// their promises drop, so no caller hangs.
    pub async fn send(&self) -> Result<(), RpcError> {
        let pending: Vec<PendingCall> = self.pending.borrow_mut().drain(..).collect();
        if pending.is_empty() {
            return Ok(());
        }

        let endpoint = match self.client.config().find(&self.server) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                let error = RpcError::from(e);
                for call in pending {
                    call.promise.reject(error.clone());
                }
                return Err(error);
            }
        };

        let envelopes: Vec<&RequestEnvelope> = pending.iter().map(|c| &c.envelope).collect();
        let body = match serde_json::to_vec(&envelopes) {
            Ok(body) => body,
            Err(e) => {
                let error = RpcError::transport(format!("failed to encode batch: {e}"));
                for call in pending {
                    call.promise.reject(error.clone());
                }
                return Err(error);
            }
        };
        tracing::debug!(server = %self.server, calls = pending.len(), "sending JSON-RPC batch");

        let value = match self
            .client
            .exchange(endpoint, body, &CallOptions::default())
            .await
        {
            Ok(value) => value,
            Err(error) => {
                for call in pending {
                    call.promise.reject(error.clone());
                }
                return Err(error);
            }
        };

        let entries = match value.as_array() {
            Some(entries) => entries,
            None => {
                let error = RpcError::transport(format!(
                    "batch response from {} was not an array",
                    endpoint.url
                ));
                for call in pending {
                    call.promise.reject(error.clone());
                }
                return Err(error);
            }
        };

        let mut by_id: HashMap<u64, ReplyPromise> = pending
            .into_iter()
            .map(|call| {
                let id = call.promise.id();
                (id, call.promise)
            })
            .collect();

        for entry in entries {
            let Some(id) = entry.get("id").and_then(Value::as_u64) else {
                tracing::warn!("batch response entry without a usable id dropped");
                continue;
            };
            match by_id.remove(&id) {
                Some(promise) => match classify_entry(entry) {
                    Ok(result) => promise.resolve(result),
                    Err(error) => promise.reject(error),
                },
                // Observed server behavior tolerated: an id we never sent is
                // ignored rather than failing the whole batch.
                None => tracing::warn!(id, "batch response entry with unknown id dropped"),
            }
        }

        // Unanswered promises drop here and reject their futures.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpError, HttpResponse};
    use async_trait::async_trait;
    use nodeview_core::{RpcConfig, TokioTimeProvider};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct MockTransport {
        bodies: Rc<RefCell<Vec<Vec<u8>>>>,
        responses: Rc<RefCell<VecDeque<Result<HttpResponse, HttpError>>>>,
    }

    impl MockTransport {
        fn ok(&self, body: &str) {
            self.responses.borrow_mut().push_back(Ok(HttpResponse {
                status: 200,
                body: body.as_bytes().to_vec(),
            }));
        }
    }

    #[async_trait(?Send)]
    impl HttpTransport for MockTransport {
        async fn post(
            &self,
            _url: &str,
            _headers: &HashMap<String, String>,
            body: Vec<u8>,
        ) -> Result<HttpResponse, HttpError> {
            self.bodies.borrow_mut().push(body);
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or(Err(HttpError::Refused))
        }
    }

    fn client(transport: MockTransport) -> RpcClient<MockTransport> {
        RpcClient::new(
            transport,
            TokioTimeProvider::new(),
            RpcConfig::single_url("/rpc"),
        )
    }

    #[tokio::test]
    async fn batch_body_preserves_insertion_order() {
        let transport = MockTransport::default();
        transport.ok(r#"[{"id":1,"result":"A"},{"id":2,"result":"B"}]"#);
        let client = client(transport.clone());

        let batch = client.batch("main");
        let a = batch.add("a", json!([]));
        let b = batch.add("b", json!([]));
        batch.send().await.expect("send succeeds");

        let bodies = transport.bodies.borrow();
        let sent: Value = serde_json::from_slice(&bodies[0]).expect("json array");
        assert_eq!(sent[0]["method"], json!("a"));
        assert_eq!(sent[1]["method"], json!("b"));

        assert_eq!(a.await, Ok(json!("A")));
        assert_eq!(b.await, Ok(json!("B")));
    }

    #[tokio::test]
    async fn responses_demultiplex_by_id_not_position() {
        let transport = MockTransport::default();
        transport.ok(r#"[{"id":2,"result":"B"},{"id":1,"result":"A"}]"#);
        let client = client(transport);

        let batch = client.batch("main");
        let a = batch.add("a", json!([]));
        let b = batch.add("b", json!([]));
        batch.send().await.expect("send succeeds");

        assert_eq!(a.await, Ok(json!("A")));
        assert_eq!(b.await, Ok(json!("B")));
    }

    #[tokio::test]
    async fn unknown_response_id_is_dropped_and_pending_call_rejects() {
        // The server answers an id we never sent and skips id 1. The stray
        // entry is ignored; the unanswered call must still settle.
        let transport = MockTransport::default();
        transport.ok(r#"[{"id":99,"result":"stray"}]"#);
        let client = client(transport);

        let batch = client.batch("main");
        let a = batch.add("a", json!([]));
        batch.send().await.expect("send itself succeeds");

        let err = a.await.expect_err("unanswered call must reject");
        assert!(matches!(err, RpcError::Transport { .. }));
    }

    #[tokio::test]
    async fn failure_rejects_every_pending_call_with_shared_classification() {
        let transport = MockTransport::default();
        transport.responses.borrow_mut().push_back(Ok(HttpResponse {
            status: 404,
            body: Vec::new(),
        }));
        let client = client(transport);

        let batch = client.batch("main");
        let a = batch.add("a", json!([]));
        let b = batch.add("b", json!([]));
        let err = batch.send().await.expect_err("send must fail");

        assert_eq!(err, RpcError::transport("404 not found at /rpc"));
        assert_eq!(a.await, Err(err.clone()));
        assert_eq!(b.await, Err(err));
    }

    #[tokio::test]
    async fn unknown_server_rejects_before_any_io() {
        let transport = MockTransport::default();
        let client = client(transport.clone());

        let batch = client.batch("archive");
        let a = batch.add("a", json!([]));
        let err = batch.send().await.expect_err("send must fail");

        assert!(matches!(err, RpcError::Config(_)));
        assert!(matches!(a.await, Err(RpcError::Config(_))));
        assert!(transport.bodies.borrow().is_empty());
    }

    #[tokio::test]
    async fn batch_is_reusable_after_send() {
        let transport = MockTransport::default();
        transport.ok(r#"[{"id":1,"result":"A"}]"#);
        transport.ok(r#"[{"id":2,"result":"B"}]"#);
        let client = client(transport);

        let batch = client.batch("main");
        let a = batch.add("a", json!([]));
        batch.send().await.expect("first send");
        assert!(batch.is_empty());

        let b = batch.add("b", json!([]));
        batch.send().await.expect("second send");

        assert_eq!(a.await, Ok(json!("A")));
        assert_eq!(b.await, Ok(json!("B")));
    }

    #[tokio::test]
    async fn empty_batch_send_is_a_no_op() {
        let transport = MockTransport::default();
        let client = client(transport.clone());

        let batch = client.batch("main");
        batch.send().await.expect("empty send succeeds");
        assert!(transport.bodies.borrow().is_empty());
    }
}
