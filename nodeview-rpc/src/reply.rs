//! Single-assignment promise/future pair used by the batch aggregator.
//!
//! `add` hands the caller a [`ReplyFuture`] immediately; `send` later settles
//! it through the matching [`ReplyPromise`]. If a promise is dropped without
//! being settled (the server's response array had no entry for its id), the
//! future is rejected with a transport error instead of pending forever.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::error::RpcError;
use serde_json::Value;

struct ReplyState {
    outcome: Option<Result<Value, RpcError>>,
    waker: Option<Waker>,
}

/// Settles the paired [`ReplyFuture`] exactly once.
///
/// # Single-Threaded
///
/// Uses `Rc<RefCell<>>` internally, not thread-safe.
pub struct ReplyPromise {
    state: Rc<RefCell<ReplyState>>,
    id: u64,
}

impl ReplyPromise {
    /// Resolve the paired future with a value.
    ///
    /// Consumes the promise, preventing double-settlement.
    pub fn resolve(self, value: Value) {
        self.settle(Ok(value));
    }

    /// Reject the paired future with an error.
    ///
    /// Consumes the promise, preventing double-settlement.
    pub fn reject(self, error: RpcError) {
        self.settle(Err(error));
    }

    /// The correlation id this promise answers for.
    pub fn id(&self) -> u64 {
        self.id
    }

    fn settle(&self, outcome: Result<Value, RpcError>) {
        let mut state = self.state.borrow_mut();
        if state.outcome.is_none() {
            state.outcome = Some(outcome);
            if let Some(waker) = state.waker.take() {
                waker.wake();
            }
        }
    }
}

impl Drop for ReplyPromise {
    fn drop(&mut self) {
        let unsettled = self.state.borrow().outcome.is_none();
        if unsettled {
            tracing::warn!(id = self.id, "reply promise dropped without settlement");
            self.settle(Err(RpcError::transport(format!(
                "no response received for request id {}",
                self.id
            ))));
        }
    }
}

/// Future resolving to the outcome of one batched call.
pub struct ReplyFuture {
    state: Rc<RefCell<ReplyState>>,
}

impl Future for ReplyFuture {
    type Output = Result<Value, RpcError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.state.borrow_mut();
        if let Some(outcome) = state.outcome.take() {
            return Poll::Ready(outcome);
        }
        state.waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

/// Create a linked promise/future pair for the given correlation id.
pub fn reply_pair(id: u64) -> (ReplyPromise, ReplyFuture) {
    let state = Rc::new(RefCell::new(ReplyState {
        outcome: None,
        waker: None,
    }));
    (
        ReplyPromise {
            state: state.clone(),
            id,
        },
        ReplyFuture { state },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn resolve_settles_the_future() {
        let (promise, future) = reply_pair(1);
        promise.resolve(json!("0x1"));
        assert_eq!(future.await, Ok(json!("0x1")));
    }

    #[tokio::test]
    async fn reject_settles_the_future() {
        let (promise, future) = reply_pair(2);
        promise.reject(RpcError::transport("boom"));
        assert_eq!(future.await, Err(RpcError::transport("boom")));
    }

    #[tokio::test]
    async fn dropped_promise_rejects_instead_of_hanging() {
        let (promise, future) = reply_pair(7);
        drop(promise);
        let err = future.await.expect_err("dropped promise must reject");
        match err {
            RpcError::Transport { message } => assert!(message.contains("request id 7")),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn settlement_before_await_is_not_lost() {
        let (promise, future) = reply_pair(3);
        promise.resolve(json!(42));
        // Future polled only after settlement.
        tokio::task::yield_now().await;
        assert_eq!(future.await, Ok(json!(42)));
    }
}
