//! # nodeview-rpc
//!
//! JSON-RPC 2.0 client for the nodeview dashboard: single calls, batches,
//! and the shared response classification that turns HTTP outcomes into the
//! three-way error taxonomy (config / transport / server).
//!
//! ## Architecture
//!
//! - [`RpcClient`]: the dispatcher. Owns the id allocator, endpoint
//!   configuration, and per-endpoint header overrides; POSTs through an
//!   [`HttpTransport`].
//! - [`RpcBatch`]: accumulates calls and sends them as one array POST,
//!   demultiplexing the response strictly by id.
//! - [`ReplyPromise`] / [`ReplyFuture`]: single-assignment pair settling
//!   each batched call; a promise dropped unfulfilled rejects its future
//!   instead of letting it pend forever.
//! - [`HyperHttpTransport`]: the production transport over hyper 1.x.
//!
//! ## Single-Threaded
//!
//! Everything here assumes one cooperative event loop: `Rc<RefCell<...>>`
//! state, `async_trait(?Send)` traits, `spawn_local` for connection tasks.

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

mod batch;
mod classify;
mod client;
mod error;
mod http;
mod hyper_transport;
mod reply;

pub use batch::RpcBatch;
pub use client::RpcClient;
pub use error::RpcError;
pub use http::{CallOptions, HttpError, HttpResponse, HttpTransport};
pub use hyper_transport::HyperHttpTransport;
pub use reply::{reply_pair, ReplyFuture, ReplyPromise};
