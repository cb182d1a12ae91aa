//! # nodeview-core
//!
//! Core abstractions shared by the nodeview dashboard client crates.
//!
//! This crate provides the pieces that both transports build on:
//!
//! - **Provider traits**: [`TimeProvider`] and [`TaskProvider`] abstract time
//!   and task spawning so the client crates can run against the real Tokio
//!   runtime in production and against controlled substitutes in tests.
//! - **Request ids**: [`RequestIdAllocator`] issues the monotonically
//!   increasing correlation ids that JSON-RPC responses are matched against.
//! - **Envelopes**: [`RequestEnvelope`] and [`ErrorObject`] model the
//!   JSON-RPC 2.0 wire shapes.
//! - **Configuration**: [`ServerEndpoint`] and [`RpcConfig`] describe the
//!   named JSON-RPC endpoints a client can talk to.
//! - **Topics**: [`Topic`] and [`AppDestination`] name the STOMP channels the
//!   node backend publishes telemetry on.
//! - **Telemetry**: typed payloads ([`MachineInfo`], [`BlockchainInfo`], ...)
//!   for the messages those topics carry.

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

mod config;
mod envelope;
mod id;
mod task;
mod telemetry;
mod time;
mod topics;

// Configuration exports
pub use config::{ConfigError, RpcConfig, ServerEndpoint, DEFAULT_SERVER_NAME};

// Envelope exports
pub use envelope::{ErrorObject, RequestEnvelope, JSONRPC_VERSION};

// Id allocation exports
pub use id::RequestIdAllocator;

// Provider trait exports
pub use task::{TaskProvider, TokioTaskProvider};
pub use time::{TimeError, TimeProvider, TokioTimeProvider};

// Topic exports
pub use topics::{AppDestination, Topic};

// Telemetry exports
pub use telemetry::{
    BlockInfo, BlockchainInfo, ConfirmedTransaction, InitialInfo, MachineInfo, NetworkInfo,
    PeerInfo, SyncStatus, WalletAddress, WalletInfo,
};
