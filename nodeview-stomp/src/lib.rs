//! # nodeview-stomp
//!
//! STOMP-over-WebSocket client for the nodeview dashboard: topic
//! subscriptions with toggle semantics, and a connection lifecycle
//! controller that reconnects on a fixed timer.
//!
//! ## Architecture
//!
//! - [`StompSession`]: owns the subscription registry and a background
//!   connection task; the foreground API queues frames and wakes the task.
//! - [`SubscriptionToggle`]: connects one topic's desired state to its
//!   live subscription; at most one handle per topic, no-op while
//!   disconnected.
//! - [`Frame`]: the STOMP frame codec for the commands the dashboard
//!   traffic uses.
//! - [`WsTransport`] / [`WsConnection`]: the WebSocket seam, with
//!   [`TungsteniteWsTransport`] as the production implementation.
//!
//! ## Single-Threaded
//!
//! One cooperative event loop: `Rc<RefCell<...>>` state shared between the
//! session handle, its toggles, and the connection task, which is spawned
//! with `spawn_local` via a `TaskProvider`.

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

mod connection;
mod error;
mod frame;
mod subscription;
mod transport;

pub use connection::{ConnectionEvent, SessionConfig, StompSession};
pub use error::StompError;
pub use frame::{Frame, FrameCommand, FrameError, ACCEPT_VERSION};
pub use subscription::{MessageBody, SubscriptionToggle};
pub use transport::{TungsteniteConnection, TungsteniteWsTransport, WsConnection, WsError, WsTransport};
