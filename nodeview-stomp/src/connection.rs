//! Connection lifecycle controller.
//!
//! A [`StompSession`] owns a background connection task that opens the
//! WebSocket, performs the STOMP handshake, pumps frames in both directions,
//! and reconnects after a fixed delay when the connection dies. The
//! foreground API is synchronous: sends and subscription changes queue
//! frames and wake the task, following FoundationDB's writer-actor shape.
//!
//! Failure causes are deliberately not distinguished: DNS, refused, timeout
//! and mid-stream errors all route to the same reconnect loop.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use nodeview_core::{TaskProvider, TimeError, TimeProvider, Topic};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

use crate::error::StompError;
use crate::frame::{Frame, FrameCommand, FrameError};
use crate::subscription::{
    apply_subscribe, InitCallback, MessageBody, Registry, SubscriptionEntry, SubscriptionToggle,
};
use crate::transport::{WsConnection, WsError, WsTransport};

/// Connection state changes delivered to registered listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The STOMP handshake completed.
    Connected {
        /// True when the session had lost a connection (or failed an
        /// attempt) before; lets an embedder show "connection restored".
        reconnected: bool,
    },
    /// The connection failed, closed, or an attempt did not succeed.
    Disconnected,
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebSocket URL of the backend, e.g. `ws://127.0.0.1:8080/ws/websocket`.
    pub url: String,
    /// Value of the CONNECT frame's `host` header.
    pub virtual_host: String,
    /// Fixed delay between reconnect attempts. No backoff.
    pub reconnect_delay: Duration,
    /// Abort a connect + handshake attempt after this long.
    pub handshake_timeout: Duration,
}

impl SessionConfig {
    /// Configuration with default timing for the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let virtual_host = host_of(&url);
        Self {
            url,
            virtual_host,
            reconnect_delay: Duration::from_secs(5),
            handshake_timeout: Duration::from_secs(10),
        }
    }

    /// Override the reconnect delay.
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Override the handshake timeout.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }
}

/// Host portion of a ws:// or wss:// URL, for the CONNECT frame.
fn host_of(url: &str) -> String {
    let rest = url
        .strip_prefix("ws://")
        .or_else(|| url.strip_prefix("wss://"))
        .unwrap_or(url);
    let end = rest.find(['/', ':']).unwrap_or(rest.len());
    if end == 0 {
        "localhost".to_string()
    } else {
        rest[..end].to_string()
    }
}

pub(crate) type EventListener = Rc<dyn Fn(ConnectionEvent)>;

/// State shared between the session handle, its toggles, and the background
/// connection task.
pub(crate) struct SessionShared {
    /// Whether a handshaken connection is currently live.
    pub(crate) connected: bool,
    /// Set once the first connection is lost or an attempt fails.
    pub(crate) connection_lost_once: bool,
    /// Frames queued for the connection task to write.
    pub(crate) outbound: VecDeque<Frame>,
    /// Per-topic subscription table.
    pub(crate) registry: Registry,
    /// Connection event listeners.
    pub(crate) listeners: Vec<EventListener>,
}

impl SessionShared {
    pub(crate) fn new_shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            connected: false,
            connection_lost_once: false,
            outbound: VecDeque::new(),
            registry: Registry::new(),
            listeners: Vec::new(),
        }))
    }
}

/// STOMP session over a WebSocket transport.
///
/// Owns the subscription registry and the background connection task; one
/// instance per application session, passed by reference to consumers.
///
/// # Example
///
/// ```rust,ignore
/// let session = StompSession::new(
///     TungsteniteWsTransport,
///     TokioTimeProvider::new(),
///     &TokioTaskProvider,
///     SessionConfig::new("ws://127.0.0.1:8080/ws/websocket"),
/// );
/// let peers = session.make_toggle(Topic::Peers, |body| { /* render */ });
/// session.on_connection_event(move |event| {
///     if matches!(event, ConnectionEvent::Connected { .. }) {
///         peers.set(true);
///     }
/// });
/// ```
pub struct StompSession {
    shared: Rc<RefCell<SessionShared>>,
    outbound_notify: Rc<Notify>,
    shutdown_tx: mpsc::UnboundedSender<()>,
    task_handle: Option<JoinHandle<()>>,
}

impl StompSession {
    /// Create a session and start its connection task.
    ///
    /// The task begins connecting immediately and keeps retrying on the
    /// fixed delay for the life of the session.
    pub fn new<W, T, P>(transport: W, time: T, tasks: &P, config: SessionConfig) -> Self
    where
        W: WsTransport + 'static,
        T: TimeProvider + 'static,
        P: TaskProvider,
    {
        let shared = SessionShared::new_shared();
        let outbound_notify = Rc::new(Notify::new());
        let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();

        let task_handle = tasks.spawn_task(
            "stomp_connection",
            connection_task(
                transport,
                time,
                shared.clone(),
                outbound_notify.clone(),
                shutdown_rx,
                config,
            ),
        );

        Self {
            shared,
            outbound_notify,
            shutdown_tx,
            task_handle: Some(task_handle),
        }
    }

    /// Whether a handshaken connection is currently live.
    pub fn is_connected(&self) -> bool {
        self.shared.borrow().connected
    }

    /// Whether the session has ever lost a connection or failed an attempt.
    pub fn connection_lost_once(&self) -> bool {
        self.shared.borrow().connection_lost_once
    }

    /// Register a connection event listener.
    ///
    /// Listeners run on the session's event loop; this is where an embedder
    /// re-applies page subscriptions and fires one-shot snapshot requests.
    pub fn on_connection_event(&self, listener: impl Fn(ConnectionEvent) + 'static) {
        self.shared.borrow_mut().listeners.push(Rc::new(listener));
    }

    /// Register a topic handler and return its toggle.
    ///
    /// Registering a topic twice replaces its callbacks but keeps any live
    /// subscription: there is never more than one handle per topic.
    pub fn make_toggle(
        &self,
        topic: Topic,
        on_message: impl Fn(MessageBody) + 'static,
    ) -> SubscriptionToggle {
        self.register(topic, Rc::new(on_message), None)
    }

    /// Like [`StompSession::make_toggle`], with an init action that runs each
    /// time the subscription is (re-)established, before SUBSCRIBE is sent.
    pub fn make_toggle_with_init(
        &self,
        topic: Topic,
        on_message: impl Fn(MessageBody) + 'static,
        on_first_subscribe: impl Fn() + 'static,
    ) -> SubscriptionToggle {
        self.register(topic, Rc::new(on_message), Some(Rc::new(on_first_subscribe)))
    }

    fn register(
        &self,
        topic: Topic,
        on_message: Rc<dyn Fn(MessageBody)>,
        on_first_subscribe: Option<InitCallback>,
    ) -> SubscriptionToggle {
        let mut state = self.shared.borrow_mut();
        let entry = state
            .registry
            .entries
            .entry(topic)
            .or_insert(SubscriptionEntry {
                desired: false,
                handle: None,
                on_message: Rc::new(|_| {}),
                on_first_subscribe: None,
            });
        entry.on_message = on_message;
        entry.on_first_subscribe = on_first_subscribe;
        drop(state);
        SubscriptionToggle::new(self.shared.clone(), self.outbound_notify.clone(), topic)
    }

    /// Re-apply every subscription whose desired state is subscribed.
    ///
    /// A no-op while disconnected. The connection task calls the equivalent
    /// automatically after each successful handshake.
    pub fn apply_all(&self) {
        let topics = self.shared.borrow().registry.desired_topics();
        for topic in topics {
            apply_subscribe(&self.shared, &self.outbound_notify, topic);
        }
    }

    /// Send a JSON body to an application destination.
    ///
    /// # Errors
    ///
    /// [`StompError::NotConnected`] while disconnected;
    /// [`StompError::Serialization`] when the body cannot be encoded.
    pub fn send<B: Serialize>(&self, destination: &str, body: &B) -> Result<(), StompError> {
        {
            let mut state = self.shared.borrow_mut();
            if !state.connected {
                return Err(StompError::NotConnected);
            }
            let text = serde_json::to_string(body)?;
            state.outbound.push_back(Frame::send(destination, text));
        }
        self.outbound_notify.notify_one();
        Ok(())
    }

    /// Send a JSON body to a well-known application destination.
    pub fn send_app<B: Serialize>(
        &self,
        destination: nodeview_core::AppDestination,
        body: &B,
    ) -> Result<(), StompError> {
        self.send(destination.destination(), body)
    }

    /// Shut the session down: DISCONNECT, close the socket, stop the task.
    pub async fn close(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for StompSession {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
    }
}

#[derive(Debug, Error)]
enum HandshakeError {
    #[error(transparent)]
    Ws(#[from] WsError),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("server rejected handshake: {reason}")]
    Rejected { reason: String },
    #[error("connection closed during handshake")]
    Closed,
    #[error("handshake timed out")]
    TimedOut,
}

/// Background task owning the WebSocket connection.
///
/// Outer loop: one iteration per connection attempt. Inner loop: pump the
/// live connection until shutdown or loss. The connection is owned here
/// exclusively so no RefCell borrow is ever held across I/O.
async fn connection_task<W, T>(
    transport: W,
    time: T,
    shared: Rc<RefCell<SessionShared>>,
    outbound_notify: Rc<Notify>,
    mut shutdown_rx: mpsc::UnboundedReceiver<()>,
    config: SessionConfig,
) where
    W: WsTransport + 'static,
    T: TimeProvider + 'static,
{
    loop {
        let mut conn = tokio::select! {
            _ = shutdown_rx.recv() => return,
            result = establish(&transport, &time, &config) => match result {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!(error = %e, url = %config.url, "connection attempt failed");
                    handle_connection_loss(&shared);
                    tokio::select! {
                        _ = shutdown_rx.recv() => return,
                        _ = time.sleep(config.reconnect_delay) => {}
                    }
                    continue;
                }
            },
        };

        tracing::info!(url = %config.url, "stomp session connected");
        on_connected(&shared, &outbound_notify);

        let mut lost = false;
        while !lost {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    let _ = conn.send_text(Frame::disconnect().encode()).await;
                    conn.close().await;
                    handle_graceful_close(&shared);
                    return;
                }

                _ = outbound_notify.notified() => {
                    loop {
                        let frame = shared.borrow_mut().outbound.pop_front();
                        let Some(frame) = frame else { break };
                        if let Err(e) = conn.send_text(frame.encode()).await {
                            tracing::warn!(error = %e, "write failed");
                            lost = true;
                            break;
                        }
                    }
                }

                incoming = conn.next_text() => {
                    match incoming {
                        Some(Ok(text)) => {
                            // Lone EOL frames are heartbeats.
                            if text.trim_matches(|c| c == '\n' || c == '\r').is_empty() {
                                continue;
                            }
                            lost = handle_incoming(&shared, &text);
                        }
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "read failed");
                            lost = true;
                        }
                        None => {
                            tracing::debug!("connection closed by peer");
                            lost = true;
                        }
                    }
                }
            }
        }

        handle_connection_loss(&shared);
        tokio::select! {
            _ = shutdown_rx.recv() => return,
            _ = time.sleep(config.reconnect_delay) => {}
        }
    }
}

/// Open the WebSocket and complete the CONNECT/CONNECTED exchange.
async fn establish<W, T>(
    transport: &W,
    time: &T,
    config: &SessionConfig,
) -> Result<W::Connection, HandshakeError>
where
    W: WsTransport,
    T: TimeProvider,
{
    let handshake = async {
        let mut conn = transport.connect(&config.url).await?;
        conn.send_text(Frame::connect(&config.virtual_host).encode())
            .await?;
        loop {
            match conn.next_text().await {
                Some(Ok(text)) => {
                    if text.trim_matches(|c| c == '\n' || c == '\r').is_empty() {
                        continue;
                    }
                    let frame = Frame::parse(&text)?;
                    return match frame.command {
                        FrameCommand::Connected => Ok(conn),
                        FrameCommand::Error => Err(HandshakeError::Rejected { reason: frame.body }),
                        other => Err(HandshakeError::Rejected {
                            reason: format!("unexpected {other:?} frame"),
                        }),
                    };
                }
                Some(Err(e)) => return Err(HandshakeError::Ws(e)),
                None => return Err(HandshakeError::Closed),
            }
        }
    };
    match time.timeout(config.handshake_timeout, handshake).await {
        Ok(result) => result,
        Err(TimeError::Elapsed) => Err(HandshakeError::TimedOut),
    }
}

/// Flip to connected, notify listeners, re-materialize desired subscriptions.
fn on_connected(shared: &Rc<RefCell<SessionShared>>, outbound_notify: &Rc<Notify>) {
    let (listeners, reconnected) = {
        let mut state = shared.borrow_mut();
        state.connected = true;
        (state.listeners.clone(), state.connection_lost_once)
    };
    for listener in &listeners {
        listener(ConnectionEvent::Connected { reconnected });
    }
    let topics = shared.borrow().registry.desired_topics();
    for topic in topics {
        apply_subscribe(shared, outbound_notify, topic);
    }
}

/// Flip to disconnected after a failure: every handle is invalidated without
/// a remote UNSUBSCRIBE (the transport is already gone), queued frames are
/// dropped, listeners are notified.
fn handle_connection_loss(shared: &Rc<RefCell<SessionShared>>) {
    let listeners = {
        let mut state = shared.borrow_mut();
        state.connected = false;
        state.connection_lost_once = true;
        state.outbound.clear();
        state.registry.clear_handles();
        state.listeners.clone()
    };
    for listener in &listeners {
        listener(ConnectionEvent::Disconnected);
    }
}

/// Like [`handle_connection_loss`], but for a deliberate shutdown: the
/// lost-once flag stays untouched.
fn handle_graceful_close(shared: &Rc<RefCell<SessionShared>>) {
    let listeners = {
        let mut state = shared.borrow_mut();
        state.connected = false;
        state.outbound.clear();
        state.registry.clear_handles();
        state.listeners.clone()
    };
    for listener in &listeners {
        listener(ConnectionEvent::Disconnected);
    }
}

/// Handle one inbound frame. Returns true when the connection must be
/// considered lost.
fn handle_incoming(shared: &Rc<RefCell<SessionShared>>, text: &str) -> bool {
    let frame = match Frame::parse(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(error = %e, "undecodable frame dropped");
            return false;
        }
    };
    match frame.command {
        FrameCommand::Message => {
            dispatch_message(shared, &frame);
            false
        }
        FrameCommand::Error => {
            tracing::warn!(body = %frame.body, "server ERROR frame");
            true
        }
        other => {
            tracing::debug!(command = ?other, "ignoring frame");
            false
        }
    }
}

/// Route a MESSAGE frame to the handler of its topic.
fn dispatch_message(shared: &Rc<RefCell<SessionShared>>, frame: &Frame) {
    let Some(destination) = frame.get_header("destination") else {
        tracing::warn!("MESSAGE frame without destination dropped");
        return;
    };
    let Some(topic) = Topic::from_destination(destination) else {
        tracing::warn!(destination, "message for unknown destination dropped");
        return;
    };
    let handler = {
        let state = shared.borrow();
        state
            .registry
            .entries
            .get(&topic)
            .filter(|entry| entry.handle.is_some())
            .map(|entry| entry.on_message.clone())
    };
    match handler {
        Some(handler) => handler(MessageBody::parse(&frame.body)),
        None => tracing::debug!(topic = %topic, "message for inactive topic dropped"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_of_extracts_the_host() {
        assert_eq!(host_of("ws://127.0.0.1:8080/ws/websocket"), "127.0.0.1");
        assert_eq!(host_of("wss://node.example.com/ws"), "node.example.com");
        assert_eq!(host_of("ws://backend"), "backend");
        assert_eq!(host_of("ws://"), "localhost");
    }

    #[test]
    fn default_config_uses_fixed_five_second_reconnect() {
        let config = SessionConfig::new("ws://127.0.0.1:8080/ws");
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.virtual_host, "127.0.0.1");
    }
}
