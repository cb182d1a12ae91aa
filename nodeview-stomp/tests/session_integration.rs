//! Integration tests for the STOMP session lifecycle.
//!
//! A scripted WebSocket transport plays the backend: it auto-answers the
//! CONNECT handshake, records every frame the client sends, and lets the
//! test push MESSAGE frames or kill the connection. Everything runs on a
//! `LocalSet`, matching the crate's single-threaded model.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use nodeview_core::{TokioTaskProvider, TokioTimeProvider, Topic};
use nodeview_stomp::{
    ConnectionEvent, MessageBody, SessionConfig, StompError, StompSession, WsConnection, WsError,
    WsTransport,
};
use serde_json::json;
use tokio::sync::mpsc;

/// End-of-stream sentinel the test server sends to simulate a dead socket.
const KILL: &str = "\u{4}";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

struct ServerHandle {
    to_client: mpsc::UnboundedSender<String>,
    sent: Rc<RefCell<Vec<String>>>,
}

impl ServerHandle {
    fn push(&self, frame: &str) {
        self.to_client
            .send(frame.to_string())
            .expect("connection still alive");
    }

    fn kill(&self) {
        let _ = self.to_client.send(KILL.to_string());
    }

    fn sent_frames(&self) -> Vec<String> {
        self.sent.borrow().clone()
    }

    fn count_with_prefix(&self, prefix: &str) -> usize {
        self.sent
            .borrow()
            .iter()
            .filter(|f| f.starts_with(prefix))
            .count()
    }
}

struct MockConnection {
    inbound: mpsc::UnboundedReceiver<String>,
    loopback: mpsc::UnboundedSender<String>,
    sent: Rc<RefCell<Vec<String>>>,
}

#[async_trait(?Send)]
impl WsConnection for MockConnection {
    async fn send_text(&mut self, text: String) -> Result<(), WsError> {
        self.sent.borrow_mut().push(text.clone());
        if text.starts_with("CONNECT\n") {
            let _ = self
                .loopback
                .send("CONNECTED\nversion:1.2\n\n\0".to_string());
        }
        Ok(())
    }

    async fn next_text(&mut self) -> Option<Result<String, WsError>> {
        match self.inbound.recv().await {
            Some(text) if text == KILL => None,
            Some(text) => Some(Ok(text)),
            None => None,
        }
    }

    async fn close(&mut self) {}
}

#[derive(Clone, Default)]
struct MockWsTransport {
    handles: Rc<RefCell<Vec<Rc<ServerHandle>>>>,
    fail_attempts: Rc<Cell<u32>>,
}

impl MockWsTransport {
    fn handle(&self, index: usize) -> Rc<ServerHandle> {
        self.handles.borrow()[index].clone()
    }

    fn connection_count(&self) -> usize {
        self.handles.borrow().len()
    }
}

#[async_trait(?Send)]
impl WsTransport for MockWsTransport {
    type Connection = MockConnection;

    async fn connect(&self, _url: &str) -> Result<MockConnection, WsError> {
        let remaining = self.fail_attempts.get();
        if remaining > 0 {
            self.fail_attempts.set(remaining - 1);
            return Err(WsError::ConnectFailed("scripted refusal".to_string()));
        }
        let (to_client, inbound) = mpsc::unbounded_channel();
        let sent = Rc::new(RefCell::new(Vec::new()));
        self.handles.borrow_mut().push(Rc::new(ServerHandle {
            to_client: to_client.clone(),
            sent: sent.clone(),
        }));
        Ok(MockConnection {
            inbound,
            loopback: to_client,
            sent,
        })
    }
}

fn config(reconnect: Duration) -> SessionConfig {
    SessionConfig::new("ws://127.0.0.1:8080/ws/websocket").with_reconnect_delay(reconnect)
}

fn session(transport: &MockWsTransport, reconnect: Duration) -> StompSession {
    StompSession::new(
        transport.clone(),
        TokioTimeProvider::new(),
        &TokioTaskProvider,
        config(reconnect),
    )
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn session_connects_and_handshakes() {
    init_tracing();
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let transport = MockWsTransport::default();
            let mut session = session(&transport, Duration::from_secs(10));
            settle().await;

            assert!(session.is_connected());
            assert!(!session.connection_lost_once());
            let server = transport.handle(0);
            let frames = server.sent_frames();
            assert!(frames[0].starts_with("CONNECT\n"));
            assert!(frames[0].contains("accept-version:1.2,1.1,1.0"));

            session.close().await;
        })
        .await;
}

#[tokio::test]
async fn toggle_subscribes_once_and_messages_reach_the_handler() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let transport = MockWsTransport::default();
            let mut session = session(&transport, Duration::from_secs(10));
            settle().await;

            let received: Rc<RefCell<Vec<MessageBody>>> = Rc::new(RefCell::new(Vec::new()));
            let sink = received.clone();
            let toggle = session.make_toggle(Topic::MachineInfo, move |body| {
                sink.borrow_mut().push(body);
            });

            toggle.set(true);
            toggle.set(true);
            settle().await;

            let server = transport.handle(0);
            assert_eq!(server.count_with_prefix("SUBSCRIBE\n"), 1);
            assert!(toggle.is_subscribed());

            server.push(
                "MESSAGE\ndestination:/topic/machineInfo\nsubscription:sub-1\n\n{\"cpuUsage\":2.5}\0",
            );
            settle().await;

            assert_eq!(
                *received.borrow(),
                vec![MessageBody::Json(json!({"cpuUsage": 2.5}))]
            );

            session.close().await;
        })
        .await;
}

#[tokio::test]
async fn init_action_runs_before_subscribe() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let transport = MockWsTransport::default();
            let mut session = session(&transport, Duration::from_secs(10));
            settle().await;

            let snapshots = Rc::new(Cell::new(0u32));
            let counter = snapshots.clone();
            let toggle = session.make_toggle_with_init(
                Topic::MachineInfo,
                |_| {},
                move || counter.set(counter.get() + 1),
            );

            toggle.set(true);
            settle().await;

            assert_eq!(snapshots.get(), 1);
            assert_eq!(transport.handle(0).count_with_prefix("SUBSCRIBE\n"), 1);

            session.close().await;
        })
        .await;
}

#[tokio::test]
async fn disconnect_invalidates_handles_without_unsubscribe_frames() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let transport = MockWsTransport::default();
            let mut session = session(&transport, Duration::from_secs(10));
            settle().await;

            let peers = session.make_toggle(Topic::Peers, |_| {});
            let logs = session.make_toggle(Topic::SystemLog, |_| {});
            peers.set(true);
            logs.set(true);
            settle().await;
            assert!(peers.is_subscribed());
            assert!(logs.is_subscribed());

            let server = transport.handle(0);
            server.kill();
            settle().await;

            assert!(!session.is_connected());
            assert!(session.connection_lost_once());
            assert!(!peers.is_subscribed());
            assert!(!logs.is_subscribed());
            assert_eq!(server.count_with_prefix("UNSUBSCRIBE\n"), 0);

            session.close().await;
        })
        .await;
}

#[tokio::test]
async fn reconnects_after_fixed_delay_and_reapplies_subscriptions() {
    init_tracing();
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let transport = MockWsTransport::default();
            let mut session = session(&transport, Duration::from_millis(100));
            settle().await;

            let events: Rc<RefCell<Vec<ConnectionEvent>>> = Rc::new(RefCell::new(Vec::new()));
            let log = events.clone();
            session.on_connection_event(move |event| log.borrow_mut().push(event));

            let peers = session.make_toggle(Topic::Peers, |_| {});
            peers.set(true);
            settle().await;

            transport.handle(0).kill();
            tokio::time::sleep(Duration::from_millis(300)).await;

            assert!(session.is_connected());
            assert_eq!(transport.connection_count(), 2);
            assert!(peers.is_subscribed());
            // The new connection re-subscribed without any toggle call.
            assert_eq!(transport.handle(1).count_with_prefix("SUBSCRIBE\n"), 1);
            assert_eq!(
                *events.borrow(),
                vec![
                    ConnectionEvent::Disconnected,
                    ConnectionEvent::Connected { reconnected: true }
                ]
            );

            session.close().await;
        })
        .await;
}

#[tokio::test]
async fn failed_attempt_retries_and_reports_reconnected() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let transport = MockWsTransport::default();
            transport.fail_attempts.set(1);

            let mut session = session(&transport, Duration::from_millis(100));
            tokio::time::sleep(Duration::from_millis(300)).await;

            assert!(session.is_connected());
            assert!(session.connection_lost_once());
            assert_eq!(transport.connection_count(), 1);

            session.close().await;
        })
        .await;
}

#[tokio::test]
async fn send_is_rejected_while_disconnected() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let transport = MockWsTransport::default();
            // Long reconnect delay keeps the session down after the kill.
            let mut session = session(&transport, Duration::from_secs(60));
            settle().await;

            session
                .send("/app/machineInfo", &json!({}))
                .expect("send while connected");
            settle().await;
            let frames = transport.handle(0).sent_frames();
            assert!(frames
                .iter()
                .any(|f| f.starts_with("SEND\n") && f.contains("destination:/app/machineInfo")));

            transport.handle(0).kill();
            settle().await;

            assert_eq!(
                session.send("/app/machineInfo", &json!({})),
                Err(StompError::NotConnected)
            );
            // The connected check comes first, even for a body that cannot
            // be serialized (tuple map keys have no JSON representation).
            let unserializable = std::collections::HashMap::from([((1u8, 2u8), 3u8)]);
            assert_eq!(
                session.send("/app/machineInfo", &unserializable),
                Err(StompError::NotConnected)
            );

            session.close().await;
        })
        .await;
}

#[tokio::test]
async fn system_log_text_bodies_pass_through_unparsed() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let transport = MockWsTransport::default();
            let mut session = session(&transport, Duration::from_secs(10));
            settle().await;

            let received: Rc<RefCell<Vec<MessageBody>>> = Rc::new(RefCell::new(Vec::new()));
            let sink = received.clone();
            let toggle = session.make_toggle(Topic::SystemLog, move |body| {
                sink.borrow_mut().push(body);
            });
            toggle.set(true);
            settle().await;

            transport.handle(0).push(
                "MESSAGE\ndestination:/topic/systemLog\nsubscription:sub-1\n\nINFO  block 42 imported\0",
            );
            settle().await;

            assert_eq!(
                *received.borrow(),
                vec![MessageBody::Text("INFO  block 42 imported".to_string())]
            );

            session.close().await;
        })
        .await;
}
