//! WebSocket transport abstraction.
//!
//! The session drives a [`WsConnection`] obtained from a [`WsTransport`];
//! tests substitute a channel-backed mock, production uses
//! [`TungsteniteWsTransport`]. STOMP frames travel as WebSocket text
//! messages; ping, pong, and binary messages are transport noise the
//! connection filters out.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// WebSocket transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WsError {
    /// The WebSocket could not be opened.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// The connection failed mid-exchange.
    #[error("websocket i/o error: {0}")]
    Io(String),
}

/// An open WebSocket carrying STOMP text frames.
#[async_trait(?Send)]
pub trait WsConnection {
    /// Send one text message.
    async fn send_text(&mut self, text: String) -> Result<(), WsError>;

    /// Receive the next text message.
    ///
    /// Returns `None` when the connection is closed. Non-text messages are
    /// skipped.
    async fn next_text(&mut self) -> Option<Result<String, WsError>>;

    /// Close the connection, best-effort.
    async fn close(&mut self);
}

/// Provider trait for opening WebSocket connections.
#[async_trait(?Send)]
pub trait WsTransport: Clone {
    /// The connection type this transport produces.
    type Connection: WsConnection;

    /// Open a WebSocket to the given URL.
    async fn connect(&self, url: &str) -> Result<Self::Connection, WsError>;
}

/// Production transport over tokio-tungstenite.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteWsTransport;

/// Connection wrapper over a tungstenite WebSocket stream.
pub struct TungsteniteConnection {
    inner: WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

#[async_trait(?Send)]
impl WsTransport for TungsteniteWsTransport {
    type Connection = TungsteniteConnection;

    async fn connect(&self, url: &str) -> Result<Self::Connection, WsError> {
        let (inner, _response) = connect_async(url)
            .await
            .map_err(|e| WsError::ConnectFailed(e.to_string()))?;
        Ok(TungsteniteConnection { inner })
    }
}

#[async_trait(?Send)]
impl WsConnection for TungsteniteConnection {
    async fn send_text(&mut self, text: String) -> Result<(), WsError> {
        self.inner
            .send(Message::Text(text))
            .await
            .map_err(|e| WsError::Io(e.to_string()))
    }

    async fn next_text(&mut self) -> Option<Result<String, WsError>> {
        loop {
            match self.inner.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(_)) => return None,
                // Pings are answered by tungstenite itself; binary frames are
                // not part of the dashboard protocol.
                Ok(_) => continue,
                Err(e) => return Some(Err(WsError::Io(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.inner.close(None).await;
    }
}
