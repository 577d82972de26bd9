//! WebSocket transport via tokio-tungstenite

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use ncpanel_core::Address;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use crate::transport::{Link, Received, SessionError, Transport};

/// Default WebSocket sub-path on the controller
pub const DEFAULT_WS_PATH: &str = "/ws";

/// Payload carried by liveness pings
const PING_PAYLOAD: &[u8] = b"ncpanel";

/// Connects to `ws://<host>:<port><path>`
#[derive(Debug, Clone)]
pub struct WsTransport {
    path: String,
    connect_timeout: Duration,
}

impl WsTransport {
    pub fn new(path: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            connect_timeout,
        }
    }
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new(DEFAULT_WS_PATH, Duration::from_secs(5))
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, address: &Address) -> Result<Box<dyn Link>, SessionError> {
        let url = address.ws_url(&self.path);
        let fail = |reason: String| SessionError::Connect {
            address: url.clone(),
            reason,
        };

        debug!(url = %url, "Opening WebSocket");
        let (stream, response) = tokio::time::timeout(self.connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| fail(format!("timed out after {:?}", self.connect_timeout)))?
            .map_err(|e| fail(e.to_string()))?;
        debug!(url = %url, status = %response.status(), "WebSocket handshake complete");

        Ok(Box::new(WsLink { stream }))
    }
}

struct WsLink {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Link for WsLink {
    async fn send_text(&mut self, text: &str) -> Result<(), SessionError> {
        self.stream
            .send(Message::Text(text.to_string()))
            .await
            .map_err(|e| SessionError::Send(e.to_string()))
    }

    async fn send_ping(&mut self) -> Result<(), SessionError> {
        self.stream
            .send(Message::Ping(PING_PAYLOAD.to_vec()))
            .await
            .map_err(|e| SessionError::Send(e.to_string()))
    }

    async fn recv(&mut self, timeout: Duration) -> Result<Received, SessionError> {
        let frame = match tokio::time::timeout(timeout, self.stream.next()).await {
            Err(_) => return Ok(Received::Timeout),
            Ok(None) => return Err(SessionError::Closed),
            Ok(Some(Err(e))) => return Err(SessionError::Receive(e.to_string())),
            Ok(Some(Ok(frame))) => frame,
        };

        match frame {
            Message::Text(text) => Ok(Received::Text(text)),
            // The controller sends status reports as binary frames.
            Message::Binary(bytes) => Ok(Received::Text(String::from_utf8_lossy(&bytes).into_owned())),
            Message::Pong(_) => Ok(Received::Pong),
            Message::Close(frame) => {
                debug!(frame = ?frame, "Controller closed the WebSocket");
                Err(SessionError::Closed)
            }
            other => {
                trace!(frame = ?other, "Ignoring frame");
                Ok(Received::Other)
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            trace!(error = %e, "WebSocket close");
        }
    }
}
