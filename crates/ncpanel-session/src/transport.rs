//! Transport seam between the manager and the wire

use async_trait::async_trait;
use ncpanel_core::Address;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Failed to connect to {address}: {reason}")]
    Connect { address: String, reason: String },
    #[error("Send failed: {0}")]
    Send(String),
    #[error("Receive failed: {0}")]
    Receive(String),
    #[error("Connection closed by controller")]
    Closed,
    #[error("No traffic from controller for {0:?}")]
    KeepaliveTimeout(Duration),
}

/// Outcome of one bounded receive
#[derive(Debug, Clone, PartialEq)]
pub enum Received {
    /// Text payload; may hold several newline-separated lines
    Text(String),
    /// Reply to a keepalive ping
    Pong,
    /// Any other protocol frame (controller pings and the like)
    Other,
    /// Nothing arrived within the timeout
    Timeout,
}

/// Opens links to a controller address
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, address: &Address) -> Result<Box<dyn Link>, SessionError>;
}

/// One open, message-oriented duplex session
#[async_trait]
pub trait Link: Send {
    async fn send_text(&mut self, text: &str) -> Result<(), SessionError>;
    /// Protocol-level keepalive ping
    async fn send_ping(&mut self) -> Result<(), SessionError>;
    /// Wait at most `timeout` for the next frame. A timeout is not an error.
    async fn recv(&mut self, timeout: Duration) -> Result<Received, SessionError>;
    async fn close(&mut self);
}
