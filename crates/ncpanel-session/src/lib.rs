//! ncpanel Session - Connection manager for the controller's status stream
//!
//! The manager owns a single live session at a time. It resolves an address
//! (static or via discovery), connects, polls for status lines, keeps the
//! link alive, and backs off before reconnecting after any failure. Every
//! state change and every decoded status report goes out on one ordered
//! event channel.

pub mod manager;
pub mod retry;
pub mod transport;
pub mod websocket;

pub use manager::{AddressSource, ConnectionManager, SessionConfig};
pub use retry::RetryPolicy;
pub use transport::{Link, Received, SessionError, Transport};
pub use websocket::WsTransport;
