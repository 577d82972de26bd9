//! Events emitted by the connection manager

use std::sync::Arc;

use crate::connection::{Address, ConnectionState};
use crate::telemetry::TelemetrySnapshot;

/// One item on the manager's event stream, delivered in emission order
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A decoded status report from the live session
    Telemetry(Arc<TelemetrySnapshot>),
    /// The manager moved to a new state
    ConnectionChanged {
        state: ConnectionState,
        /// Address in use (or being tried) when the change happened
        address: Option<Address>,
    },
}
