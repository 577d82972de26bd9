//! ncpanel Core - Telemetry types, status-line parsing and session events
//!
//! This crate provides the foundational types shared by the other ncpanel
//! crates:
//! - Controller telemetry decoded from status lines
//! - The status-line parser itself
//! - Connection state, controller address and the session event stream
//! - Clock abstraction for timer-driven behavior and the cooperative stop flag

pub mod clock;
pub mod connection;
pub mod event;
pub mod shutdown;
pub mod status;
pub mod telemetry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use connection::{Address, ConnectionState};
pub use event::SessionEvent;
pub use shutdown::{stop_channel, StopReceiver, StopSender};
pub use status::{decode_status_line, parse_status_line, StatusError};
pub use telemetry::{Axes, ControllerState, TelemetrySnapshot};
