//! Connection manager state machine
//!
//! ```text
//! Idle ──(no static address)──▶ Discovering ──ok──▶ Connecting ──ok──▶ Connected
//!   │                               │                   │                  │
//!   └──(static address)──▶ Connecting                   ▼                  ▼
//!                                 ▲ ◀──(static)──── Backoff ◀──── any failure
//!                 Discovering ◀───┘ (discovered)
//! ```
//!
//! The manager never jumps from Connected straight to Connecting: every lost
//! session passes through Backoff and waits the full retry delay.

use ncpanel_core::shutdown::{is_stopped, stopped, StopReceiver};
use ncpanel_core::{parse_status_line, Address, Clock, ConnectionState, SessionEvent};
use ncpanel_discovery::{Discovery, DiscoveryError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::retry::RetryPolicy;
use crate::transport::{Link, Received, SessionError, Transport};

/// Single-character status request understood by the controller
pub const STATUS_POLL: &str = "?";

/// Session timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Interval between status-poll requests
    pub poll_interval: Duration,
    /// Interval between keepalive pings
    pub keepalive_interval: Duration,
    /// Wait in Backoff before the next attempt
    pub retry_delay: Duration,
    /// Upper bound on each receive so timers stay responsive
    pub receive_timeout: Duration,
    /// Silence longer than this ends the session
    pub keepalive_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
            keepalive_interval: Duration::from_secs(5),
            retry_delay: Duration::from_secs(5),
            receive_timeout: Duration::from_millis(50),
            keepalive_grace: Duration::from_secs(15),
        }
    }
}

/// Where the controller address comes from
pub enum AddressSource {
    /// Fixed address from configuration; discovery is never run
    Static(Address),
    /// Browse for the controller advertised under `name`
    Discover { discovery: Discovery, name: String },
}

/// How a connected session ended
enum SessionEnd {
    Failed(SessionError),
    Stopped,
}

/// Owns the one live session and its [`ConnectionState`]
pub struct ConnectionManager {
    transport: Arc<dyn Transport>,
    source: AddressSource,
    config: SessionConfig,
    clock: Arc<dyn Clock>,
    events: mpsc::Sender<SessionEvent>,
    state: ConnectionState,
    address: Option<Address>,
    retry: RetryPolicy,
}

impl ConnectionManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        source: AddressSource,
        config: SessionConfig,
        clock: Arc<dyn Clock>,
        events: mpsc::Sender<SessionEvent>,
    ) -> Self {
        let address = match &source {
            AddressSource::Static(address) => Some(address.clone()),
            AddressSource::Discover { .. } => None,
        };
        let retry = RetryPolicy::new(config.retry_delay);
        Self {
            transport,
            source,
            config,
            clock,
            events,
            state: ConnectionState::Idle,
            address,
            retry,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Drive the state machine until a stop is requested.
    ///
    /// On stop the live session (if any) is closed and a final `Idle`
    /// state change is emitted.
    pub async fn run(mut self, mut stop: StopReceiver) {
        info!(state = %self.state, "Connection manager started");

        while !is_stopped(&stop) {
            let keep_going = match self.state {
                ConnectionState::Idle => {
                    let next = self.after_backoff();
                    self.transition(next).await;
                    true
                }
                ConnectionState::Discovering => self.discover(&mut stop).await,
                ConnectionState::Connecting => self.connect_and_serve(&mut stop).await,
                ConnectionState::Backoff => self.back_off(&mut stop).await,
                // Connected is only ever current inside `serve`.
                ConnectionState::Connected => {
                    self.transition(ConnectionState::Backoff).await;
                    true
                }
            };
            if !keep_going {
                break;
            }
        }

        self.transition(ConnectionState::Idle).await;
        info!("Connection manager stopped");
    }

    /// Next state once a wait is over: rediscover unless the address is static
    fn after_backoff(&self) -> ConnectionState {
        match self.source {
            AddressSource::Static(_) => ConnectionState::Connecting,
            AddressSource::Discover { .. } => ConnectionState::Discovering,
        }
    }

    async fn discover(&mut self, stop: &mut StopReceiver) -> bool {
        let AddressSource::Discover { discovery, name } = &self.source else {
            self.transition(ConnectionState::Connecting).await;
            return true;
        };

        self.retry.record_attempt(self.clock.now());
        let attempt = self.retry.attempts();
        debug!(name = %name, attempt, "Discovering");

        match discovery.discover(name, stop).await {
            Ok(address) => {
                self.address = Some(address);
                self.transition(ConnectionState::Connecting).await;
                true
            }
            Err(DiscoveryError::Cancelled) => false,
            Err(e) => {
                warn!(name = %name, attempt, error = %e, "Discovery failed");
                self.fail().await;
                true
            }
        }
    }

    async fn connect_and_serve(&mut self, stop: &mut StopReceiver) -> bool {
        let Some(address) = self.address.clone() else {
            self.transition(ConnectionState::Discovering).await;
            return true;
        };

        self.retry.record_attempt(self.clock.now());
        let attempt = self.retry.attempts();
        debug!(address = %address, attempt, "Connecting");

        let connected = tokio::select! {
            result = self.transport.connect(&address) => result,
            _ = stopped(stop) => return false,
        };

        let link = match connected {
            Ok(link) => link,
            Err(e) => {
                warn!(address = %address, attempt, error = %e, "Connection attempt failed");
                self.fail().await;
                return true;
            }
        };

        self.retry.record_success();
        info!(address = %address, attempt, "Connected to controller");
        self.transition(ConnectionState::Connected).await;

        match self.serve(link, stop).await {
            SessionEnd::Stopped => false,
            SessionEnd::Failed(e) => {
                warn!(address = %address, error = %e, "Session lost");
                self.fail().await;
                true
            }
        }
    }

    /// Cooperative loop for one live session. Always closes the link.
    async fn serve(&mut self, mut link: Box<dyn Link>, stop: &mut StopReceiver) -> SessionEnd {
        let end = self.pump(link.as_mut(), stop).await;
        link.close().await;
        end
    }

    async fn pump(&mut self, link: &mut dyn Link, stop: &mut StopReceiver) -> SessionEnd {
        if let Err(e) = link.send_text(STATUS_POLL).await {
            return SessionEnd::Failed(e);
        }

        let start = self.clock.now();
        let mut next_poll = start + self.config.poll_interval;
        let mut next_keepalive = start + self.config.keepalive_interval;
        let mut last_inbound = start;

        loop {
            if is_stopped(stop) {
                return SessionEnd::Stopped;
            }

            let now = self.clock.now();
            if now >= next_keepalive {
                trace!("Sending keepalive");
                if let Err(e) = link.send_ping().await {
                    return SessionEnd::Failed(e);
                }
                next_keepalive = now + self.config.keepalive_interval;
            }
            if now >= next_poll {
                if let Err(e) = link.send_text(STATUS_POLL).await {
                    return SessionEnd::Failed(e);
                }
                next_poll = now + self.config.poll_interval;
            }

            match link.recv(self.config.receive_timeout).await {
                Ok(Received::Text(text)) => {
                    last_inbound = self.clock.now();
                    for line in text.lines() {
                        if let Some(snapshot) = parse_status_line(line) {
                            self.emit(SessionEvent::Telemetry(Arc::new(snapshot))).await;
                        }
                    }
                }
                Ok(Received::Pong) | Ok(Received::Other) => last_inbound = self.clock.now(),
                Ok(Received::Timeout) => {}
                Err(e) => return SessionEnd::Failed(e),
            }

            let silent = self.clock.now().saturating_duration_since(last_inbound);
            if silent > self.config.keepalive_grace {
                return SessionEnd::Failed(SessionError::KeepaliveTimeout(silent));
            }
        }
    }

    async fn back_off(&mut self, stop: &mut StopReceiver) -> bool {
        let ready_at = self.retry.ready_at(self.clock.now());
        debug!(
            attempts = self.retry.attempts(),
            delay_ms = ready_at.saturating_duration_since(self.clock.now()).as_millis() as u64,
            "Backing off"
        );

        tokio::select! {
            _ = tokio::time::sleep_until(ready_at) => {}
            _ = stopped(stop) => return false,
        }

        let next = self.after_backoff();
        self.transition(next).await;
        true
    }

    async fn fail(&mut self) {
        self.retry.record_failure(self.clock.now());
        self.transition(ConnectionState::Backoff).await;
    }

    async fn transition(&mut self, next: ConnectionState) {
        if next == self.state {
            return;
        }
        // A discovered address is only good until the next rediscovery.
        if next == ConnectionState::Discovering {
            self.address = None;
        }
        info!(
            from = %self.state,
            to = %next,
            address = ?self.address.as_ref().map(|a| a.to_string()),
            attempts = self.retry.attempts(),
            "Connection state changed"
        );
        self.state = next;
        self.emit(SessionEvent::ConnectionChanged {
            state: next,
            address: self.address.clone(),
        })
        .await;
    }

    async fn emit(&self, event: SessionEvent) {
        if self.events.send(event).await.is_err() {
            trace!("No event subscriber");
        }
    }
}
