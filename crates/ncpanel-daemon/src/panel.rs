//! Panel loop: session events in, frames out
//!
//! Consumes the connection manager's events in emission order, keeps the
//! latest snapshot while a session is live, and asks the renderer for a frame
//! after every event and on a short tick so the indicator keeps blinking with
//! static telemetry. A display failure ends the loop with an error.

use chrono::Utc;
use ncpanel_core::shutdown::{stopped, StopReceiver};
use ncpanel_core::{Address, ConnectionState, SessionEvent, TelemetrySnapshot};
use ncpanel_display::{DisplayError, Renderer};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::state::{PanelView, ViewSender};

/// Re-render cadence between events; finer than the 1 s blink phase
pub const REFRESH_INTERVAL: Duration = Duration::from_millis(250);

pub struct PanelLoop {
    renderer: Renderer,
    view: ViewSender,
    state: ConnectionState,
    address: Option<Address>,
    snapshot: Option<Arc<TelemetrySnapshot>>,
    connects: u64,
}

impl PanelLoop {
    pub fn new(renderer: Renderer, view: ViewSender) -> Self {
        Self {
            renderer,
            view,
            state: ConnectionState::Idle,
            address: None,
            snapshot: None,
            connects: 0,
        }
    }

    /// Run until stopped or the event stream ends, then blank the panel
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<SessionEvent>,
        mut stop: StopReceiver,
    ) -> Result<(), DisplayError> {
        self.draw()?;

        let mut refresh = tokio::time::interval(REFRESH_INTERVAL);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = stopped(&mut stop) => break,
                event = events.recv() => match event {
                    Some(event) => self.apply(event)?,
                    None => {
                        debug!("Session event stream closed");
                        break;
                    }
                },
                _ = refresh.tick() => self.draw()?,
            }
        }

        info!("Clearing display");
        self.renderer.clear()
    }

    fn apply(&mut self, event: SessionEvent) -> Result<(), DisplayError> {
        match event {
            SessionEvent::Telemetry(snapshot) => {
                if self.state.is_connected() {
                    self.snapshot = Some(snapshot);
                }
            }
            SessionEvent::ConnectionChanged { state, address } => {
                if state.is_connected() {
                    self.connects += 1;
                } else {
                    self.snapshot = None;
                }
                self.state = state;
                if address.is_some() {
                    self.address = address;
                }
            }
        }
        self.publish();
        self.draw()
    }

    fn draw(&mut self) -> Result<(), DisplayError> {
        self.renderer
            .render(self.snapshot.as_deref(), self.state, self.address.as_ref())
            .map(|_| ())
    }

    fn publish(&self) {
        let view = PanelView {
            connection: self.state,
            address: self.address.as_ref().map(Address::to_string),
            telemetry: self.snapshot.as_deref().cloned(),
            reconnections: self.connects.saturating_sub(1),
            updated_at: Utc::now(),
        };
        self.view.send_replace(view);
    }
}
