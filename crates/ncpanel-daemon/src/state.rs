//! Shared view of the panel for the dashboard

use chrono::{DateTime, Utc};
use ncpanel_core::{ConnectionState, TelemetrySnapshot};
use serde::Serialize;
use tokio::sync::watch;

/// Latest state as published by the panel loop
#[derive(Debug, Clone, Serialize)]
pub struct PanelView {
    pub connection: ConnectionState,
    /// Controller address, once known
    pub address: Option<String>,
    /// Latest telemetry while connected
    pub telemetry: Option<TelemetrySnapshot>,
    /// Successful connects after the first one
    pub reconnections: u64,
    pub updated_at: DateTime<Utc>,
}

impl Default for PanelView {
    fn default() -> Self {
        Self {
            connection: ConnectionState::Idle,
            address: None,
            telemetry: None,
            reconnections: 0,
            updated_at: Utc::now(),
        }
    }
}

pub type ViewSender = watch::Sender<PanelView>;
pub type ViewReceiver = watch::Receiver<PanelView>;

pub fn view_channel() -> (ViewSender, ViewReceiver) {
    watch::channel(PanelView::default())
}
