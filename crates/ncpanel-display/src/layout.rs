//! What to paint and where

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use ncpanel_core::{Address, ConnectionState, ControllerState, TelemetrySnapshot};
use serde::{Deserialize, Serialize};

/// Shown top-right whenever no live session exists
pub const DISCONNECTED: &str = "Disconnected";

/// Per-axis colors, X, Y, Z
pub const AXIS_COLORS: [Rgb888; 3] = [
    Rgb888::new(255, 80, 80),
    Rgb888::new(80, 255, 80),
    Rgb888::new(80, 160, 255),
];

const AXIS_LABELS: [char; 3] = ['X', 'Y', 'Z'];

pub const STATUS_COLOR: Rgb888 = Rgb888::new(160, 160, 160);
pub const INDICATOR_CONNECTED: Rgb888 = Rgb888::new(0, 255, 0);
pub const INDICATOR_DISCONNECTED: Rgb888 = Rgb888::new(255, 0, 0);

/// Connection indicator appearance for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    /// Connected, lit half of the blink period
    On,
    /// Connected, dark half of the blink period
    Off,
    /// Not connected: steady, no blink
    Solid,
}

impl Indicator {
    /// 2 s period while connected: lit on even seconds, dark on odd
    pub fn at(connected: bool, unix_seconds: i64) -> Self {
        match (connected, unix_seconds.rem_euclid(2) == 0) {
            (false, _) => Self::Solid,
            (true, true) => Self::On,
            (true, false) => Self::Off,
        }
    }

    pub fn color(&self) -> Rgb888 {
        match self {
            Self::On => INDICATOR_CONNECTED,
            Self::Off => Rgb888::BLACK,
            Self::Solid => INDICATOR_DISCONNECTED,
        }
    }
}

/// Everything the renderer paints, derived from its inputs and never stored
/// anywhere except as the renderer's previous-frame cache.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayFrame {
    /// State + coordinates key of the snapshot, if any
    pub key: Option<String>,
    /// Address or the disconnected literal
    pub status: String,
    pub connected: bool,
    /// Axis lines in X, Y, Z order
    pub axes: Option<[String; 3]>,
    pub state: Option<ControllerState>,
    pub indicator: Indicator,
}

impl DisplayFrame {
    pub fn compose(
        snapshot: Option<&TelemetrySnapshot>,
        connection: ConnectionState,
        address: Option<&Address>,
        unix_seconds: i64,
    ) -> Self {
        let connected = connection.is_connected();
        let status = match (connected, address) {
            (true, Some(address)) => address.host().to_string(),
            _ => DISCONNECTED.to_string(),
        };
        let axes = snapshot.map(|s| {
            let values = s.machine_position.to_array();
            [0, 1, 2].map(|i| format!("{} {:.2}", AXIS_LABELS[i], values[i]))
        });

        Self {
            key: snapshot.map(TelemetrySnapshot::display_key),
            status,
            connected,
            axes,
            state: snapshot.map(|s| s.state),
            indicator: Indicator::at(connected, unix_seconds),
        }
    }

    /// Same painted text, ignoring the indicator
    pub fn same_content(&self, other: &DisplayFrame) -> bool {
        self.key == other.key && self.status == other.status && self.connected == other.connected
    }
}

/// Color for the controller-state token
pub fn state_color(state: ControllerState) -> Rgb888 {
    match state {
        ControllerState::Run | ControllerState::Jog => Rgb888::new(0, 255, 0),
        ControllerState::Hold | ControllerState::Door => Rgb888::new(255, 200, 0),
        ControllerState::Alarm => Rgb888::new(255, 0, 0),
        ControllerState::Home => Rgb888::new(0, 200, 255),
        _ => Rgb888::WHITE,
    }
}

/// Panel geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub width: u32,
    pub height: u32,
    /// Side of the connection indicator square
    pub indicator_size: u32,
    /// Height of each axis row
    pub line_height: u32,
}

impl Layout {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            indicator_size: 3,
            line_height: 8,
        }
    }

    /// Top of the axis row at `index` (0 = X); rows fill the panel bottom-up
    /// so Z sits on the last line
    pub fn axis_row(&self, index: u32) -> i32 {
        self.height as i32 - (3 - index as i32) * self.line_height as i32
    }

    /// Width available for the status text right of the indicator
    pub fn status_width(&self) -> u32 {
        self.width.saturating_sub(self.indicator_size + 1)
    }

    pub fn indicator_origin(&self) -> Point {
        Point::zero()
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(64, 32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ncpanel_core::Axes;

    #[test]
    fn test_indicator_blink_period() {
        assert_eq!(Indicator::at(true, 100), Indicator::On);
        assert_eq!(Indicator::at(true, 101), Indicator::Off);
        assert_eq!(Indicator::at(true, 102), Indicator::On);
        assert_eq!(Indicator::at(false, 100), Indicator::Solid);
        assert_eq!(Indicator::at(false, 101), Indicator::Solid);
    }

    #[test]
    fn test_compose_connected() {
        let snapshot = TelemetrySnapshot::new(ControllerState::Run, Axes::new(1.0, -2.5, 10.126));
        let address = Address::new("192.168.1.40", 81);
        let frame = DisplayFrame::compose(Some(&snapshot), ConnectionState::Connected, Some(&address), 7);

        assert_eq!(frame.status, "192.168.1.40");
        assert!(frame.connected);
        assert_eq!(
            frame.axes,
            Some(["X 1.00".to_string(), "Y -2.50".to_string(), "Z 10.13".to_string()])
        );
        assert_eq!(frame.state, Some(ControllerState::Run));
        assert_eq!(frame.indicator, Indicator::Off);
    }

    #[test]
    fn test_compose_disconnected_hides_address() {
        let address = Address::new("192.168.1.40", 81);
        let frame = DisplayFrame::compose(None, ConnectionState::Backoff, Some(&address), 0);
        assert_eq!(frame.status, DISCONNECTED);
        assert_eq!(frame.axes, None);
        assert_eq!(frame.indicator, Indicator::Solid);
    }

    #[test]
    fn test_content_ignores_indicator() {
        let a = DisplayFrame::compose(None, ConnectionState::Connected, None, 0);
        let b = DisplayFrame::compose(None, ConnectionState::Connected, None, 1);
        assert_ne!(a, b);
        assert!(a.same_content(&b));
    }

    #[test]
    fn test_axis_rows_end_at_bottom() {
        let layout = Layout::default();
        assert_eq!(layout.axis_row(0), 8);
        assert_eq!(layout.axis_row(1), 16);
        assert_eq!(layout.axis_row(2), 24);
    }
}
