//! Telemetry types decoded from controller status lines

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Write};

/// Controller state vocabulary reported as the first status-line segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControllerState {
    Idle,
    Run,
    Hold,
    Jog,
    Alarm,
    Door,
    Check,
    Home,
    Sleep,
}

impl ControllerState {
    pub const ALL: [ControllerState; 9] = [
        Self::Idle,
        Self::Run,
        Self::Hold,
        Self::Jog,
        Self::Alarm,
        Self::Door,
        Self::Check,
        Self::Home,
        Self::Sleep,
    ];

    /// Match a state token exactly (without any `:N` sub-code)
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == token)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Run => "Run",
            Self::Hold => "Hold",
            Self::Jog => "Jog",
            Self::Alarm => "Alarm",
            Self::Door => "Door",
            Self::Check => "Check",
            Self::Home => "Home",
            Self::Sleep => "Sleep",
        }
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A three-axis coordinate reading
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Axes {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Axes {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Values in X, Y, Z order
    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// One decoded status report.
///
/// `machine_position` is not optional: a line without `MPos` never becomes a
/// snapshot, so every value of this type is a valid one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub state: ControllerState,
    /// Sub-code attached to the state token, e.g. the `1` in `Door:1`
    pub substate: Option<u8>,
    pub machine_position: Axes,
    pub work_position: Option<Axes>,
    pub work_offset: Option<Axes>,
    pub feed_rate: Option<f64>,
    pub spindle_speed: Option<f64>,
    pub tool_number: Option<u32>,
    pub spindle_rpm: Option<f64>,
    /// Unrecognized `KEY:VALUE` segments, stored verbatim
    pub extra: BTreeMap<String, String>,
}

impl TelemetrySnapshot {
    /// Create a snapshot carrying only the mandatory fields
    pub fn new(state: ControllerState, machine_position: Axes) -> Self {
        Self {
            state,
            substate: None,
            machine_position,
            work_position: None,
            work_offset: None,
            feed_rate: None,
            spindle_speed: None,
            tool_number: None,
            spindle_rpm: None,
            extra: BTreeMap::new(),
        }
    }

    /// Text key used by the renderer to decide whether content changed
    pub fn display_key(&self) -> String {
        let p = self.machine_position;
        format!("{}|{:.3}|{:.3}|{:.3}", self.state, p.x, p.y, p.z)
    }

    /// Write the snapshot back in the controller's status-line grammar.
    ///
    /// Coordinates use three decimals, matching what the controller emits.
    pub fn to_status_line(&self) -> String {
        let mut line = String::from("<");
        line.push_str(self.state.as_str());
        if let Some(sub) = self.substate {
            let _ = write!(line, ":{}", sub);
        }
        push_axes(&mut line, "MPos", self.machine_position);
        if let Some(w) = self.work_position {
            push_axes(&mut line, "WPos", w);
        }
        if let Some(o) = self.work_offset {
            push_axes(&mut line, "WCO", o);
        }
        if let (Some(feed), Some(speed)) = (self.feed_rate, self.spindle_speed) {
            let _ = write!(line, "|FS:{},{}", feed, speed);
        }
        if let Some(tool) = self.tool_number {
            let _ = write!(line, "|T:{}", tool);
        }
        if let Some(rpm) = self.spindle_rpm {
            let _ = write!(line, "|S:{}", rpm);
        }
        for (key, value) in &self.extra {
            let _ = write!(line, "|{}:{}", key, value);
        }
        line.push('>');
        line
    }
}

fn push_axes(line: &mut String, key: &str, axes: Axes) {
    let _ = write!(line, "|{}:{:.3},{:.3},{:.3}", key, axes.x, axes.y, axes.z);
}
