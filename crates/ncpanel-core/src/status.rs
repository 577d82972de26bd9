//! Status-line protocol parser
//!
//! The controller reports its state as a single bracket-delimited line:
//!
//! ```text
//! <Idle|MPos:1.000,2.000,-3.500|FS:500,1000|WCO:0.000,0.000,0.000>
//! ```
//!
//! The first segment is the state token (optionally with a `:N` sub-code),
//! every following segment is `KEY:VALUE`. Anything that does not start with
//! a known state token (acks, pings, identification banners) is not a status
//! line and is ignored without error.

use thiserror::Error;
use tracing::{debug, trace};

use crate::telemetry::{Axes, ControllerState, TelemetrySnapshot};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatusError {
    #[error("Not a status line")]
    NotStatusLine,
    #[error("Status line has no MPos segment")]
    MissingMachinePosition,
    #[error("Invalid number in {key}: {value:?}")]
    InvalidNumber { key: String, value: String },
    #[error("{key} expects {expected} values, got {found}")]
    WrongArity {
        key: String,
        expected: usize,
        found: usize,
    },
}

/// Parse one inbound frame into a snapshot.
///
/// Returns `None` for non-status chatter, for lines without `MPos`, and for
/// lines where any numeric field fails to convert. A single bad number
/// rejects the whole line so stale and fresh coordinates never mix.
pub fn parse_status_line(raw: impl AsRef<[u8]>) -> Option<TelemetrySnapshot> {
    let raw = raw.as_ref();
    match decode_status_line(raw) {
        Ok(snapshot) => Some(snapshot),
        Err(StatusError::NotStatusLine) => {
            trace!(raw = %String::from_utf8_lossy(raw), "Ignoring non-status line");
            None
        }
        Err(e) => {
            debug!(raw = %String::from_utf8_lossy(raw), error = %e, "Dropping malformed status line");
            None
        }
    }
}

/// Parse one inbound frame, reporting why it was rejected
pub fn decode_status_line(raw: &[u8]) -> Result<TelemetrySnapshot, StatusError> {
    let text = String::from_utf8_lossy(raw);
    let line = normalize(&text);

    let mut segments = line.split('|');
    let head = segments.next().unwrap_or_default();
    let (state, substate) = parse_state(head)?;

    let mut machine_position = None;
    let mut snapshot = TelemetrySnapshot::new(state, Axes::default());
    snapshot.substate = substate;

    for segment in segments {
        let Some((key, value)) = segment.split_once(':') else {
            trace!(segment = %segment, "Skipping segment without a colon");
            continue;
        };
        match key {
            "MPos" => machine_position = Some(parse_axes(key, value)?),
            "WPos" => snapshot.work_position = Some(parse_axes(key, value)?),
            "WCO" => snapshot.work_offset = Some(parse_axes(key, value)?),
            "FS" => {
                let [feed, speed] = parse_floats::<2>(key, value)?;
                snapshot.feed_rate = Some(feed);
                snapshot.spindle_speed = Some(speed);
            }
            "T" => {
                let tool = value.trim().parse::<u32>().map_err(|_| invalid(key, value))?;
                snapshot.tool_number = Some(tool);
            }
            "S" => snapshot.spindle_rpm = Some(parse_float(key, value)?),
            _ => {
                snapshot.extra.insert(key.to_string(), value.to_string());
            }
        }
    }

    snapshot.machine_position = machine_position.ok_or(StatusError::MissingMachinePosition)?;
    Ok(snapshot)
}

/// Strip surrounding whitespace, control characters and angle brackets
fn normalize(text: &str) -> &str {
    let is_noise = |c: char| c.is_whitespace() || c.is_control();
    text.trim_matches(is_noise)
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim_matches(is_noise)
}

fn parse_state(head: &str) -> Result<(ControllerState, Option<u8>), StatusError> {
    let (token, sub) = match head.split_once(':') {
        Some((token, sub)) => (token, Some(sub)),
        None => (head, None),
    };
    let state = ControllerState::from_token(token).ok_or(StatusError::NotStatusLine)?;
    let substate = match sub {
        Some(sub) => Some(sub.trim().parse::<u8>().map_err(|_| invalid(token, sub))?),
        None => None,
    };
    Ok((state, substate))
}

fn parse_axes(key: &str, value: &str) -> Result<Axes, StatusError> {
    let [x, y, z] = parse_floats::<3>(key, value)?;
    Ok(Axes::new(x, y, z))
}

fn parse_floats<const N: usize>(key: &str, value: &str) -> Result<[f64; N], StatusError> {
    let parts: Vec<&str> = value.split(',').collect();
    if parts.len() != N {
        return Err(StatusError::WrongArity {
            key: key.to_string(),
            expected: N,
            found: parts.len(),
        });
    }
    let mut out = [0.0; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = parse_float(key, part)?;
    }
    Ok(out)
}

fn parse_float(key: &str, value: &str) -> Result<f64, StatusError> {
    match value.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(invalid(key, value)),
    }
}

fn invalid(key: &str, value: &str) -> StatusError {
    StatusError::InvalidNumber {
        key: key.to_string(),
        value: value.to_string(),
    }
}
