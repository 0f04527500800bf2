//! Inbound commands to the tapper service.
//!
//! These represent actions requested by the outside world (MQTT, serial,
//! HTTP bridge) that the [`TapperService`](super::service::TapperService)
//! interprets and acts upon.  Payloads arrive either as a bare verb or as
//! a JSON envelope:
//!
//! ```text
//! tap_card1
//! {"action": "extend_for_time", "duration_ms": 750}
//! ```

use serde::Deserialize;
use serde_json::Number;

use crate::error::CommandError;

/// Commands that external adapters can send into the motion core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapperCommand {
    // ── Drive primitives ─────────────────────────────────────
    Extend,
    Retract,
    Stop,

    // ── Gestures ─────────────────────────────────────────────
    /// Compatibility single-card tap.
    Tap,
    ResetToMiddle,
    TapCard1,
    TapCard2,

    // ── Calibration ──────────────────────────────────────────
    ManualExtend,
    ManualRetract,
    ManualStop,
    CaptureMiddle,

    // ── Power profile ────────────────────────────────────────
    Power12V,
    PowerUsb,

    // ── Relay-style timed drive ──────────────────────────────
    ExtendForTime(u32),
    RetractForTime(u32),
}

/// JSON envelope as received on the command topic.
///
/// `duration_ms` is kept as a raw number so that negative or fractional
/// values are range errors rather than parse errors.
#[derive(Debug, Deserialize)]
struct RawCommand {
    action: Option<String>,
    duration_ms: Option<Number>,
}

impl TapperCommand {
    /// Parse a bare verb.  Timed verbs need a duration and are rejected here.
    pub fn parse(verb: &str) -> Result<Self, CommandError> {
        Self::from_parts(verb, None)
    }

    /// Parse the `{"action": ..., "duration_ms": ...}` envelope.
    pub fn from_json(json: &str) -> Result<Self, CommandError> {
        let raw: RawCommand =
            serde_json::from_str(json).map_err(|_| CommandError::InvalidJson)?;
        let action = raw.action.ok_or(CommandError::MissingAction)?;
        Self::from_parts(action.trim(), raw.duration_ms.as_ref())
    }

    /// Accept either payload form.  A leading `{` selects JSON.
    pub fn decode(payload: &str) -> Result<Self, CommandError> {
        let trimmed = payload.trim();
        if trimmed.starts_with('{') {
            Self::from_json(trimmed)
        } else {
            Self::parse(trimmed)
        }
    }

    fn from_parts(verb: &str, duration_ms: Option<&Number>) -> Result<Self, CommandError> {
        let cmd = match verb {
            "extend" => Self::Extend,
            "retract" => Self::Retract,
            "stop" => Self::Stop,
            "tap" => Self::Tap,
            "reset_to_middle" => Self::ResetToMiddle,
            "tap_card1" => Self::TapCard1,
            "tap_card2" => Self::TapCard2,
            "manual_extend" => Self::ManualExtend,
            "manual_retract" => Self::ManualRetract,
            "manual_stop" => Self::ManualStop,
            "capture_middle" => Self::CaptureMiddle,
            "power_12v" => Self::Power12V,
            "power_usb" => Self::PowerUsb,
            "extend_for_time" => Self::ExtendForTime(duration("extend_for_time", duration_ms)?),
            "retract_for_time" => Self::RetractForTime(duration("retract_for_time", duration_ms)?),
            _ => return Err(CommandError::UnknownVerb),
        };
        Ok(cmd)
    }

    /// Wire name, as used in logs and rejection events.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Extend => "extend",
            Self::Retract => "retract",
            Self::Stop => "stop",
            Self::Tap => "tap",
            Self::ResetToMiddle => "reset_to_middle",
            Self::TapCard1 => "tap_card1",
            Self::TapCard2 => "tap_card2",
            Self::ManualExtend => "manual_extend",
            Self::ManualRetract => "manual_retract",
            Self::ManualStop => "manual_stop",
            Self::CaptureMiddle => "capture_middle",
            Self::Power12V => "power_12v",
            Self::PowerUsb => "power_usb",
            Self::ExtendForTime(_) => "extend_for_time",
            Self::RetractForTime(_) => "retract_for_time",
        }
    }
}

/// Durations must be positive and fit the 32-bit millisecond clock with
/// room to spare for wrap-safe comparison.
fn duration(verb: &'static str, value: Option<&Number>) -> Result<u32, CommandError> {
    let ms = value.ok_or(CommandError::MissingDuration(verb))?;
    match ms.as_u64().map(u32::try_from) {
        Some(Ok(ms)) if ms > 0 && ms <= i32::MAX as u32 => Ok(ms),
        _ => Err(CommandError::DurationOutOfRange),
    }
}
