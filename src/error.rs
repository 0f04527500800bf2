//! Error types for the tapper firmware, one per outer layer.
//!
//! The motion core never fails: illegal requests are rejected with a
//! diagnostic event.  These types cover the outer layers: payload
//! decoding, configuration, the status transport and the H-bridge pins.
//! All variants are `Copy` so they can be logged and passed around
//! without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Verb is not part of the command surface.
    UnknownVerb,
    /// Payload starts like JSON but does not parse.
    InvalidJson,
    /// JSON envelope without an `action` field.
    MissingAction,
    /// Timed verb without `duration_ms`; carries the verb.
    MissingDuration(&'static str),
    /// `duration_ms` is zero or does not fit the millisecond clock.
    DurationOutOfRange,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownVerb => write!(f, "unknown command"),
            Self::InvalidJson => write!(f, "invalid JSON payload"),
            Self::MissingAction => write!(f, "missing action"),
            Self::MissingDuration(verb) => write!(f, "{verb} requires duration_ms"),
            Self::DurationOutOfRange => write!(f, "duration_ms out of range"),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Document is not valid JSON for [`crate::config::TapperConfig`].
    InvalidJson,
    /// A value is outside what the control loop can honour.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidJson => write!(f, "invalid JSON document"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    NotConnected,
    PublishFailed,
    SubscribeFailed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "broker not connected"),
            Self::PublishFailed => write!(f, "publish failed"),
            Self::SubscribeFailed => write!(f, "subscribe failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// GPIO set failed.
    GpioWriteFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
        }
    }
}
