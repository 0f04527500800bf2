//! Port traits: the hexagonal boundary between the motion core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ TapperService (domain)
//! ```
//!
//! Driven adapters (H-bridge, clock, event sinks, status transport)
//! implement these traits.  The [`TapperService`](super::service::TapperService)
//! consumes them via generics, so the core never touches hardware directly.

use crate::error::TransportError;
use crate::fsm::context::DriveState;
use crate::timing::Millis;

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to set the H-bridge.
///
/// Implementations must never assert both inputs at once and must not
/// report errors back; a failed write falls back to both inputs low.
pub trait ActuatorPort {
    fn apply_drive(&mut self, drive: DriveState);
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock.  Wraps at `u32::MAX`.
pub trait ClockPort {
    fn now(&self) -> Millis;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / status)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, MQTT
/// status topic, test recorder).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

/// Fan-out: deliver every event to both sinks, left first.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, event: &super::events::AppEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}

// ───────────────────────────────────────────────────────────────
// Status transport port (driven adapter: domain → broker)
// ───────────────────────────────────────────────────────────────

/// Publish-only message transport used by the status publisher.
pub trait StatusTransport {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;

    /// Service the connection once per loop iteration.
    ///
    /// Returns `true` on the call that completes a (re)connect, so the
    /// caller can re-announce state the broker may have missed.
    fn poll(&mut self) -> Result<bool, TransportError> {
        Ok(false)
    }
}

/// A transport that may not exist (e.g. broker unreachable at boot).
impl<T: StatusTransport> StatusTransport for Option<T> {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), TransportError> {
        match self {
            Some(t) => t.publish(topic, payload),
            None => Err(TransportError::NotConnected),
        }
    }

    fn is_connected(&self) -> bool {
        self.as_ref().is_some_and(|t| t.is_connected())
    }

    fn poll(&mut self) -> Result<bool, TransportError> {
        self.as_mut().map_or(Ok(false), T::poll)
    }
}
