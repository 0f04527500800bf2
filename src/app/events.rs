//! Outbound application events.
//!
//! The [`TapperService`](super::service::TapperService) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, publish a status
//! string over MQTT, record for a test.

use crate::fsm::Operation;
use crate::fsm::context::{Card, DriveState, Position};
use crate::timing::PowerSource;

use super::status::StatusReport;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service has started (carries the boot belief).
    Started {
        position: Position,
        operation: Operation,
    },

    /// A drive primitive was invoked.  Published as `extending`,
    /// `retracting` or `idle`.
    DriveChanged(DriveState),

    /// The sequencer moved between operations.
    OperationChanged { from: Operation, to: Operation },

    /// Timed approach finished; the rod is against `card`.
    ReachedCard(Card),

    /// Unknown-start recovery finished its full retract.
    RecoveryRetracted,

    /// A return to middle finished (tap or reset).  Carries the detailed
    /// status captured at that moment.
    SequenceComplete(StatusReport),

    /// `capture_middle` declared the current location as middle.
    PositionCaptured(StatusReport),

    /// A completed tap bumped a drift accumulator.
    DriftUpdated { card: Card, accumulated_ms: u32 },

    /// `manual_stop` closed a timing measurement.
    TimingCaptured { elapsed_ms: u32 },

    /// Relay-style timed hold finished.  Carries the completion label.
    TimedComplete(&'static str),

    /// The compatibility `tap` gesture finished.
    LegacyTapComplete,

    /// A card tap was requested away from middle; a reset ran instead.
    TapRedirected { requested: Card },

    /// The watchdog stopped a free-running drive.
    SafetyStop { drive: DriveState },

    /// Power source switched; subsequent phases use the new profile.
    PowerSourceChanged(PowerSource),

    /// A command was refused; state and outputs are unchanged.
    CommandRejected {
        command: &'static str,
        reason: &'static str,
    },
}
