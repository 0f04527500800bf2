//! Relay-style timed drive.
//!
//! `extend_for_time` / `retract_for_time` drive in one direction for a
//! fixed duration and then stop, independent of the position belief.

use crate::fsm::context::DriveState;
use crate::timing::{Millis, PhaseTimer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedOperation {
    pub drive: DriveState,
    pub timer: PhaseTimer,
}

impl TimedOperation {
    pub const fn new(drive: DriveState, started: Millis, duration_ms: u32) -> Self {
        Self {
            drive,
            timer: PhaseTimer::new(started, duration_ms),
        }
    }

    pub const fn is_done(&self, now: Millis) -> bool {
        self.timer.expired(now)
    }

    /// Event label published when the hold ends.
    pub const fn completion_label(&self) -> &'static str {
        match self.drive {
            DriveState::Extending => "extend_complete",
            DriveState::Retracting => "retract_complete",
            DriveState::Idle => "operation_complete",
        }
    }

    /// Composite state label while in flight.
    pub const fn state_label(&self) -> &'static str {
        match self.drive {
            DriveState::Extending => "timed_extending",
            DriveState::Retracting => "timed_retracting",
            DriveState::Idle => "timed_operation",
        }
    }
}
