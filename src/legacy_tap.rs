//! Single-card compatibility tap.
//!
//! The `tap` verb predates the two-card sequencer.  It runs a fixed
//! extend / pause / retract gesture that ignores the position belief and
//! the power-source profile:
//!
//! ```text
//!  EXTENDING ──>2000ms──▶ PAUSING ──>200ms──▶ RETRACTING ──>2000ms──▶ COMPLETE ──1 tick──▶ done
//! ```
//!
//! Unlike the sequencer, a phase ends only once its elapsed time is
//! strictly greater than the phase duration.

use log::info;

use crate::fsm::context::DriveState;
use crate::timing::{Millis, PhaseTimer};

pub const LEGACY_EXTEND_MS: u32 = 2000;
pub const LEGACY_PAUSE_MS: u32 = 200;
pub const LEGACY_RETRACT_MS: u32 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyPhase {
    Extending,
    Pausing,
    Retracting,
    Complete,
}

impl LegacyPhase {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Extending => "tap_extending",
            Self::Pausing => "tap_pausing",
            Self::Retracting => "tap_retracting",
            Self::Complete => "tap_complete",
        }
    }
}

/// What the service must do after advancing the shim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyStep {
    /// Nothing changed.
    Hold,
    /// Phase boundary: apply this drive.
    Drive(DriveState),
    /// Gesture over; drop the shim.
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyTap {
    phase: LegacyPhase,
    timer: PhaseTimer,
}

impl LegacyTap {
    /// Begin the gesture.  The caller applies [`DriveState::Extending`].
    pub fn start(now: Millis) -> Self {
        info!("Legacy tap: extending for {}ms", LEGACY_EXTEND_MS);
        Self {
            phase: LegacyPhase::Extending,
            timer: PhaseTimer::new(now, LEGACY_EXTEND_MS),
        }
    }

    pub fn phase(&self) -> LegacyPhase {
        self.phase
    }

    pub fn update(&mut self, now: Millis) -> LegacyStep {
        match self.phase {
            LegacyPhase::Complete => LegacyStep::Finished,
            _ if self.timer.elapsed(now) <= self.timer.duration_ms => LegacyStep::Hold,
            LegacyPhase::Extending => {
                self.enter(LegacyPhase::Pausing, now, LEGACY_PAUSE_MS);
                LegacyStep::Drive(DriveState::Idle)
            }
            LegacyPhase::Pausing => {
                self.enter(LegacyPhase::Retracting, now, LEGACY_RETRACT_MS);
                LegacyStep::Drive(DriveState::Retracting)
            }
            LegacyPhase::Retracting => {
                self.enter(LegacyPhase::Complete, now, 0);
                LegacyStep::Drive(DriveState::Idle)
            }
        }
    }

    fn enter(&mut self, phase: LegacyPhase, now: Millis, duration_ms: u32) {
        info!("Legacy tap: {} -> {}", self.phase.label(), phase.label());
        self.phase = phase;
        self.timer = PhaseTimer::new(now, duration_ms);
    }
}
