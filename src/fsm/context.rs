//! Shared mutable context threaded through every FSM handler.
//!
//! `MotorContext` is the position belief of the actuator: where we think
//! the rod is, which phase is being timed, which profile row is selected,
//! and the drive level the handlers want on the H-bridge.  Handlers never
//! touch hardware; they record drive requests and notable moments in the
//! outbox, which the service drains after every call.

use heapless::Vec;
use log::warn;

use crate::config::TapperConfig;
use crate::drift::DriftCompensator;
use crate::timing::{Millis, PhaseTimer, PowerSource, TimingProfile};

/// Outbox capacity.  One handler chain emits at most four entries.
pub const OUTBOX_CAP: usize = 8;

// ---------------------------------------------------------------------------
// Position belief
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Before calibration, or after a manual override.
    Unknown,
    /// Rest position between the two cards.
    Middle,
    /// Extended pole.
    Card1,
    /// Retracted pole.
    Card2,
}

impl Position {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Middle => "middle",
            Self::Card1 => "card1",
            Self::Card2 => "card2",
        }
    }
}

/// One of the two card-reader targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Card {
    One,
    Two,
}

impl Card {
    pub const fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }

    pub const fn position(self) -> Position {
        match self {
            Self::One => Position::Card1,
            Self::Two => Position::Card2,
        }
    }

    /// Drive that carries the rod from middle onto this card.
    pub const fn approach_drive(self) -> DriveState {
        match self {
            Self::One => DriveState::Extending,
            Self::Two => DriveState::Retracting,
        }
    }

    /// Drive that brings the rod from this card back to middle.
    pub const fn return_drive(self) -> DriveState {
        match self {
            Self::One => DriveState::Retracting,
            Self::Two => DriveState::Extending,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::One => "card1",
            Self::Two => "card2",
        }
    }
}

impl core::fmt::Display for Card {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::One => write!(f, "Card 1"),
            Self::Two => write!(f, "Card 2"),
        }
    }
}

/// Immediate electrical state of the H-bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriveState {
    #[default]
    Idle,
    Extending,
    Retracting,
}

impl DriveState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Extending => "extending",
            Self::Retracting => "retracting",
        }
    }

    pub const fn is_moving(self) -> bool {
        !matches!(self, Self::Idle)
    }

    /// `(IN1, IN2)` levels.  Never both high.
    pub const fn pin_levels(self) -> (bool, bool) {
        match self {
            Self::Idle => (false, false),
            Self::Extending => (true, false),
            Self::Retracting => (false, true),
        }
    }
}

/// Which leg of a return-to-middle movement is being timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnLeg {
    /// Known start: timed with that card's (compensated) return duration.
    FromCard(Card),
    /// Unknown start, phase 1: full retract onto the end stop.
    RecoveryRetract,
    /// Unknown start, phase 2: half travel out from fully retracted.
    RecoveryApproach,
}

// ---------------------------------------------------------------------------
// Outbox
// ---------------------------------------------------------------------------

/// Things that happened inside a handler, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreEvent {
    /// Drive primitive invoked.
    Drive(DriveState),
    /// Approach finished, rod pressed against `card`.
    ReachedCard(Card),
    /// Recovery phase 1 done; now extending from the retracted end stop.
    RecoveryRetracted,
    /// Back at middle.  `from` is `None` for the unknown-start recovery.
    ReturnedToMiddle { from: Option<Card> },
    /// A completed tap bumped the card's drift accumulator.
    DriftUpdated { card: Card, accumulated_ms: u32 },
}

// ---------------------------------------------------------------------------
// MotorContext
// ---------------------------------------------------------------------------

pub struct MotorContext {
    // -- Timing --
    /// Timestamp of the call being processed.  Set by the service first.
    pub now: Millis,
    /// Start and latched target of the current phase.
    pub phase: PhaseTimer,
    /// Selected timing profile row.
    pub power: PowerSource,
    pub drift: DriftCompensator,

    // -- Position belief --
    pub position: Position,
    pub return_leg: ReturnLeg,
    /// Card of the tap sequence in flight, if any.
    pub tap_card: Option<Card>,

    // -- Drive --
    pub drive: DriveState,
    /// Direction requested for the next `ManualOperation` entry.
    pub manual_direction: DriveState,
    /// Start of the in-progress manual timing measurement.
    pub manual_timing_start: Option<Millis>,

    outbox: Vec<CoreEvent, OUTBOX_CAP>,
}

impl MotorContext {
    pub fn new(config: &TapperConfig) -> Self {
        Self {
            now: Millis(0),
            phase: PhaseTimer::default(),
            power: config.power_source,
            drift: DriftCompensator::new(config.drift_per_tap_ms, config.max_drift_ms),
            position: Position::Unknown,
            return_leg: ReturnLeg::RecoveryRetract,
            tap_card: None,
            drive: DriveState::Idle,
            manual_direction: DriveState::Extending,
            manual_timing_start: None,
            outbox: Vec::new(),
        }
    }

    pub fn profile(&self) -> &'static TimingProfile {
        self.power.profile()
    }

    /// Restart the phase timer at `now` with a freshly looked-up target.
    pub fn start_phase(&mut self, duration_ms: u32) {
        self.phase = PhaseTimer::new(self.now, duration_ms);
    }

    pub fn phase_expired(&self) -> bool {
        self.phase.expired(self.now)
    }

    /// Drive primitive request.  Applied to the H-bridge by the service.
    pub fn set_drive(&mut self, drive: DriveState) {
        self.drive = drive;
        self.push(CoreEvent::Drive(drive));
    }

    pub fn push(&mut self, event: CoreEvent) {
        if self.outbox.push(event).is_err() {
            warn!("MotorContext: outbox full, dropping {:?}", event);
        }
    }

    /// Hand the accumulated outbox to the caller, leaving it empty.
    pub fn take_events(&mut self) -> Vec<CoreEvent, OUTBOX_CAP> {
        core::mem::take(&mut self.outbox)
    }

    // -- Profile lookups --

    pub fn approach_ms(&self, card: Card) -> u32 {
        let p = self.profile();
        match card {
            Card::One => p.card1_from_home_ms,
            Card::Two => p.card2_from_home_ms,
        }
    }

    pub fn pause_ms(&self, card: Card) -> u32 {
        let p = self.profile();
        match card {
            Card::One => p.card1_tap_pause_ms,
            Card::Two => p.card2_tap_pause_ms,
        }
    }

    /// Return-to-middle duration with drift compensation applied.
    pub fn return_ms(&self, card: Card) -> u32 {
        let p = self.profile();
        let nominal = match card {
            Card::One => p.card1_to_home_ms,
            Card::Two => p.card2_to_home_ms,
        };
        self.drift.compensate(card, nominal)
    }
}
