//! Tapper service, the hexagonal core.
//!
//! [`TapperService`] owns the operation FSM, the drive watchdog, the
//! timed-drive and legacy-tap slots, and the shared motor context.  It
//! exposes a hardware-agnostic API.  All I/O flows through port traits
//! injected at call sites, so the entire service is testable with mock
//! adapters.
//!
//! ```text
//!  command ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!              │        TapperService          │
//! ActuatorPort ◀│ Watchdog · Timed · Legacy · FSM│
//!              └──────────────────────────────┘
//! ```
//!
//! Every entry point takes the current timestamp.  Nothing blocks:
//! [`update`](TapperService::update) must be called once per control-loop
//! iteration, and a phase ends on the first update at or after its target.

use log::{info, warn};

use crate::config::TapperConfig;
use crate::fsm::context::{Card, CoreEvent, DriveState, MotorContext, Position};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, Operation};
use crate::legacy_tap::{LegacyStep, LegacyTap};
use crate::safety::DriveWatchdog;
use crate::timed::TimedOperation;
use crate::timing::{Millis, PowerSource};

use super::commands::TapperCommand;
use super::events::AppEvent;
use super::ports::{ActuatorPort, EventSink};
use super::status::{NO_TIMING_MEASUREMENT, StatusReport, manual_timing_line};

// ───────────────────────────────────────────────────────────────
// TapperService
// ───────────────────────────────────────────────────────────────

/// The tapper service orchestrates all motion logic for one actuator.
pub struct TapperService {
    fsm: Fsm,
    ctx: MotorContext,
    watchdog: DriveWatchdog,
    /// Relay-style timed drive in flight.
    timed: Option<TimedOperation>,
    /// Compatibility tap in flight.
    legacy: Option<LegacyTap>,
    /// Result of the most recent `manual_stop` measurement.
    last_measurement_ms: Option<u32>,
}

impl TapperService {
    /// Construct the service from configuration.
    ///
    /// Does **not** start the FSM; call [`start`](Self::start) next.
    pub fn new(config: &TapperConfig) -> Self {
        let ctx = MotorContext::new(config);
        let fsm = Fsm::new(build_state_table(), Operation::Idle);
        let watchdog = DriveWatchdog::new(config.safety_timeout_ms);

        Self {
            fsm,
            ctx,
            watchdog,
            timed: None,
            legacy: None,
            last_measurement_ms: None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Enter Idle with the drive released.  Position starts Unknown.
    pub fn start(&mut self, now: Millis, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        self.ctx.now = now;
        let prev = self.fsm.current();
        self.fsm.start(&mut self.ctx);
        self.flush(prev, hw, sink);
        sink.emit(&AppEvent::Started {
            position: self.ctx.position,
            operation: self.fsm.current(),
        });
        info!(
            "TapperService started: position {}, power {}",
            self.ctx.position.label(),
            self.ctx.power
        );
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Advance one control-loop iteration: watchdog → timed drive →
    /// legacy tap → sequencer.
    pub fn update(&mut self, now: Millis, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        self.ctx.now = now;
        let prev = self.fsm.current();

        // 1. Free-running drive watchdog
        let drive = self.ctx.drive;
        if self.watchdog.evaluate(now, drive, self.has_controlled_work()) {
            self.ctx.set_drive(DriveState::Idle);
            self.flush(prev, hw, sink);
            sink.emit(&AppEvent::SafetyStop { drive });
        }

        // 2. Timed drive
        if let Some(timed) = self.timed.filter(|t| t.is_done(now)) {
            self.timed = None;
            self.ctx.set_drive(DriveState::Idle);
            self.flush(prev, hw, sink);
            info!("Timed drive finished: {}", timed.completion_label());
            sink.emit(&AppEvent::TimedComplete(timed.completion_label()));
        }

        // 3. Legacy tap
        if let Some(tap) = self.legacy.as_mut() {
            match tap.update(now) {
                LegacyStep::Hold => {}
                LegacyStep::Drive(d) => {
                    self.ctx.set_drive(d);
                    self.flush(prev, hw, sink);
                }
                LegacyStep::Finished => {
                    self.legacy = None;
                    info!("Legacy tap complete");
                    sink.emit(&AppEvent::LegacyTapComplete);
                }
            }
        }

        // 4. Sequencer
        self.fsm.tick(&mut self.ctx);
        self.flush(prev, hw, sink);
    }

    // ── Command handling ──────────────────────────────────────

    /// Process one decoded command.
    pub fn handle_command(
        &mut self,
        cmd: TapperCommand,
        now: Millis,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        info!("Command: {}", cmd.name());
        match cmd {
            TapperCommand::Extend => self.extend(now, hw, sink),
            TapperCommand::Retract => self.retract(now, hw, sink),
            TapperCommand::Stop => self.stop(now, hw, sink),
            TapperCommand::Tap => self.tap(now, hw, sink),
            TapperCommand::ResetToMiddle => self.reset_to_middle(now, hw, sink),
            TapperCommand::TapCard1 => self.tap_card(Card::One, now, hw, sink),
            TapperCommand::TapCard2 => self.tap_card(Card::Two, now, hw, sink),
            TapperCommand::ManualExtend => {
                self.manual_drive(DriveState::Extending, now, hw, sink)
            }
            TapperCommand::ManualRetract => {
                self.manual_drive(DriveState::Retracting, now, hw, sink)
            }
            TapperCommand::ManualStop => self.manual_stop(now, hw, sink),
            TapperCommand::CaptureMiddle => self.capture_middle(now, hw, sink),
            TapperCommand::Power12V => self.set_power_source(PowerSource::Volt12, sink),
            TapperCommand::PowerUsb => self.set_power_source(PowerSource::Usb, sink),
            TapperCommand::ExtendForTime(ms) => {
                self.drive_for_time(DriveState::Extending, ms, now, hw, sink)
            }
            TapperCommand::RetractForTime(ms) => {
                self.drive_for_time(DriveState::Retracting, ms, now, hw, sink)
            }
        }
    }

    // ── Drive primitives ──────────────────────────────────────

    /// Free-running extend, bounded only by the watchdog.
    pub fn extend(&mut self, now: Millis, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        self.direct_drive("extend", DriveState::Extending, now, hw, sink);
    }

    /// Free-running retract, bounded only by the watchdog.
    pub fn retract(&mut self, now: Millis, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        self.direct_drive("retract", DriveState::Retracting, now, hw, sink);
    }

    /// Always succeeds: cancels timed and legacy work and force-completes
    /// any sequencer operation.
    pub fn stop(&mut self, now: Millis, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        self.ctx.now = now;
        let prev = self.fsm.current();
        self.halt();
        self.flush(prev, hw, sink);
    }

    fn direct_drive(
        &mut self,
        command: &'static str,
        drive: DriveState,
        now: Millis,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        if self.fsm.current() != Operation::Idle {
            self.reject(command, "sequencer operation active", sink);
            return;
        }
        self.ctx.now = now;
        self.cancel_background();
        self.ctx.set_drive(drive);
        self.flush(Operation::Idle, hw, sink);
    }

    // ── Timed drive ───────────────────────────────────────────

    /// Drive `direction` for `duration_ms`, then stop.  A new request
    /// replaces one already in flight without a completion event.
    pub fn drive_for_time(
        &mut self,
        direction: DriveState,
        duration_ms: u32,
        now: Millis,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        let command = match direction {
            DriveState::Extending => "extend_for_time",
            DriveState::Retracting => "retract_for_time",
            DriveState::Idle => "hold_for_time",
        };
        if self.fsm.current() != Operation::Idle {
            self.reject(command, "sequencer operation active", sink);
            return;
        }
        if self.legacy.is_some() {
            self.reject(command, "legacy tap in progress", sink);
            return;
        }

        self.ctx.now = now;
        if let Some(previous) = self.timed.take() {
            info!("Timed drive: cancelling {}", previous.state_label());
            self.ctx.set_drive(DriveState::Idle);
        }
        self.ctx.set_drive(direction);
        self.timed = Some(TimedOperation::new(direction, now, duration_ms));
        info!("Timed drive: {} for {}ms", direction.label(), duration_ms);
        self.flush(Operation::Idle, hw, sink);
    }

    // ── Gestures ──────────────────────────────────────────────

    /// Compatibility single-card tap.  Ignores the position belief.
    pub fn tap(&mut self, now: Millis, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        if let Some(reason) = self.busy_reason() {
            self.reject("tap", reason, sink);
            return;
        }
        self.ctx.now = now;
        self.legacy = Some(LegacyTap::start(now));
        self.ctx.set_drive(DriveState::Extending);
        self.flush(Operation::Idle, hw, sink);
    }

    /// Return to middle from wherever the belief says the rod is.
    /// From Unknown this is the two-phase recovery.  No-op at middle.
    pub fn reset_to_middle(
        &mut self,
        now: Millis,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        if let Some(reason) = self.busy_reason() {
            self.reject("reset_to_middle", reason, sink);
            return;
        }
        self.ctx.now = now;
        self.begin_reset(hw, sink);
    }

    /// Card-1 tap (extend side).
    pub fn tap_card1(&mut self, now: Millis, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        self.tap_card(Card::One, now, hw, sink);
    }

    /// Card-2 tap (retract side).
    pub fn tap_card2(&mut self, now: Millis, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        self.tap_card(Card::Two, now, hw, sink);
    }

    /// Start a tap sequence on `card`.  Away from middle the request is
    /// turned into a reset and must be re-issued once it completes.
    pub fn tap_card(
        &mut self,
        card: Card,
        now: Millis,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        let command = match card {
            Card::One => "tap_card1",
            Card::Two => "tap_card2",
        };
        if let Some(reason) = self.busy_reason() {
            self.reject(command, reason, sink);
            return;
        }
        self.ctx.now = now;

        if self.ctx.position != Position::Middle {
            warn!(
                "{}: position is {}, resetting to middle first",
                command,
                self.ctx.position.label()
            );
            sink.emit(&AppEvent::TapRedirected { requested: card });
            self.begin_reset(hw, sink);
            return;
        }

        let target = match card {
            Card::One => Operation::MovingToCard1,
            Card::Two => Operation::MovingToCard2,
        };
        self.fsm.force_transition(target, &mut self.ctx);
        self.flush(Operation::Idle, hw, sink);
    }

    fn begin_reset(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        if self.ctx.position == Position::Middle {
            info!("reset_to_middle: already at middle");
            return;
        }
        self.fsm.force_transition(Operation::MovingToMiddle, &mut self.ctx);
        self.flush(Operation::Idle, hw, sink);
    }

    // ── Calibration ───────────────────────────────────────────

    /// Open-ended extend from any state; starts a timing measurement.
    pub fn manual_extend(&mut self, now: Millis, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        self.manual_drive(DriveState::Extending, now, hw, sink);
    }

    /// Open-ended retract from any state; starts a timing measurement.
    pub fn manual_retract(&mut self, now: Millis, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        self.manual_drive(DriveState::Retracting, now, hw, sink);
    }

    fn manual_drive(
        &mut self,
        direction: DriveState,
        now: Millis,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        self.ctx.now = now;
        let prev = self.fsm.current();
        self.cancel_background();
        if prev != Operation::Idle {
            self.force_complete();
        }
        self.ctx.manual_direction = direction;
        self.fsm.force_transition(Operation::ManualOperation, &mut self.ctx);
        self.flush(prev, hw, sink);
    }

    /// Unconditional stop into Idle.  Closes an active measurement.
    pub fn manual_stop(&mut self, now: Millis, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        self.ctx.now = now;
        let prev = self.fsm.current();
        let captured = self
            .ctx
            .manual_timing_start
            .map(|start| now.elapsed_since(start));

        self.halt();
        self.flush(prev, hw, sink);

        if let Some(elapsed_ms) = captured {
            self.last_measurement_ms = Some(elapsed_ms);
            info!("Manual timing captured: {}ms", elapsed_ms);
            sink.emit(&AppEvent::TimingCaptured { elapsed_ms });
        }
    }

    /// Declare the current physical location to be middle.
    pub fn capture_middle(&mut self, now: Millis, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        self.ctx.now = now;
        let prev = self.fsm.current();
        self.halt();
        self.ctx.position = Position::Middle;
        self.flush(prev, hw, sink);
        info!("Middle position captured");
        sink.emit(&AppEvent::PositionCaptured(self.status_report(now)));
    }

    // ── Power profile ─────────────────────────────────────────

    /// Select the profile row for every phase that starts from now on.
    pub fn set_power_source(&mut self, source: PowerSource, sink: &mut impl EventSink) {
        if self.ctx.power != source {
            info!("Power source: {} -> {}", self.ctx.power, source);
        }
        self.ctx.power = source;
        sink.emit(&AppEvent::PowerSourceChanged(source));
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn position(&self) -> Position {
        self.ctx.position
    }

    pub fn operation(&self) -> Operation {
        self.fsm.current()
    }

    pub fn power_source(&self) -> PowerSource {
        self.ctx.power
    }

    pub fn drive_state(&self) -> DriveState {
        self.ctx.drive
    }

    /// Composite label: sequencer operation, then timed drive, then
    /// legacy tap, then raw drive.
    pub fn state_label(&self) -> &'static str {
        let op = self.fsm.current();
        if op != Operation::Idle {
            return op.label();
        }
        if let Some(timed) = &self.timed {
            return timed.state_label();
        }
        if let Some(tap) = &self.legacy {
            return tap.phase().label();
        }
        self.ctx.drive.label()
    }

    /// Any controlled work in flight (sequencer, timed drive, legacy tap).
    pub fn is_busy(&self) -> bool {
        self.has_controlled_work()
    }

    pub fn drift_ms(&self, card: Card) -> u32 {
        self.ctx.drift.accumulated_ms(card)
    }

    pub fn last_measurement_ms(&self) -> Option<u32> {
        self.last_measurement_ms
    }

    /// Description of the active manual measurement, if any.
    pub fn timing_info(&self, now: Millis) -> String {
        match self.ctx.manual_timing_start {
            Some(start) => manual_timing_line(now.elapsed_since(start)),
            None => String::from(NO_TIMING_MEASUREMENT),
        }
    }

    pub fn status_report(&self, now: Millis) -> StatusReport {
        StatusReport {
            state: self.state_label(),
            position: self.ctx.position.label(),
            operation: self.fsm.current().label(),
            drive: self.ctx.drive.label(),
            power_source: self.ctx.power.label(),
            is_tapping: self.is_busy(),
            manual_timing_ms: self
                .ctx
                .manual_timing_start
                .map(|start| now.elapsed_since(start)),
            last_measurement_ms: self.last_measurement_ms,
            drift_card1_ms: self.ctx.drift.accumulated_ms(Card::One),
            drift_card2_ms: self.ctx.drift.accumulated_ms(Card::Two),
            positioning_method: StatusReport::POSITIONING_METHOD,
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn has_controlled_work(&self) -> bool {
        self.fsm.current() != Operation::Idle || self.timed.is_some() || self.legacy.is_some()
    }

    fn busy_reason(&self) -> Option<&'static str> {
        if self.fsm.current() != Operation::Idle {
            Some("operation in progress")
        } else if self.timed.is_some() {
            Some("timed operation in progress")
        } else if self.legacy.is_some() {
            Some("legacy tap in progress")
        } else {
            None
        }
    }

    fn reject(&self, command: &'static str, reason: &'static str, sink: &mut impl EventSink) {
        warn!("Rejected {}: {}", command, reason);
        sink.emit(&AppEvent::CommandRejected { command, reason });
    }

    /// Drop timed and legacy work without completion events.
    fn cancel_background(&mut self) {
        if let Some(timed) = self.timed.take() {
            info!("Cancelled {}", timed.state_label());
        }
        if let Some(tap) = self.legacy.take() {
            info!("Cancelled {}", tap.phase().label());
        }
    }

    /// Abandon the current operation.  An interrupted motion phase leaves
    /// the rod somewhere unknown; a dwell keeps its card.  No drift is
    /// recorded.
    fn force_complete(&mut self) {
        let op = self.fsm.current();
        if op.is_motion_phase() {
            self.ctx.position = Position::Unknown;
        }
        warn!("Force-completing {}", op.label());
        self.fsm.force_transition(Operation::Idle, &mut self.ctx);
    }

    /// Everything off, back to Idle.
    fn halt(&mut self) {
        self.cancel_background();
        if self.fsm.current() != Operation::Idle {
            self.force_complete();
        } else {
            self.ctx.set_drive(DriveState::Idle);
        }
    }

    /// Drain the context outbox: apply drive requests to the bridge and
    /// translate milestones into application events.
    fn flush(&mut self, prev: Operation, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        let mut returned = false;

        for event in self.ctx.take_events() {
            match event {
                CoreEvent::Drive(drive) => {
                    hw.apply_drive(drive);
                    sink.emit(&AppEvent::DriveChanged(drive));
                }
                CoreEvent::ReachedCard(card) => sink.emit(&AppEvent::ReachedCard(card)),
                CoreEvent::RecoveryRetracted => sink.emit(&AppEvent::RecoveryRetracted),
                CoreEvent::ReturnedToMiddle { .. } => returned = true,
                CoreEvent::DriftUpdated {
                    card,
                    accumulated_ms,
                } => sink.emit(&AppEvent::DriftUpdated {
                    card,
                    accumulated_ms,
                }),
            }
        }

        let current = self.fsm.current();
        if current != prev {
            sink.emit(&AppEvent::OperationChanged {
                from: prev,
                to: current,
            });
        }

        if returned {
            sink.emit(&AppEvent::SequenceComplete(self.status_report(self.ctx.now)));
        }
    }
}
