//! Reset-to-middle, manual timing capture and middle calibration.

use crate::mock_hw::{POLL_MS, Rig};

use tapper::app::events::AppEvent;
use tapper::fsm::Operation;
use tapper::fsm::context::{Card, DriveState, Position};
use tapper::timing::PROFILE_12V;

/// Leave the rod parked on a card: stop during the dwell keeps the belief.
fn parked_on_card1() -> Rig {
    let mut rig = Rig::at_middle();
    rig.svc.tap_card1(rig.millis(), &mut rig.hw, &mut rig.sink);
    rig.tick_at(PROFILE_12V.card1_from_home_ms);
    rig.svc.stop(rig.millis(), &mut rig.hw, &mut rig.sink);
    assert_eq!(rig.svc.position(), Position::Card1);
    rig.hw.calls.clear();
    rig.sink.clear();
    rig
}

fn parked_on_card2() -> Rig {
    let mut rig = Rig::at_middle();
    rig.svc.tap_card2(rig.millis(), &mut rig.hw, &mut rig.sink);
    rig.tick_at(PROFILE_12V.card2_from_home_ms);
    rig.svc.stop(rig.millis(), &mut rig.hw, &mut rig.sink);
    assert_eq!(rig.svc.position(), Position::Card2);
    rig.hw.calls.clear();
    rig.sink.clear();
    rig
}

// ── reset_to_middle ───────────────────────────────────────────

#[test]
fn reset_from_card1_retracts_for_return_time() {
    let mut rig = parked_on_card1();
    rig.svc.reset_to_middle(rig.millis(), &mut rig.hw, &mut rig.sink);
    assert_eq!(rig.hw.drive(), DriveState::Retracting);

    let took = rig.run_until_quiet(5_000);
    assert!(took >= PROFILE_12V.card1_to_home_ms);
    assert!(took <= PROFILE_12V.card1_to_home_ms + POLL_MS);
    assert_eq!(rig.svc.position(), Position::Middle);
    assert_eq!(rig.hw.calls, [DriveState::Retracting, DriveState::Idle]);
    // A plain reset is not a tap.
    assert_eq!(rig.svc.drift_ms(Card::One), 0);
}

#[test]
fn reset_from_card2_extends_for_return_time() {
    let mut rig = parked_on_card2();
    rig.svc.reset_to_middle(rig.millis(), &mut rig.hw, &mut rig.sink);
    assert_eq!(rig.hw.drive(), DriveState::Extending);

    let took = rig.run_until_quiet(5_000);
    assert!(took >= PROFILE_12V.card2_to_home_ms);
    assert!(took <= PROFILE_12V.card2_to_home_ms + POLL_MS);
    assert_eq!(rig.svc.position(), Position::Middle);
}

#[test]
fn reset_from_unknown_runs_both_recovery_phases() {
    let mut rig = Rig::new();
    rig.hw.calls.clear();
    rig.svc.reset_to_middle(rig.millis(), &mut rig.hw, &mut rig.sink);
    assert_eq!(rig.hw.drive(), DriveState::Retracting);

    let full = PROFILE_12V.retract_full_ms;
    let half = PROFILE_12V.home_from_retracted_ms;

    rig.tick_at(full - 1);
    assert_eq!(rig.hw.drive(), DriveState::Retracting);
    rig.tick_at(full);
    assert_eq!(rig.hw.drive(), DriveState::Extending);
    assert_eq!(rig.sink.count(|e| *e == AppEvent::RecoveryRetracted), 1);
    assert_eq!(rig.svc.operation(), Operation::MovingToMiddle);

    rig.tick_at(full + half - 1);
    assert_eq!(rig.svc.operation(), Operation::MovingToMiddle);
    rig.tick_at(full + half);
    assert_eq!(rig.svc.operation(), Operation::Idle);
    assert_eq!(rig.svc.position(), Position::Middle);
    assert_eq!(
        rig.hw.calls,
        [
            DriveState::Retracting,
            DriveState::Extending,
            DriveState::Idle
        ]
    );
}

#[test]
fn recovery_with_polling_stays_within_two_intervals() {
    let mut rig = Rig::new();
    rig.svc.reset_to_middle(rig.millis(), &mut rig.hw, &mut rig.sink);
    let took = rig.run_until_quiet(10_000);
    let nominal = PROFILE_12V.retract_full_ms + PROFILE_12V.home_from_retracted_ms;
    assert!(took >= nominal);
    assert!(took <= nominal + 2 * POLL_MS);
}

#[test]
fn reset_at_middle_is_a_no_op() {
    let mut rig = Rig::at_middle();
    rig.svc.reset_to_middle(rig.millis(), &mut rig.hw, &mut rig.sink);
    assert_eq!(rig.svc.operation(), Operation::Idle);
    assert!(rig.hw.calls.is_empty());
    assert!(rig.sink.events.is_empty());
}

// ── Manual timing ─────────────────────────────────────────────

#[test]
fn manual_stop_captures_elapsed_time() {
    let mut rig = Rig::at_middle();
    rig.tick_at(300);
    rig.svc.manual_extend(rig.millis(), &mut rig.hw, &mut rig.sink);
    assert_eq!(rig.svc.operation(), Operation::ManualOperation);
    assert_eq!(rig.svc.position(), Position::Unknown);
    assert_eq!(rig.hw.drive(), DriveState::Extending);

    rig.tick_at(1534);
    assert_eq!(
        rig.svc.timing_info(rig.millis()),
        "Manual timing: 1234ms (active since manual start)"
    );
    rig.svc.manual_stop(rig.millis(), &mut rig.hw, &mut rig.sink);

    assert_eq!(rig.svc.operation(), Operation::Idle);
    assert_eq!(rig.hw.drive(), DriveState::Idle);
    assert_eq!(rig.svc.last_measurement_ms(), Some(1234));
    assert!(
        rig.sink
            .events
            .contains(&AppEvent::TimingCaptured { elapsed_ms: 1234 })
    );
    assert_eq!(rig.svc.timing_info(rig.millis()), "No timing measurement active");
}

#[test]
fn manual_operation_never_ends_on_its_own() {
    let mut rig = Rig::at_middle();
    rig.svc.manual_retract(rig.millis(), &mut rig.hw, &mut rig.sink);
    rig.run_for(12_000);
    assert_eq!(rig.svc.operation(), Operation::ManualOperation);
    assert_eq!(rig.hw.drive(), DriveState::Retracting);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::SafetyStop { .. })), 0);
}

#[test]
fn manual_direction_switch_restarts_measurement() {
    let mut rig = Rig::at_middle();
    rig.svc.manual_extend(rig.millis(), &mut rig.hw, &mut rig.sink);
    rig.run_for(400);
    rig.svc.manual_retract(rig.millis(), &mut rig.hw, &mut rig.sink);
    assert_eq!(rig.svc.operation(), Operation::ManualOperation);
    assert_eq!(rig.hw.drive(), DriveState::Retracting);

    rig.run_for(200);
    rig.svc.manual_stop(rig.millis(), &mut rig.hw, &mut rig.sink);
    assert_eq!(rig.svc.last_measurement_ms(), Some(200));
}

#[test]
fn manual_during_tap_abandons_sequence() {
    let mut rig = Rig::at_middle();
    rig.svc.tap_card1(rig.millis(), &mut rig.hw, &mut rig.sink);
    rig.run_for(400);
    rig.svc.manual_retract(rig.millis(), &mut rig.hw, &mut rig.sink);

    assert_eq!(rig.svc.operation(), Operation::ManualOperation);
    assert_eq!(rig.svc.position(), Position::Unknown);
    assert_eq!(
        rig.hw.calls,
        [
            DriveState::Extending,
            DriveState::Idle,
            DriveState::Retracting
        ]
    );
}

#[test]
fn plain_stop_does_not_capture_timing() {
    let mut rig = Rig::at_middle();
    rig.svc.manual_extend(rig.millis(), &mut rig.hw, &mut rig.sink);
    rig.run_for(500);
    rig.svc.stop(rig.millis(), &mut rig.hw, &mut rig.sink);
    assert_eq!(rig.svc.operation(), Operation::Idle);
    assert_eq!(rig.svc.last_measurement_ms(), None);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::TimingCaptured { .. })), 0);
}

#[test]
fn manual_stop_when_idle_still_releases_drive() {
    let mut rig = Rig::at_middle();
    rig.svc.manual_stop(rig.millis(), &mut rig.hw, &mut rig.sink);
    assert_eq!(rig.hw.drive(), DriveState::Idle);
    assert_eq!(rig.svc.last_measurement_ms(), None);
}

// ── capture_middle ────────────────────────────────────────────

#[test]
fn capture_middle_after_manual_jog() {
    let mut rig = Rig::new();
    rig.svc.manual_extend(rig.millis(), &mut rig.hw, &mut rig.sink);
    rig.run_for(700);
    rig.svc.capture_middle(rig.millis(), &mut rig.hw, &mut rig.sink);

    assert_eq!(rig.svc.position(), Position::Middle);
    assert_eq!(rig.svc.operation(), Operation::Idle);
    assert_eq!(rig.hw.drive(), DriveState::Idle);

    let report = rig
        .sink
        .events
        .iter()
        .find_map(|e| match e {
            AppEvent::PositionCaptured(r) => Some(r.clone()),
            _ => None,
        })
        .expect("capture event");
    assert_eq!(report.position, "middle");
    assert_eq!(report.summary(), "Position: middle, Operation: idle, Power: 12V");
}

#[test]
fn capture_middle_during_sequence_takes_over() {
    let mut rig = Rig::at_middle();
    rig.svc.tap_card2(rig.millis(), &mut rig.hw, &mut rig.sink);
    rig.run_for(300);
    rig.svc.capture_middle(rig.millis(), &mut rig.hw, &mut rig.sink);
    assert_eq!(rig.svc.position(), Position::Middle);
    assert_eq!(rig.svc.operation(), Operation::Idle);

    // Calibrated again: taps run directly.
    rig.svc.tap_card1(rig.millis(), &mut rig.hw, &mut rig.sink);
    assert_eq!(rig.svc.operation(), Operation::MovingToCard1);
}

#[test]
fn status_report_shows_active_measurement() {
    let mut rig = Rig::at_middle();
    rig.svc.manual_extend(rig.millis(), &mut rig.hw, &mut rig.sink);
    rig.run_for(100);
    let report = rig.svc.status_report(rig.millis());
    assert_eq!(report.manual_timing_ms, Some(100));
    assert_eq!(
        report.summary(),
        "Position: unknown, Operation: manual_operation, Power: 12V, \
         Manual timing: 100ms (active since manual start)"
    );
}
