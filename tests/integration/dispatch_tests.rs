//! Inbound payload → decode → service, and status publication end-to-end.

use crate::mock_hw::{MockHardware, MockTransport, POLL_MS, RecordingSink, Rig};

use tapper::adapters::device_id::{device_id, read_mac};
use tapper::adapters::status_publisher::StatusPublisher;
use tapper::app::commands::TapperCommand;
use tapper::app::events::AppEvent;
use tapper::app::service::TapperService;
use tapper::config::TapperConfig;
use tapper::error::CommandError;
use tapper::fsm::Operation;
use tapper::fsm::context::{DriveState, Position};
use tapper::inbox::{self, CommandInbox};
use tapper::timing::{Millis, PowerSource};

/// Decode and apply every queued payload, the way the control loop does.
fn dispatch(rig: &mut Rig, inbox: &CommandInbox) -> Vec<CommandError> {
    let mut errors = Vec::new();
    let now = rig.millis();
    inbox.drain(|payload| match TapperCommand::decode(payload) {
        Ok(cmd) => rig.svc.handle_command(cmd, now, &mut rig.hw, &mut rig.sink),
        Err(e) => errors.push(e),
    });
    errors
}

// ── Inbox → service ───────────────────────────────────────────

#[test]
fn queued_verbs_drive_a_full_tap() {
    let mut rig = Rig::new();
    let inbox = CommandInbox::new();
    assert!(inbox.push("capture_middle"));
    assert!(inbox.push("tap_card1\n"));

    assert!(dispatch(&mut rig, &inbox).is_empty());
    assert_eq!(rig.svc.position(), Position::Middle);
    assert_eq!(rig.svc.operation(), Operation::MovingToCard1);

    rig.run_until_quiet(5_000);
    assert_eq!(rig.svc.position(), Position::Middle);
}

#[test]
fn json_timed_command_dispatches() {
    let mut rig = Rig::at_middle();
    let inbox = CommandInbox::new();
    assert!(inbox.push(r#"{"action": "retract_for_time", "duration_ms": 250}"#));
    assert!(dispatch(&mut rig, &inbox).is_empty());
    assert_eq!(rig.svc.state_label(), "timed_retracting");

    rig.run_for(260);
    assert!(rig.sink.events.contains(&AppEvent::TimedComplete("retract_complete")));
}

#[test]
fn bad_payloads_are_reported_and_skipped() {
    let mut rig = Rig::at_middle();
    let inbox = CommandInbox::new();
    inbox.push("dance");
    inbox.push(r#"{"action": "extend_for_time"}"#);
    inbox.push("{not json");
    inbox.push("extend");

    let errors = dispatch(&mut rig, &inbox);
    assert_eq!(
        errors,
        [
            CommandError::UnknownVerb,
            CommandError::MissingDuration("extend_for_time"),
            CommandError::InvalidJson,
        ]
    );
    // The valid command after the bad ones still ran.
    assert_eq!(rig.hw.drive(), DriveState::Extending);
}

#[test]
fn power_verb_switches_profile_for_next_sequence() {
    let mut rig = Rig::at_middle();
    let inbox = CommandInbox::new();
    inbox.push("power_usb");
    inbox.push("tap_card2");
    dispatch(&mut rig, &inbox);
    assert_eq!(rig.svc.power_source(), PowerSource::Usb);

    let took = rig.run_until_quiet(20_000);
    let usb = PowerSource::Usb.profile();
    let nominal = usb.card2_from_home_ms + usb.card2_tap_pause_ms + usb.card2_to_home_ms;
    assert!(took >= nominal);
    assert!(took <= nominal + 3 * POLL_MS);

    inbox.push("power_12v");
    dispatch(&mut rig, &inbox);
    assert_eq!(rig.svc.power_source(), PowerSource::Volt12);
}

#[test]
fn stop_verb_interrupts_sequence() {
    let mut rig = Rig::at_middle();
    let inbox = CommandInbox::new();
    inbox.push("tap_card2");
    dispatch(&mut rig, &inbox);
    rig.run_for(200);
    inbox.push("stop");
    dispatch(&mut rig, &inbox);
    assert_eq!(rig.svc.operation(), Operation::Idle);
    assert_eq!(rig.svc.position(), Position::Unknown);
    assert_eq!(rig.hw.drive(), DriveState::Idle);
}

#[test]
fn global_inbox_round_trip() {
    assert!(inbox::push_command("manual_extend"));
    let mut seen = Vec::new();
    inbox::drain_commands(|p| seen.push(TapperCommand::decode(p).ok()));
    assert_eq!(seen, [Some(TapperCommand::ManualExtend)]);
}

// ── Status publication ────────────────────────────────────────

struct PublishingRig {
    svc: TapperService,
    hw: MockHardware,
    sink: (RecordingSink, StatusPublisher<MockTransport>),
    now: u32,
}

impl PublishingRig {
    fn new(transport: MockTransport) -> Self {
        let config = TapperConfig::default();
        let id = device_id(&read_mac());
        let publisher = StatusPublisher::new(transport, &config.status_topic_prefix, &id);
        let mut rig = Self {
            svc: TapperService::new(&config),
            hw: MockHardware::new(),
            sink: (RecordingSink::new(), publisher),
            now: 0,
        };
        rig.svc.start(Millis(0), &mut rig.hw, &mut rig.sink);
        rig.svc.capture_middle(Millis(0), &mut rig.hw, &mut rig.sink);
        rig.sink.1.transport_mut().messages.clear();
        rig
    }

    fn run_until_quiet(&mut self) {
        while self.svc.is_busy() {
            self.now += POLL_MS;
            self.svc.update(Millis(self.now), &mut self.hw, &mut self.sink);
            assert!(self.now < 20_000, "never went quiet");
        }
    }

    fn payloads(&self) -> Vec<&str> {
        self.sink.1.transport().payloads()
    }
}

#[test]
fn tap_sequence_publishes_drive_changes_and_summary() {
    let mut rig = PublishingRig::new(MockTransport::default());
    assert_eq!(rig.sink.1.topic(), "tappers/tapper-efcafe/status");

    rig.svc.tap_card1(Millis(0), &mut rig.hw, &mut rig.sink);
    rig.run_until_quiet();

    assert_eq!(
        rig.payloads(),
        [
            "extending",
            "idle",
            "retracting",
            "idle",
            "Position: middle, Operation: idle, Power: 12V"
        ]
    );
    assert!(
        rig.sink
            .1
            .transport()
            .messages
            .iter()
            .all(|(topic, _)| topic == "tappers/tapper-efcafe/status")
    );
}

#[test]
fn timed_and_legacy_completions_are_published() {
    let mut rig = PublishingRig::new(MockTransport::default());
    rig.svc
        .drive_for_time(DriveState::Extending, 100, Millis(0), &mut rig.hw, &mut rig.sink);
    rig.run_until_quiet();
    assert_eq!(rig.payloads(), ["extending", "idle", "extend_complete"]);

    rig.sink.1.transport_mut().messages.clear();
    rig.svc.tap(Millis(rig.now), &mut rig.hw, &mut rig.sink);
    rig.run_until_quiet();
    assert_eq!(
        rig.payloads(),
        ["extending", "idle", "retracting", "idle", "idle"]
    );
}

#[test]
fn capture_publishes_summary() {
    let mut rig = PublishingRig::new(MockTransport::default());
    rig.svc.capture_middle(Millis(5), &mut rig.hw, &mut rig.sink);
    assert_eq!(
        rig.payloads(),
        ["idle", "Position: middle, Operation: idle, Power: 12V"]
    );
}

#[test]
fn offline_transport_never_blocks_motion() {
    let mut rig = PublishingRig::new(MockTransport {
        offline: true,
        ..MockTransport::default()
    });
    rig.svc.tap_card2(Millis(0), &mut rig.hw, &mut rig.sink);
    rig.run_until_quiet();

    assert_eq!(rig.svc.position(), Position::Middle);
    assert!(rig.payloads().is_empty());
    assert_eq!(rig.sink.1.counters(), (0, 0));
    // Local log sink still saw the completion.
    assert_eq!(
        rig.sink
            .0
            .count(|e| matches!(e, AppEvent::SequenceComplete(_))),
        1
    );
}

#[test]
fn reconnect_announces_current_state() {
    let mut rig = PublishingRig::new(MockTransport::default());

    // First session comes up while idle.
    rig.sink.1.poll(rig.svc.state_label()).unwrap();
    rig.sink.1.poll(rig.svc.state_label()).unwrap();
    assert_eq!(rig.payloads(), ["idle"]);

    // Link drops mid-sequence; changes made while offline are lost.
    rig.sink.1.transport_mut().messages.clear();
    rig.sink.1.transport_mut().offline = true;
    rig.sink.1.poll(rig.svc.state_label()).unwrap();
    rig.svc.tap_card2(Millis(rig.now), &mut rig.hw, &mut rig.sink);
    assert!(rig.payloads().is_empty());

    // Back online: the broker learns where the motor is, exactly once.
    rig.sink.1.transport_mut().offline = false;
    rig.sink.1.poll(rig.svc.state_label()).unwrap();
    rig.sink.1.poll(rig.svc.state_label()).unwrap();
    assert_eq!(rig.payloads(), ["moving_to_card2"]);

    rig.run_until_quiet();
    assert_eq!(rig.payloads().last(), Some(&"Position: middle, Operation: idle, Power: 12V"));
}
