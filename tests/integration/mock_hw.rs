//! Mock adapters for integration tests.
//!
//! Records every H-bridge write and every emitted event so tests can
//! assert on the full history without touching real GPIO.

use tapper::app::events::AppEvent;
use tapper::app::ports::{ActuatorPort, EventSink, StatusTransport};
use tapper::app::service::TapperService;
use tapper::config::TapperConfig;
use tapper::error::TransportError;
use tapper::fsm::context::DriveState;
use tapper::timing::Millis;

// ── MockHardware ──────────────────────────────────────────────

#[derive(Default)]
pub struct MockHardware {
    pub calls: Vec<DriveState>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Level currently on the bridge.
    pub fn drive(&self) -> DriveState {
        self.calls.last().copied().unwrap_or_default()
    }
}

impl ActuatorPort for MockHardware {
    fn apply_drive(&mut self, drive: DriveState) {
        self.calls.push(drive);
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── MockTransport ─────────────────────────────────────────────

#[derive(Default)]
pub struct MockTransport {
    pub offline: bool,
    /// Session established and announced, as the MQTT adapter tracks it.
    pub subscribed: bool,
    pub messages: Vec<(String, String)>,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn payloads(&self) -> Vec<&str> {
        self.messages.iter().map(|(_, p)| p.as_str()).collect()
    }
}

impl StatusTransport for MockTransport {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), TransportError> {
        if self.offline {
            return Err(TransportError::NotConnected);
        }
        self.messages.push((topic.to_owned(), payload.to_owned()));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.offline
    }

    fn poll(&mut self) -> Result<bool, TransportError> {
        if self.offline {
            self.subscribed = false;
            return Ok(false);
        }
        let fresh = !self.subscribed;
        self.subscribed = true;
        Ok(fresh)
    }
}

// ── Rig: service + mocks + simulated clock ────────────────────

pub const POLL_MS: u32 = 20;

pub struct Rig {
    pub svc: TapperService,
    pub hw: MockHardware,
    pub sink: RecordingSink,
    pub now: u32,
}

#[allow(dead_code)]
impl Rig {
    pub fn new() -> Self {
        Self::with_config(TapperConfig::default())
    }

    pub fn with_config(config: TapperConfig) -> Self {
        Self::starting_at(config, 0)
    }

    pub fn starting_at(config: TapperConfig, now: u32) -> Self {
        let mut rig = Self {
            svc: TapperService::new(&config),
            hw: MockHardware::new(),
            sink: RecordingSink::new(),
            now,
        };
        rig.svc.start(Millis(now), &mut rig.hw, &mut rig.sink);
        rig
    }

    /// Started and calibrated at middle; histories cleared.
    pub fn at_middle() -> Self {
        let mut rig = Self::new();
        rig.svc.capture_middle(Millis(rig.now), &mut rig.hw, &mut rig.sink);
        rig.hw.calls.clear();
        rig.sink.clear();
        rig
    }

    pub fn millis(&self) -> Millis {
        Millis(self.now)
    }

    /// One control-loop iteration at an absolute time.
    pub fn tick_at(&mut self, ms: u32) {
        self.now = ms;
        self.svc.update(Millis(ms), &mut self.hw, &mut self.sink);
    }

    /// Poll every `POLL_MS` for `duration_ms`.
    pub fn run_for(&mut self, duration_ms: u32) {
        let end = self.now.wrapping_add(duration_ms);
        while end.wrapping_sub(self.now) >= POLL_MS {
            let next = self.now.wrapping_add(POLL_MS);
            self.tick_at(next);
        }
    }

    /// Poll every `POLL_MS` until Idle with no controlled work; returns
    /// the time it took.
    pub fn run_until_quiet(&mut self, limit_ms: u32) -> u32 {
        let start = self.now;
        while self.svc.is_busy() {
            let next = self.now.wrapping_add(POLL_MS);
            self.tick_at(next);
            assert!(
                self.now.wrapping_sub(start) <= limit_ms,
                "still busy after {}ms in {}",
                limit_ms,
                self.svc.state_label()
            );
        }
        self.now.wrapping_sub(start)
    }
}
