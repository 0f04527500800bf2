//! Status publisher: maps application events onto a message transport.
//!
//! Implements [`EventSink`].  Only the events remote clients rely on are
//! published on `<prefix>/<device>/status`:
//!
//! | Event                                | Payload                       |
//! |--------------------------------------|-------------------------------|
//! | `DriveChanged`                       | `extending` / `retracting` / `idle` |
//! | `TimedComplete`                      | `extend_complete` …           |
//! | `LegacyTapComplete`                  | `idle`                        |
//! | `SequenceComplete`, `PositionCaptured` | one-line status summary     |
//!
//! After the transport reports a (re)connect, [`StatusPublisher::poll`]
//! publishes the current state label once.
//!
//! Transport failures are logged and dropped; they never reach the core.

use core::fmt::Write;

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, StatusTransport};
use crate::error::TransportError;

pub type TopicString = heapless::String<64>;

/// `<prefix>/<device>/status`
pub fn status_topic(prefix: &str, device_id: &str) -> TopicString {
    topic(prefix, device_id, "status")
}

/// `<prefix>/<device>/command`
pub fn command_topic(prefix: &str, device_id: &str) -> TopicString {
    topic(prefix, device_id, "command")
}

fn topic(prefix: &str, device_id: &str, leaf: &str) -> TopicString {
    let mut t = TopicString::new();
    if write!(t, "{prefix}/{device_id}/{leaf}").is_err() {
        warn!("Topic for '{}' truncated", device_id);
    }
    t
}

pub struct StatusPublisher<T> {
    transport: T,
    topic: TopicString,
    published: u32,
    failed: u32,
}

impl<T: StatusTransport> StatusPublisher<T> {
    pub fn new(transport: T, prefix: &str, device_id: &str) -> Self {
        Self {
            transport,
            topic: status_topic(prefix, device_id),
            published: 0,
            failed: 0,
        }
    }

    pub fn topic(&self) -> &str {
        self.topic.as_str()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// `(published, failed)` since boot.
    pub fn counters(&self) -> (u32, u32) {
        (self.published, self.failed)
    }

    /// Service the transport.  After a (re)connect the broker may have
    /// missed every change made while offline, so `state_label` is
    /// published once.
    pub fn poll(&mut self, state_label: &str) -> Result<(), TransportError> {
        if self.transport.poll()? {
            info!("Status transport up, announcing '{}'", state_label);
            self.publish(state_label);
        }
        Ok(())
    }

    fn publish(&mut self, payload: &str) {
        if !self.transport.is_connected() {
            debug!("Status '{}' not sent: transport offline", payload);
            return;
        }
        match self.transport.publish(self.topic.as_str(), payload) {
            Ok(()) => {
                self.published = self.published.wrapping_add(1);
                debug!("Published {} -> {}", self.topic, payload);
            }
            Err(e) => {
                self.failed = self.failed.wrapping_add(1);
                warn!("Status publish failed ({}): {}", e, payload);
            }
        }
    }
}

impl<T: StatusTransport> EventSink for StatusPublisher<T> {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::DriveChanged(drive) => self.publish(drive.label()),
            AppEvent::TimedComplete(label) => self.publish(label),
            AppEvent::LegacyTapComplete => self.publish("idle"),
            AppEvent::SequenceComplete(report) | AppEvent::PositionCaptured(report) => {
                let line = report.summary();
                self.publish(&line);
            }
            _ => {}
        }
    }
}
