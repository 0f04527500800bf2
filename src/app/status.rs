//! Detailed status snapshot.
//!
//! One [`StatusReport`] is built on demand from the service and rendered
//! either as the one-line summary published after a sequence completes,
//! or as a JSON document for richer consumers.

use core::fmt::Write;

use serde::Serialize;

/// Point-in-time view of the actuator, suitable for logging or transmission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Composite label, see [`TapperService::state_label`](super::service::TapperService::state_label).
    pub state: &'static str,
    pub position: &'static str,
    pub operation: &'static str,
    pub drive: &'static str,
    pub power_source: &'static str,
    /// Any controlled work in flight.
    pub is_tapping: bool,
    /// Elapsed time of the in-progress manual measurement.
    pub manual_timing_ms: Option<u32>,
    /// Result of the most recent `manual_stop` measurement.
    pub last_measurement_ms: Option<u32>,
    pub drift_card1_ms: u32,
    pub drift_card2_ms: u32,
    pub positioning_method: &'static str,
}

impl StatusReport {
    pub const POSITIONING_METHOD: &'static str = "timing_based";

    /// `Position: p, Operation: o, Power: s[, Manual timing: Nms (active since manual start)]`
    pub fn summary(&self) -> String {
        let mut line = format!(
            "Position: {}, Operation: {}, Power: {}",
            self.position, self.operation, self.power_source
        );
        if let Some(ms) = self.manual_timing_ms {
            let _ = write!(line, ", {}", manual_timing_line(ms));
        }
        line
    }

    /// Full snapshot as JSON, logged at debug level next to the summary.
    pub fn to_json(&self) -> String {
        // Every field is a plain scalar or string; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Human-readable form of an active manual measurement.
pub fn manual_timing_line(elapsed_ms: u32) -> String {
    format!("Manual timing: {elapsed_ms}ms (active since manual start)")
}

/// Text returned by `timing_info` when nothing is being measured.
pub const NO_TIMING_MEASUREMENT: &str = "No timing measurement active";
