//! Tapper configuration parameters.
//!
//! All tunables for one actuator.  Defaults match the bench-calibrated
//! hardware; a JSON override document can replace any subset of fields.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::timing::PowerSource;

/// Upper bound (exclusive) on the control-loop period.  Longer periods
/// make the one-interval overshoot visible at the card.
pub const MAX_LOOP_INTERVAL_MS: u32 = 100;

/// Core tapper configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TapperConfig {
    // --- Timing ---
    /// Control loop interval (milliseconds)
    pub control_loop_interval_ms: u32,

    // --- Safety ---
    /// Longest free-running drive before the watchdog stops it (milliseconds)
    pub safety_timeout_ms: u32,

    // --- Drift ---
    /// Correction added per completed tap (milliseconds)
    pub drift_per_tap_ms: u32,
    /// Ceiling of the per-card correction (milliseconds)
    pub max_drift_ms: u32,

    // --- Power ---
    /// Timing profile selected at boot
    pub power_source: PowerSource,

    // --- Status ---
    /// First segment of the status topic, `<prefix>/<device>/status`
    pub status_topic_prefix: String,
}

impl Default for TapperConfig {
    fn default() -> Self {
        Self {
            // Timing
            control_loop_interval_ms: 20, // 50 Hz

            // Safety
            safety_timeout_ms: 5000,

            // Drift
            drift_per_tap_ms: 5,
            max_drift_ms: 50,

            // Power
            power_source: PowerSource::Volt12,

            // Status
            status_topic_prefix: String::from("tappers"),
        }
    }
}

impl TapperConfig {
    /// Reject values the control loop cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.control_loop_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("control loop interval is zero"));
        }
        if self.control_loop_interval_ms >= MAX_LOOP_INTERVAL_MS {
            return Err(ConfigError::ValidationFailed(
                "control loop interval must be below 100ms",
            ));
        }
        if self.safety_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("safety timeout is zero"));
        }
        if self.drift_per_tap_ms > self.max_drift_ms {
            return Err(ConfigError::ValidationFailed(
                "drift step exceeds drift cap",
            ));
        }
        if self.status_topic_prefix.is_empty() {
            return Err(ConfigError::ValidationFailed("status topic prefix is empty"));
        }
        Ok(())
    }

    /// Parse an override document.  Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|_| ConfigError::InvalidJson)?;
        config.validate()?;
        Ok(config)
    }
}
