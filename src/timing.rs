//! Power-source timing tables and wrap-safe millisecond arithmetic.
//!
//! The actuator has no position feedback: every movement is a timed
//! drive.  The durations below were measured on the 12 V external supply;
//! the USB column is derived from them with a fixed 2.3× slow-down
//! (rounded to the nearest millisecond) and precomputed at compile time.
//!
//! ```text
//!            extend ──▶                        ◀── retract
//!   CARD2 ────────────── MIDDLE ────────────── CARD1
//! (retracted)          (rest / home)          (extended)
//! ```

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Monotonic timestamps
// ---------------------------------------------------------------------------

/// Milliseconds since boot, as read from the monotonic clock.
///
/// Wraps at `u32::MAX` (~49.7 days).  All elapsed-time arithmetic goes
/// through [`Millis::elapsed_since`], which is correct across a wrap as
/// long as the measured interval itself is shorter than the wrap period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Millis(pub u32);

impl Millis {
    /// Milliseconds from `earlier` to `self`.
    pub const fn elapsed_since(self, earlier: Millis) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }

    /// Timestamp `ms` later than `self` (wrapping).
    pub const fn offset(self, ms: u32) -> Millis {
        Millis(self.0.wrapping_add(ms))
    }
}

/// Start time and target duration of the current phase.
///
/// The target is latched when the phase begins, so later changes to the
/// power source or drift only affect the phases that follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhaseTimer {
    pub started: Millis,
    pub duration_ms: u32,
}

impl PhaseTimer {
    pub const fn new(started: Millis, duration_ms: u32) -> Self {
        Self {
            started,
            duration_ms,
        }
    }

    pub const fn elapsed(&self, now: Millis) -> u32 {
        now.elapsed_since(self.started)
    }

    /// `true` once `elapsed >= duration`.
    pub const fn expired(&self, now: Millis) -> bool {
        self.elapsed(now) >= self.duration_ms
    }
}

// ---------------------------------------------------------------------------
// Power source
// ---------------------------------------------------------------------------

/// Supply feeding the H-bridge.  Selects the timing profile row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PowerSource {
    /// 12 V external supply, fast measured timings.
    #[default]
    #[serde(rename = "12V")]
    Volt12,
    /// USB 5 V, slow derived timings.
    #[serde(rename = "USB")]
    Usb,
}

impl PowerSource {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Volt12 => "12V",
            Self::Usb => "USB",
        }
    }

    pub const fn profile(self) -> &'static TimingProfile {
        match self {
            Self::Volt12 => &PROFILE_12V,
            Self::Usb => &PROFILE_USB,
        }
    }
}

impl core::fmt::Display for PowerSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Timing profile
// ---------------------------------------------------------------------------

/// Calibrated durations (ms) for one power source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimingProfile {
    /// Middle → Card 1 (extend).
    pub card1_from_home_ms: u32,
    /// Dwell pressed against Card 1.
    pub card1_tap_pause_ms: u32,
    /// Card 1 → middle (retract), before drift compensation.
    pub card1_to_home_ms: u32,
    /// Middle → Card 2 (retract).
    pub card2_from_home_ms: u32,
    /// Dwell pressed against Card 2.
    pub card2_tap_pause_ms: u32,
    /// Card 2 → middle (extend), before drift compensation.
    pub card2_to_home_ms: u32,
    /// Fully extended → middle (half of a full retract).
    pub home_from_extended_ms: u32,
    /// Fully retracted → middle (half of a full extend).
    pub home_from_retracted_ms: u32,
    /// End-to-end extend travel.
    pub extend_full_ms: u32,
    /// End-to-end retract travel.
    pub retract_full_ms: u32,
}

/// USB slow-down relative to 12 V, in tenths (2.3×).
pub const USB_SLOWDOWN_TENTHS: u32 = 23;

/// Scale a 12 V travel duration to USB power, rounding to nearest ms.
pub const fn usb_scaled(ms_12v: u32) -> u32 {
    (ms_12v * USB_SLOWDOWN_TENTHS + 5) / 10
}

/// Measured on the 12 V bench supply.
pub const PROFILE_12V: TimingProfile = TimingProfile {
    card1_from_home_ms: 1100,
    card1_tap_pause_ms: 1000,
    card1_to_home_ms: 1100,
    card2_from_home_ms: 1300,
    card2_tap_pause_ms: 1000,
    card2_to_home_ms: 1300,
    home_from_extended_ms: 1306,  // 2611 / 2
    home_from_retracted_ms: 1284, // 2568 / 2
    extend_full_ms: 2568,
    retract_full_ms: 2611,
};

/// Travel scaled by 2.3×; tap dwell is a press time, not travel, and is kept.
pub const PROFILE_USB: TimingProfile = TimingProfile {
    card1_from_home_ms: usb_scaled(PROFILE_12V.card1_from_home_ms),
    card1_tap_pause_ms: PROFILE_12V.card1_tap_pause_ms,
    card1_to_home_ms: usb_scaled(PROFILE_12V.card1_to_home_ms),
    card2_from_home_ms: usb_scaled(PROFILE_12V.card2_from_home_ms),
    card2_tap_pause_ms: PROFILE_12V.card2_tap_pause_ms,
    card2_to_home_ms: usb_scaled(PROFILE_12V.card2_to_home_ms),
    home_from_extended_ms: usb_scaled(PROFILE_12V.home_from_extended_ms),
    home_from_retracted_ms: usb_scaled(PROFILE_12V.home_from_retracted_ms),
    extend_full_ms: usb_scaled(PROFILE_12V.extend_full_ms),
    retract_full_ms: usb_scaled(PROFILE_12V.retract_full_ms),
};
