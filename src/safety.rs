//! Free-running drive watchdog.
//!
//! Direct `extend` / `retract` commands run the motor with no end time.
//! The watchdog runs **every tick before the sequencer** and bounds that
//! case: once the drive has been moving for longer than the ceiling with
//! no controlled work in flight, it asks the service to stop.
//!
//! ## Lifecycle
//!
//! 1. Drive moving, no sequencer operation, timed hold or legacy tap:
//!    the first observation latches `moving_since`.
//! 2. Each later tick compares the elapsed time with the ceiling.
//! 3. Strictly greater → `evaluate` returns `true` and the latch resets.
//! 4. Controlled work, or a stopped drive, clears the latch.

use log::{error, info};

use crate::fsm::context::DriveState;
use crate::timing::Millis;

pub struct DriveWatchdog {
    ceiling_ms: u32,
    /// First tick at which an uncontrolled drive was observed.
    moving_since: Option<Millis>,
}

impl DriveWatchdog {
    pub const fn new(ceiling_ms: u32) -> Self {
        Self {
            ceiling_ms,
            moving_since: None,
        }
    }

    /// Returns `true` when the drive must be force-stopped now.
    ///
    /// `controlled` is true while a sequencer operation, a timed
    /// operation or a legacy tap owns the motor.
    pub fn evaluate(&mut self, now: Millis, drive: DriveState, controlled: bool) -> bool {
        if !drive.is_moving() || controlled {
            if self.moving_since.take().is_some() && !drive.is_moving() {
                info!("Watchdog: drive released, disarmed");
            }
            return false;
        }

        let since = *self.moving_since.get_or_insert(now);
        let elapsed = now.elapsed_since(since);
        if elapsed > self.ceiling_ms {
            error!(
                "SAFETY STOP: {} free-running for {}ms (limit {}ms)",
                drive.label(),
                elapsed,
                self.ceiling_ms
            );
            self.moving_since = None;
            return true;
        }
        false
    }
}
