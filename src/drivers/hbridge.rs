//! Linear actuator H-bridge driver (two logic inputs).
//!
//! | Drive      | IN1  | IN2  |
//! |------------|------|------|
//! | Idle       | LOW  | LOW  |
//! | Extending  | HIGH | LOW  |
//! | Retracting | LOW  | HIGH |
//!
//! ## Safety contract
//!
//! Both inputs high shorts the bridge.  Every change lowers the pins that
//! must go low before raising the one that must go high, so the
//! forbidden combination never appears even transiently.  A failed
//! write drops both inputs.
//!
//! ## Dual-target design
//!
//! Generic over `embedded-hal` output pins: ESP-IDF `PinDriver`s on the
//! target, recording mocks on the host.

use embedded_hal::digital::OutputPin;
use log::{debug, error};

use crate::app::ports::ActuatorPort;
use crate::error::ActuatorError;
use crate::fsm::context::DriveState;

pub struct HBridge<A, B> {
    in1: A,
    in2: B,
    state: DriveState,
}

impl<A: OutputPin, B: OutputPin> HBridge<A, B> {
    /// Take both pins and drive them low.
    pub fn new(in1: A, in2: B) -> Self {
        let mut bridge = Self {
            in1,
            in2,
            state: DriveState::Idle,
        };
        bridge.release();
        bridge
    }

    pub fn state(&self) -> DriveState {
        self.state
    }

    fn write(&mut self, drive: DriveState) -> Result<(), ActuatorError> {
        let (in1_high, in2_high) = drive.pin_levels();

        // Lows first.
        if !in1_high {
            self.in1.set_low().map_err(|_| ActuatorError::GpioWriteFailed)?;
        }
        if !in2_high {
            self.in2.set_low().map_err(|_| ActuatorError::GpioWriteFailed)?;
        }
        if in1_high {
            self.in1.set_high().map_err(|_| ActuatorError::GpioWriteFailed)?;
        }
        if in2_high {
            self.in2.set_high().map_err(|_| ActuatorError::GpioWriteFailed)?;
        }
        Ok(())
    }

    /// Best effort: both inputs low, ignoring individual failures.
    fn release(&mut self) {
        let a = self.in1.set_low();
        let b = self.in2.set_low();
        if a.is_err() || b.is_err() {
            error!("H-bridge: could not release inputs");
        }
        self.state = DriveState::Idle;
    }
}

impl<A: OutputPin, B: OutputPin> ActuatorPort for HBridge<A, B> {
    fn apply_drive(&mut self, drive: DriveState) {
        match self.write(drive) {
            Ok(()) => {
                debug!("H-bridge: {}", drive.label());
                self.state = drive;
            }
            Err(e) => {
                error!("H-bridge: {} while applying {}", e, drive.label());
                self.release();
                self.state = DriveState::Idle;
            }
        }
    }
}
