//! GPIO pin assignments for the tapper driver board.
//!
//! Single source of truth: `main` builds the H-bridge drivers from these
//! numbers rather than from named `Peripherals` fields.

// ---------------------------------------------------------------------------
// Linear actuator H-bridge (L298N / DRV8871 style, two logic inputs)
// ---------------------------------------------------------------------------

/// IN1: HIGH with IN2 LOW extends the rod.
pub const MOTOR_IN1_GPIO: i32 = 12;
/// IN2: HIGH with IN1 LOW retracts the rod.
pub const MOTOR_IN2_GPIO: i32 = 13;

/// ESP32 GPIOs that can drive an output: not the SPI flash bank (6-11)
/// and not the input-only bank (34-39).
const fn output_capable(gpio: i32) -> bool {
    matches!(gpio, 0..=5 | 12..=33)
}

const _: () = assert!(MOTOR_IN1_GPIO != MOTOR_IN2_GPIO);
const _: () = assert!(output_capable(MOTOR_IN1_GPIO) && output_capable(MOTOR_IN2_GPIO));
