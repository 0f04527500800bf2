//! Actuator drivers.

pub mod hbridge;
