//! Tapper firmware library.
//!
//! Exposes the motion core and its adapters for integration testing and
//! for the firmware binary.  ESP-IDF-specific code is guarded by
//! `#[cfg(feature = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod drift;
pub mod error;
pub mod fsm;
pub mod inbox;
pub mod legacy_tap;
pub mod pins;
pub mod safety;
pub mod timed;
pub mod timing;

pub mod adapters;
pub mod drivers;
