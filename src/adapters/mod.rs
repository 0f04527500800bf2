//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter            | Implements       | Connects to                |
//! |--------------------|------------------|----------------------------|
//! | `log_sink`         | EventSink        | Serial log output          |
//! | `status_publisher` | EventSink        | any `StatusTransport`      |
//! | `mqtt`             | StatusTransport  | ESP-IDF MQTT client        |
//! | `time`             | ClockPort        | ESP32 system timer         |
//! | `device_id`        | -                | eFuse MAC                  |
//!
//! The H-bridge `ActuatorPort` lives in [`crate::drivers::hbridge`].

pub mod device_id;
pub mod log_sink;
#[cfg(feature = "espidf")]
pub mod mqtt;
pub mod status_publisher;
pub mod time;
