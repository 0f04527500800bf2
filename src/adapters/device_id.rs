//! Fallback device identity derived from the ESP32 factory MAC address.
//!
//! Produces a stable ID of the form `tapper-xxyyzz` (last 3 bytes of the
//! 6-byte MAC in lowercase hex), used in the MQTT topics and client ID
//! when the deployment does not assign one.

use core::fmt::Write;

/// Fixed-size device ID string.
pub type DeviceIdString = heapless::String<24>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(feature = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(feature = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// `tapper-xxyyzz`.
pub fn device_id(mac: &MacAddress) -> DeviceIdString {
    let mut id = DeviceIdString::new();
    let _ = write!(id, "tapper-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    id
}
