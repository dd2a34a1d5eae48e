//! Device identity derived from the ESP32 factory MAC address.
//!
//! The factory MAC is what the first MAC-less plug reports to hubs, so
//! the emulator shows up under the same address as the board's Wi-Fi
//! interface. It also names the station on the network
//! (`espsense-xxyyzz`).

use core::fmt::Write;

use crate::plug::mac::MacAddress;

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// Station hostname from the last 3 MAC bytes.
/// Format: `espsense-xxyyzz` (lowercase, 15 chars).
pub fn hostname(mac: &MacAddress) -> heapless::String<24> {
    let mut name = heapless::String::<24>::new();
    let _ = write!(name, "espsense-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    name
}
