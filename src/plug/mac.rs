//! MAC address parsing, formatting and name-derived synthesis.
//!
//! Hub software identifies Kasa plugs by MAC, so every emulated plug
//! needs a distinct one. Plugs without a configured MAC get either the
//! device's factory MAC (first plug only) or a locally-derived address
//! built from the FNV-1 hash of the plug name.

use core::fmt::Write;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Formatted `XX:XX:XX:XX:XX:XX` string (17 chars).
pub type MacString = heapless::String<17>;

/// Prefix bytes for synthesised MACs (`35:4B`).
const SYNTH_PREFIX: [u8; 2] = [53, 75];

const FNV1_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV1_PRIME: u32 = 16_777_619;

/// 32-bit FNV-1 hash (multiply, then XOR).
pub fn fnv1_hash(s: &str) -> u32 {
    s.bytes().fold(FNV1_OFFSET_BASIS, |hash, b| {
        hash.wrapping_mul(FNV1_PRIME) ^ u32::from(b)
    })
}

/// Derive a stable fake MAC from a plug name: `35:4B` followed by the
/// little-endian bytes of the name hash.
pub fn synthesize_mac(name: &str) -> MacAddress {
    let h = fnv1_hash(name).to_le_bytes();
    [SYNTH_PREFIX[0], SYNTH_PREFIX[1], h[0], h[1], h[2], h[3]]
}

/// Parse `XX:XX:XX:XX:XX:XX` (colon or dash separated, any case).
pub fn parse_mac(s: &str) -> Option<MacAddress> {
    let mut mac = [0u8; 6];
    let mut count = 0;
    for part in s.split([':', '-']) {
        if count >= 6 || part.len() != 2 {
            return None;
        }
        mac[count] = u8::from_str_radix(part, 16).ok()?;
        count += 1;
    }
    (count == 6).then_some(mac)
}

/// Format as uppercase `XX:XX:XX:XX:XX:XX`.
pub fn format_mac(mac: &MacAddress) -> MacString {
    let mut out = MacString::new();
    let _ = write!(
        out,
        "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
        mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
    );
    out
}
