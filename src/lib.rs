//! ESPSense firmware library.
//!
//! Emulates one or more TP-Link Kasa HS110 smart plugs so that home
//! energy hubs can read power data from arbitrary sensors. The protocol
//! core (plugs, telemetry, discovery, commands) is pure logic; sockets,
//! Wi-Fi and timers live in the adapter and network modules. All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

#[cfg(all(target_os = "espidf", not(feature = "espidf")))]
compile_error!("device builds need the `espidf` feature (enabled by default)");

pub mod app;
pub mod config;
pub mod discovery;
pub mod error;
pub mod plug;
pub mod protocol;
pub mod telemetry;

// Platform-facing modules; hardware paths are cfg-gated inside.
pub mod adapters;
pub mod drivers;
pub mod net;
