//! Peripheral drivers used by the emulator loop.

pub mod watchdog;
