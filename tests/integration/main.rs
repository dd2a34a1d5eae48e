//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that drives the emulator through a
//! mock transport, exactly as the UDP/TCP servers do on the device. All
//! tests run on the host (x86_64) with no sockets or hardware required.

mod command_tests;
mod discovery_tests;
mod mock_net;
