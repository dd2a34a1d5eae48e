//! Application core — plug emulation logic, zero I/O.
//!
//! This module routes decoded requests to discovery or command handling
//! and reports what happened. All interaction with sensors, time and
//! logging happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without a network.

pub mod events;
pub mod ports;
pub mod service;
