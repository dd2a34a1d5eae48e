//! Transport abstraction — any request/reply channel carrying Kasa
//! payloads.
//!
//! Concrete implementations:
//! - UDP socket on port 9999 (discovery broadcasts and unicast commands)
//! - TCP listener on port 9999 (length-prefixed frames, one exchange per
//!   connection)
//!
//! The [`Server`](super::server::Server) loop is generic over
//! `DatagramTransport`, so both listeners share the same bounded polling
//! and rate limiting.

use std::net::SocketAddr;

use crate::error::TransportError;

/// Non-blocking request/reply channel.
pub trait DatagramTransport {
    /// Receive one request payload into `buf`.
    ///
    /// Returns `Ok(None)` when nothing is pending. A payload longer than
    /// `buf` is truncated to `buf.len()`.
    fn recv_from(&mut self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>, TransportError>;

    /// Send one reply payload to `peer`. Fire-and-forget: no retry.
    fn send_to(&mut self, data: &[u8], peer: SocketAddr) -> Result<(), TransportError>;

    /// Every reply to `peer`'s request has been sent.
    fn end_exchange(&mut self, _peer: SocketAddr) {}
}
