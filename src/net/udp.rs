//! UDP listener for the Kasa local protocol.
//!
//! One socket bound to `0.0.0.0:<port>` with `SO_BROADCAST` enabled and
//! non-blocking reads. `recv_from` returns `Ok(None)` instead of blocking
//! so the cooperative loop never stalls. lwIP on ESP-IDF exposes the same
//! `std::net` API as the host, so there is one implementation.

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};

use log::{info, warn};

use super::transport::DatagramTransport;
use crate::error::TransportError;

pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Bind to `0.0.0.0:<port>`. Pass port `0` to let the OS pick a free
    /// port (use [`local_addr()`](Self::local_addr) to discover it).
    pub fn bind(port: u16) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(SocketAddr::from(([0, 0, 0, 0], port)))
            .map_err(|_| TransportError::BindFailed)?;
        socket
            .set_nonblocking(true)
            .map_err(|_| TransportError::BindFailed)?;
        socket
            .set_broadcast(true)
            .map_err(|_| TransportError::BindFailed)?;

        info!("UDP: listening on port {}", port);
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.local_addr().ok()
    }
}

impl DatagramTransport for UdpTransport {
    fn recv_from(&mut self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>, TransportError> {
        match self.socket.recv_from(buf) {
            Ok((n, peer)) => Ok(Some((n, peer))),
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            // ICMP port-unreachable from an earlier reply surfaces here on
            // some stacks; it says nothing about this socket.
            Err(ref e) if e.kind() == ErrorKind::ConnectionReset => Ok(None),
            Err(e) => {
                warn!("UDP: receive error: {}", e);
                Err(TransportError::ReceiveFailed)
            }
        }
    }

    fn send_to(&mut self, data: &[u8], peer: SocketAddr) -> Result<(), TransportError> {
        match self.socket.send_to(data, peer) {
            Ok(n) if n == data.len() => Ok(()),
            Ok(_) => Err(TransportError::PayloadTooLarge),
            Err(e) => {
                warn!("UDP: send to {} failed: {}", peer, e);
                Err(TransportError::SendFailed)
            }
        }
    }
}
