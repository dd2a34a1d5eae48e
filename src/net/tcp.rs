//! TCP listener for the Kasa local protocol.
//!
//! Hub software switches to TCP after UDP discovery. Each request arrives
//! as one length-prefixed encrypted frame (see
//! [`codec`](crate::protocol::codec)); the plug answers with one framed
//! reply per responding plug and then closes the connection, as a real
//! HS110 does.
//!
//! ## Connection model
//!
//! 1. `bind()` opens a non-blocking listener.
//! 2. `recv_from()` accepts waiting clients (up to [`MAX_TCP_CLIENTS`]),
//!    then polls each client once and feeds its bytes to a per-client
//!    [`FrameDecoder`].
//! 3. `send_to()` frames and writes a reply to the client at `peer`,
//!    giving up after [`SEND_TIMEOUT_MS`] if the client stops reading.
//! 4. `end_exchange()` closes that client.
//!
//! Clients that hang up, error, or sit idle past [`CLIENT_IDLE_MS`] are
//! dropped.

use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use super::transport::DatagramTransport;
use crate::error::TransportError;
use crate::protocol::codec::{FrameDecoder, encode_frame};

/// Concurrent TCP clients served.
pub const MAX_TCP_CLIENTS: usize = 2;

/// A client that has not completed a request within this window is closed.
pub const CLIENT_IDLE_MS: u64 = 5_000;

/// Longest a single reply write may stall the loop.
pub const SEND_TIMEOUT_MS: u64 = 250;

/// Bytes read from one client per poll.
const READ_CHUNK: usize = 256;

struct Client {
    stream: TcpStream,
    peer: SocketAddr,
    decoder: Box<FrameDecoder>,
    since: Instant,
    closed: bool,
}

pub struct TcpTransport {
    listener: TcpListener,
    clients: heapless::Vec<Client, MAX_TCP_CLIENTS>,
}

impl TcpTransport {
    /// Bind to `0.0.0.0:<port>` in non-blocking mode.
    pub fn bind(port: u16) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port)))
            .map_err(|_| TransportError::BindFailed)?;
        listener
            .set_nonblocking(true)
            .map_err(|_| TransportError::BindFailed)?;

        info!("TCP: listening on port {}", port);
        Ok(Self {
            listener,
            clients: heapless::Vec::new(),
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr().ok()
    }

    /// Clients currently connected.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    fn accept_pending(&mut self) {
        while !self.clients.is_full() {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if stream.set_nonblocking(true).is_err() {
                        warn!("TCP: failed to set non-blocking on client socket");
                        continue;
                    }
                    debug!("TCP: client connected from {}", peer);
                    let _ = self.clients.push(Client {
                        stream,
                        peer,
                        decoder: Box::new(FrameDecoder::new()),
                        since: Instant::now(),
                        closed: false,
                    });
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("TCP: accept error: {}", e);
                    break;
                }
            }
        }
    }

    fn reap(&mut self) {
        let idle = Duration::from_millis(CLIENT_IDLE_MS);
        self.clients.retain(|c| {
            let keep = !c.closed && c.since.elapsed() < idle;
            if !keep {
                debug!("TCP: closing {}", c.peer);
            }
            keep
        });
    }
}

impl DatagramTransport for TcpTransport {
    fn recv_from(&mut self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>, TransportError> {
        self.accept_pending();

        let mut chunk = [0u8; READ_CHUNK];
        let mut found = None;
        for client in &mut self.clients {
            if client.closed {
                continue;
            }
            match client.stream.read(&mut chunk) {
                Ok(0) => client.closed = true,
                Ok(n) => {
                    // One request per connection: bytes after the first
                    // complete frame are discarded.
                    if let (_, Some(frame)) = client.decoder.feed(&chunk[..n]) {
                        let len = frame.len().min(buf.len());
                        buf[..len].copy_from_slice(&frame[..len]);
                        found = Some((len, client.peer));
                        break;
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {}
                Err(e) => {
                    debug!("TCP: read error from {}: {}", client.peer, e);
                    client.closed = true;
                }
            }
        }

        self.reap();
        Ok(found)
    }

    fn send_to(&mut self, data: &[u8], peer: SocketAddr) -> Result<(), TransportError> {
        let client = self
            .clients
            .iter_mut()
            .find(|c| c.peer == peer && !c.closed)
            .ok_or(TransportError::SendFailed)?;
        let frame = encode_frame(data);
        let result = client
            .stream
            .set_nonblocking(false)
            .and_then(|()| {
                client
                    .stream
                    .set_write_timeout(Some(Duration::from_millis(SEND_TIMEOUT_MS)))
            })
            .and_then(|()| client.stream.write_all(&frame))
            .and_then(|()| client.stream.flush());
        if let Err(e) = result {
            warn!("TCP: send to {} failed: {}", peer, e);
            client.closed = true;
            return Err(TransportError::SendFailed);
        }
        Ok(())
    }

    fn end_exchange(&mut self, peer: SocketAddr) {
        for c in self.clients.iter_mut().filter(|c| c.peer == peer) {
            c.closed = true;
        }
        self.reap();
    }
}
