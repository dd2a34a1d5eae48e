//! Bounded per-tick request pump.
//!
//! Each call to [`Server::poll`]:
//! 1. **Drain** — receive at most `budget` pending payloads.
//! 2. **Route** — hand each to the [`EmulatorService`].
//! 3. **Throttle** — pass every reply through a token bucket (via
//!    `burster`) so a broadcast storm cannot saturate the radio.
//! 4. **Send** — fire-and-forget to the sender, then close the exchange.
//!
//! Nothing here blocks; leftover payloads wait for the next tick.

use core::time::Duration;

use burster::Limiter;
use log::{debug, warn};

use super::transport::DatagramTransport;
use crate::app::events::EmulatorEvent;
use crate::app::ports::{ClockPort, EventSink, SensorPort};
use crate::app::service::EmulatorService;
use crate::protocol::codec::MAX_REQUEST_SIZE;

/// Outcome of one poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub received: usize,
    pub sent: usize,
    pub throttled: usize,
    pub send_errors: usize,
}

// ── Reply rate limiter ───────────────────────────────────────

/// Token bucket shared by every reply a server sends.
pub struct ReplyLimiter {
    bucket: burster::TokenBucket<fn() -> Duration>,
}

impl Default for ReplyLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplyLimiter {
    pub fn new() -> Self {
        Self {
            bucket: burster::TokenBucket::new_with_time_provider(
                40,
                40, // 40 replies per second, 40 burst capacity
                platform_now as fn() -> Duration,
            ),
        }
    }

    /// Consume one token; returns `false` when exhausted.
    pub fn allow(&mut self) -> bool {
        self.bucket.try_consume(1).is_ok()
    }
}

// ── Server ───────────────────────────────────────────────────

/// One listener plus its receive buffer and limiter.
pub struct Server<T: DatagramTransport> {
    name: &'static str,
    transport: T,
    limiter: ReplyLimiter,
    budget: u8,
    /// One byte larger than any valid request so oversize is detectable.
    buf: [u8; MAX_REQUEST_SIZE + 1],
}

impl<T: DatagramTransport> Server<T> {
    pub fn new(name: &'static str, transport: T, budget: u8) -> Self {
        Self {
            name,
            transport,
            limiter: ReplyLimiter::new(),
            budget: budget.max(1),
            buf: [0; MAX_REQUEST_SIZE + 1],
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Drain and answer up to `budget` pending requests.
    pub fn poll(
        &mut self,
        service: &mut EmulatorService,
        sensors: &impl SensorPort,
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) -> PollStats {
        let mut stats = PollStats::default();

        for _ in 0..self.budget {
            let (n, peer) = match self.transport.recv_from(&mut self.buf) {
                Ok(Some(r)) => r,
                Ok(None) => break,
                Err(e) => {
                    warn!("{}: {}", self.name, e);
                    break;
                }
            };
            stats.received += 1;
            debug!("{}: {} bytes from {}", self.name, n, peer);

            let replies = service.handle_datagram(&self.buf[..n], sensors, clock, sink);
            for reply in &replies {
                if !self.limiter.allow() {
                    stats.throttled += 1;
                    continue;
                }
                match self.transport.send_to(&reply.payload, peer) {
                    Ok(()) => stats.sent += 1,
                    Err(_) => stats.send_errors += 1,
                }
            }
            self.transport.end_exchange(peer);
        }

        if stats.throttled > 0 {
            warn!("{}: rate limit dropped {} reply(ies)", self.name, stats.throttled);
            sink.emit(&EmulatorEvent::RepliesThrottled {
                dropped: stats.throttled,
            });
        }
        stats
    }
}

// ── Platform time for rate limiter ───────────────────────────

#[cfg(target_os = "espidf")]
fn platform_now() -> Duration {
    let us = unsafe { esp_idf_sys::esp_timer_get_time() };
    Duration::from_micros(us as u64)
}

#[cfg(not(target_os = "espidf"))]
fn platform_now() -> Duration {
    use std::time::Instant;
    static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
    START.get_or_init(Instant::now).elapsed()
}
