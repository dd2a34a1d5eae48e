//! Application service — the hexagonal core.
//!
//! [`EmulatorService`] owns the plug registry, the telemetry aggregator,
//! the discovery responder and the command handler. It turns one received
//! payload into zero or more encoded replies. All I/O flows through port
//! traits injected at call sites, making the service testable without a
//! socket.
//!
//! ```text
//!  SensorPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                 │       EmulatorService         │
//!  ClockPort  ──▶ │ Discovery · Handler · Registry│ ──▶ Replies
//!                 └──────────────────────────────┘
//! ```

use log::{debug, info};

use crate::discovery::DiscoveryResponder;
use crate::error::ProtocolError;
use crate::plug::registry::PlugRegistry;
use crate::protocol::Replies;
use crate::protocol::codec::decode_datagram;
use crate::protocol::handler::CommandHandler;
use crate::protocol::request::parse_request;
use crate::telemetry::TelemetryAggregator;

use super::events::EmulatorEvent;
use super::ports::{ClockPort, EventSink, SensorPort};

/// Counters exposed for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceStats {
    pub discoveries: u32,
    pub commands: u32,
    pub errors: u32,
    pub dropped: u32,
}

// ───────────────────────────────────────────────────────────────
// EmulatorService
// ───────────────────────────────────────────────────────────────

/// Routes decoded requests to discovery or command handling.
pub struct EmulatorService {
    registry: PlugRegistry,
    telemetry: TelemetryAggregator,
    discovery: DiscoveryResponder,
    handler: CommandHandler,
    dropped: u32,
}

impl EmulatorService {
    /// Construct the service around a populated registry.
    pub fn new(registry: PlugRegistry) -> Self {
        Self {
            registry,
            telemetry: TelemetryAggregator::new(),
            discovery: DiscoveryResponder::new(),
            handler: CommandHandler::new(),
            dropped: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        sink.emit(&EmulatorEvent::Started {
            plugs: self.registry.len(),
        });
        info!("EmulatorService started with {} plug(s)", self.registry.len());
    }

    // ── Per-datagram orchestration ────────────────────────────

    /// Decode one payload and build every reply it calls for.
    ///
    /// Malformed input yields no replies: the sender's encoding cannot be
    /// trusted, so nothing is sent back.
    pub fn handle_datagram(
        &mut self,
        data: &[u8],
        sensors: &impl SensorPort,
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) -> Replies {
        let request = match decode_datagram(data)
            .and_then(|(json, encoding)| parse_request(&json, encoding))
        {
            Ok(request) => request,
            Err(e) => {
                self.drop_request(e, sink);
                return Replies::new();
            }
        };

        if request.is_discovery() {
            self.discovery.respond(
                &request,
                &self.registry,
                &mut self.telemetry,
                sensors,
                clock,
                sink,
            )
        } else {
            self.handler.handle(
                &request,
                &self.registry,
                &mut self.telemetry,
                sensors,
                clock,
                sink,
            )
        }
    }

    fn drop_request(&mut self, e: ProtocolError, sink: &mut impl EventSink) {
        self.dropped = self.dropped.wrapping_add(1);
        debug!("EmulatorService: dropping request ({})", e);
        sink.emit(&EmulatorEvent::RequestDropped(e));
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn registry(&self) -> &PlugRegistry {
        &self.registry
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            discoveries: self.discovery.answered(),
            commands: self.handler.handled(),
            errors: self.handler.rejected(),
            dropped: self.dropped,
        }
    }
}
