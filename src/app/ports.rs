//! Port traits — the hexagonal boundary between the emulation engine and
//! the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ EmulatorService (domain)
//! ```
//!
//! Driven adapters (sensor table, clock, event sinks) implement these
//! traits. The [`EmulatorService`](super::service::EmulatorService)
//! consumes them via generics, so the protocol core never touches a
//! socket or a peripheral directly.

use crate::plug::SensorRef;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: sensor subsystem → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port onto the externally owned sensor table.
///
/// Plugs hold [`SensorRef`] indices only. A reference that resolves to
/// nothing (unknown index, or a sensor that has not published yet) must
/// return `None` rather than panic.
pub trait SensorPort {
    /// Latest reading for `sensor`, or `None` if it has no state.
    fn reading(&self, sensor: SensorRef) -> Option<f32>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time source.
pub trait ClockPort {
    /// Milliseconds since boot.
    fn uptime_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`EmulatorEvent`](super::events::EmulatorEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::EmulatorEvent);
}
