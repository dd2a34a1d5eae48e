//! Outbound emulator events.
//!
//! The [`EmulatorService`](super::service::EmulatorService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.

use crate::error::ProtocolError;
use crate::plug::{PlugId, PlugName};
use crate::protocol::request::Verb;

/// Structured events emitted by the emulation engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EmulatorEvent {
    /// The service is up with this many plugs registered.
    Started { plugs: usize },

    /// A broadcast query was answered with one record per plug.
    DiscoveryAnswered { records: usize },

    /// A command was executed against one plug.
    CommandHandled { plug: PlugId, verb: Verb },

    /// A plug's virtual relay switched.
    RelayChanged { plug: PlugName, on: bool },

    /// A request named a plug that does not exist.
    UnknownPlug { target: heapless::String<40> },

    /// A request was rejected before dispatch (no reply sent).
    RequestDropped(ProtocolError),

    /// Replies were discarded by the transmit rate limiter.
    RepliesThrottled { dropped: usize },
}
