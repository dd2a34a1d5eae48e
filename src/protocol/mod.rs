//! Kasa local protocol — cipher, framing, request decoding, replies and
//! per-plug command dispatch.
//!
//! ```text
//!  bytes ─▶ codec ─▶ request ─▶ handler ─▶ response ─▶ codec ─▶ bytes
//! ```

pub mod cipher;
pub mod codec;
pub mod handler;
pub mod request;
pub mod response;

use crate::plug::PlugId;
use crate::plug::registry::MAX_PLUG_COUNT;

/// One encoded payload ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// The plug answering, or `None` for request-level errors.
    pub plug: Option<PlugId>,
    pub payload: Vec<u8>,
}

/// Every reply a single request can produce. Targets are capped at the
/// registry size, so one slot per plug (or unknown child id) suffices.
pub type Replies = heapless::Vec<Reply, MAX_PLUG_COUNT>;
