//! Unified error types for the ESPSense firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping
//! the top-level loop's error handling uniform. All variants are `Copy`
//! so they can be passed through the protocol handler and logged without
//! allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A request could not be decoded or answered.
    Protocol(ProtocolError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// A socket operation failed.
    Transport(TransportError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol(e) => write!(f, "protocol: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Protocol errors
// ---------------------------------------------------------------------------

/// Failures raised while decoding or dispatching a Kasa request.
///
/// None of these are fatal: the command handler turns each one into an
/// error reply or a logged drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// Truncated, oversized or unparsable payload.
    MalformedDatagram(MalformedReason),
    /// The request named a plug that is not registered.
    UnknownPlug,
    /// Unrecognised module or method.
    UnsupportedCommand,
    /// Method parameters are missing or out of range.
    InvalidArgument,
    /// A bound sensor has no current reading.
    SensorUnavailable,
}

impl ProtocolError {
    /// Kasa wire error code for this failure.
    pub const fn err_code(self) -> i32 {
        match self {
            Self::MalformedDatagram(_) => -4,
            Self::UnknownPlug => -14,
            Self::UnsupportedCommand => -2,
            Self::InvalidArgument => -3,
            Self::SensorUnavailable => -5,
        }
    }

    /// Kasa wire error message for this failure.
    pub const fn err_msg(self) -> &'static str {
        match self {
            Self::MalformedDatagram(_) => "malformed request",
            Self::UnknownPlug => "entry not exist",
            Self::UnsupportedCommand => "member not support",
            Self::InvalidArgument => "invalid argument",
            Self::SensorUnavailable => "sensor unavailable",
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedDatagram(reason) => write!(f, "malformed datagram ({reason})"),
            Self::UnknownPlug => write!(f, "unknown plug"),
            Self::UnsupportedCommand => write!(f, "unsupported command"),
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::SensorUnavailable => write!(f, "sensor unavailable"),
        }
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

/// Why a datagram was rejected before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    /// Zero-length payload.
    Empty,
    /// Payload exceeds the request buffer.
    Oversized,
    /// Decrypted bytes are not valid UTF-8 JSON.
    NotJson,
    /// JSON parsed but the top level is not an object of modules.
    NotObject,
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::Oversized => write!(f, "oversized"),
            Self::NotJson => write!(f, "not JSON"),
            Self::NotObject => write!(f, "not an object"),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors raised while loading or validating [`EmulatorConfig`](crate::config::EmulatorConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The document could not be deserialised.
    Parse,
    /// A field failed validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// More plugs than the registry can hold.
    TooManyPlugs,
    /// Two plugs share a name.
    DuplicatePlug,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse => write!(f, "config could not be parsed"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::TooManyPlugs => write!(f, "too many plugs"),
            Self::DuplicatePlug => write!(f, "duplicate plug name"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The socket could not be bound to the protocol port.
    BindFailed,
    /// A receive call failed for a reason other than "no data".
    ReceiveFailed,
    /// A send call failed.
    SendFailed,
    /// The payload does not fit the frame or datagram buffer.
    PayloadTooLarge,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BindFailed => write!(f, "bind failed"),
            Self::ReceiveFailed => write!(f, "receive failed"),
            Self::SendFailed => write!(f, "send failed"),
            Self::PayloadTooLarge => write!(f, "payload too large"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
