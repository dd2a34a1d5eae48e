//! Payload framing for the Kasa local protocol.
//!
//! UDP carries one request per datagram, either plaintext JSON or the
//! autokey-encrypted form. TCP wraps the encrypted form in a length
//! prefix:
//! ```text
//! ┌────────────┬──────────────────────────────┐
//! │ Length (4B)│ Encrypted JSON payload (N B) │
//! │ BE u32     │                              │
//! └────────────┴──────────────────────────────┘
//! ```
//!
//! [`FrameDecoder`] accumulates stream bytes and yields complete payloads.
//! A single socket read may return part of the header, part of the
//! payload, or several frames back to back.

use super::cipher;
use crate::error::{MalformedReason, ProtocolError};

/// Largest request accepted on either transport.
pub const MAX_REQUEST_SIZE: usize = 1024;

/// Frame header size (4-byte big-endian length).
const HEADER_SIZE: usize = 4;

/// How a payload travels on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Plaintext,
    Encrypted,
}

impl Encoding {
    /// The encoding a plug with this `encrypt` flag replies in.
    pub const fn for_plug(encrypt: bool) -> Self {
        if encrypt { Self::Encrypted } else { Self::Plaintext }
    }
}

/// Strip the cipher (if any) from a received payload.
///
/// A payload whose first non-whitespace byte is `{` is taken as
/// plaintext; anything else is decrypted. No valid encrypted request
/// starts with ASCII whitespace or `{`: a JSON document's first byte
/// never encrypts to either.
pub fn decode_datagram(data: &[u8]) -> Result<(Vec<u8>, Encoding), ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::MalformedDatagram(MalformedReason::Empty));
    }
    if data.len() > MAX_REQUEST_SIZE {
        return Err(ProtocolError::MalformedDatagram(MalformedReason::Oversized));
    }
    if data.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'{') {
        Ok((data.to_vec(), Encoding::Plaintext))
    } else {
        Ok((cipher::decrypt(data), Encoding::Encrypted))
    }
}

/// Apply `encoding` to a serialised reply.
pub fn encode_payload(mut json: Vec<u8>, encoding: Encoding) -> Vec<u8> {
    if encoding == Encoding::Encrypted {
        cipher::encrypt_in_place(&mut json);
    }
    json
}

// ───────────────────────────────────────────────────────────────
// Stream framing (TCP)
// ───────────────────────────────────────────────────────────────

/// Decoder state machine.
enum DecoderState {
    /// Waiting for header bytes.
    ReadingHeader { collected: usize },
    /// Header received, reading payload.
    ReadingPayload { expected: usize, collected: usize },
    /// Oversized frame announced; discarding its payload.
    Skipping { remaining: usize },
}

/// Streaming length-prefix decoder, one per TCP client.
pub struct FrameDecoder {
    state: DecoderState,
    header_buf: [u8; HEADER_SIZE],
    payload_buf: [u8; MAX_REQUEST_SIZE],
    rejected: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::ReadingHeader { collected: 0 },
            header_buf: [0; HEADER_SIZE],
            payload_buf: [0; MAX_REQUEST_SIZE],
            rejected: 0,
        }
    }

    /// Feed bytes into the decoder.
    ///
    /// Returns the number of bytes of `data` consumed and, when a frame
    /// completed, its payload. Bytes after a completed frame are left for
    /// the next call so back-to-back frames are never lost.
    pub fn feed(&mut self, data: &[u8]) -> (usize, Option<&[u8]>) {
        let mut offset = 0;

        while offset < data.len() {
            let available = data.len() - offset;
            match &mut self.state {
                DecoderState::ReadingHeader { collected } => {
                    let to_copy = (HEADER_SIZE - *collected).min(available);
                    self.header_buf[*collected..*collected + to_copy]
                        .copy_from_slice(&data[offset..offset + to_copy]);
                    *collected += to_copy;
                    offset += to_copy;

                    if *collected == HEADER_SIZE {
                        let expected = u32::from_be_bytes(self.header_buf) as usize;
                        self.state = if expected == 0 {
                            self.rejected += 1;
                            DecoderState::ReadingHeader { collected: 0 }
                        } else if expected > MAX_REQUEST_SIZE {
                            self.rejected += 1;
                            DecoderState::Skipping {
                                remaining: expected,
                            }
                        } else {
                            DecoderState::ReadingPayload {
                                expected,
                                collected: 0,
                            }
                        };
                    }
                }

                DecoderState::ReadingPayload { expected, collected } => {
                    let to_copy = (*expected - *collected).min(available);
                    self.payload_buf[*collected..*collected + to_copy]
                        .copy_from_slice(&data[offset..offset + to_copy]);
                    *collected += to_copy;
                    offset += to_copy;

                    if *collected == *expected {
                        let len = *expected;
                        self.state = DecoderState::ReadingHeader { collected: 0 };
                        return (offset, Some(&self.payload_buf[..len]));
                    }
                }

                DecoderState::Skipping { remaining } => {
                    let n = (*remaining).min(available);
                    *remaining -= n;
                    offset += n;
                    if *remaining == 0 {
                        self.state = DecoderState::ReadingHeader { collected: 0 };
                    }
                }
            }
        }

        (offset, None)
    }

    /// Frames dropped for a zero or oversized length.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    /// Reset decoder state (e.g. when a client slot is reused).
    pub fn reset(&mut self) {
        self.state = DecoderState::ReadingHeader { collected: 0 };
        self.rejected = 0;
    }
}

/// Wrap an already encoded payload as `[BE-u32 length][payload]`.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}
