//! Fuzz target: `FrameDecoder::feed`
//!
//! Drives arbitrary byte sequences into the TCP frame decoder and
//! asserts that it never panics, always makes progress, and never yields
//! a payload larger than one request.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use espsense::protocol::codec::{FrameDecoder, MAX_REQUEST_SIZE};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut decoder = FrameDecoder::new();

    let mut rest = data;
    while !rest.is_empty() {
        let (used, frame) = decoder.feed(rest);
        if let Some(payload) = frame {
            assert!(payload.len() <= MAX_REQUEST_SIZE, "payload exceeds MAX_REQUEST_SIZE");
            assert!(!payload.is_empty(), "decoder must not yield empty payload");
        }
        assert!(used > 0, "decoder must consume input");
        rest = &rest[used..];
    }

    // After a reset the decoder must accept bytes cleanly again.
    decoder.reset();
    let _ = decoder.feed(data);
});
