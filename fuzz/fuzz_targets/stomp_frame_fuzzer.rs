//! Fuzz target for STOMP frame decoding
//!
//! This fuzzer tests frame decoding with arbitrary byte sequences to find:
//! - Parser crashes or panics
//! - Integer overflows in content-length handling
//! - Buffer over-reads on truncated frames
//! - Header escape sequences that bypass validation
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error,
//! and any frame that decodes must survive an encode/decode round trip.

#![no_main]

use huddle_proto::stomp::Frame;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Decoding arbitrary bytes should never panic, only return Err
    let Ok(frame) = Frame::decode(data) else {
        return;
    };

    // A decoded frame re-encodes to something that decodes back to itself
    let encoded = frame.encode();
    let reparsed = Frame::decode(&encoded).expect("re-encoded frame must decode");
    assert_eq!(reparsed.command, frame.command);
    assert_eq!(reparsed.body, frame.body);
});
