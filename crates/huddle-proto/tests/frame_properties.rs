//! Property-based tests for the STOMP frame codec.
//!
//! Verifies that encoding is always parseable and structure-preserving for
//! arbitrary header and body content, including the octet-escaped characters.

use huddle_proto::stomp::{Command, Frame};
use proptest::prelude::*;

/// Header names: token-ish, never `content-length` (computed by the encoder).
fn header_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,15}".prop_filter("content-length is reserved", |n| n != "content-length")
}

/// Header values including the characters that require escaping.
fn header_value() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            8 => proptest::char::range('a', 'z').prop_map(|c| c.to_string()),
            1 => Just(":".to_string()),
            1 => Just("\\".to_string()),
            1 => Just("\n".to_string()),
            1 => Just("\r".to_string()),
            1 => Just("/".to_string()),
        ],
        0..24,
    )
    .prop_map(|parts| parts.concat())
}

fn escaping_command() -> impl Strategy<Value = Command> {
    prop_oneof![
        Just(Command::Send),
        Just(Command::Subscribe),
        Just(Command::Message),
        Just(Command::Disconnect),
    ]
}

proptest! {
    #[test]
    fn frame_round_trip(
        command in escaping_command(),
        headers in proptest::collection::vec((header_name(), header_value()), 0..6),
        body in proptest::collection::vec(any::<u8>(), 0..256),
    ) {
        let frame = Frame::new(command, headers, body);
        let parsed = Frame::decode(&frame.encode()).expect("encoded frame should parse");
        prop_assert_eq!(frame, parsed);
    }

    #[test]
    fn decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        let _ = Frame::decode(&bytes);
    }
}
