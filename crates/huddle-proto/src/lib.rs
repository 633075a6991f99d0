//! Wire formats for the huddle chat client.
//!
//! The broker speaks STOMP 1.2 over WebSocket; message bodies and the REST
//! endpoints carry JSON. This crate owns both layers:
//!
//! - [`stomp`]: a minimal STOMP frame codec (the client-side subset)
//! - [`payloads`]: the JSON payload types whose field names are fixed by the
//!   server and must not drift
//!
//! Destination strings live here too, next to the payloads they carry, so the
//! session and transport layers never hard-code routing paths.

#![forbid(unsafe_code)]

pub mod errors;
pub mod payloads;
pub mod stomp;

pub use errors::{ProtocolError, Result};
pub use payloads::{
    ChatMessage, CreateRoomData, CreateRoomRequest, Envelope, OutboundChat, RtcInvite,
};
pub use stomp::{Command, Frame};

/// User identifier, matching the platform's numeric primary keys.
pub type UserId = u64;

/// Chat room identifier.
pub type RoomId = u64;

/// Sentinel room id meaning "no room selected" (the chat list view).
pub const ROOM_NONE: RoomId = 0;

/// Destination for outbound chat messages.
pub const SEND_CHAT_MESSAGE: &str = "/send/chat/message";

/// Destination for video-call invitations.
pub const SEND_CHAT_RTC: &str = "/send/chat/messageRTC";

/// Per-room topic carrying live messages for `room_id`.
pub fn room_topic(room_id: RoomId) -> String {
    format!("/receive/chat/room/{room_id}")
}
