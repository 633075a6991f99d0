//! JSON payload types carried over the broker and the REST endpoints.
//!
//! Field names here are interop-critical: the server produces and consumes
//! these exact spellings (`create_date_time`, `chat_room_id`, ...), so serde
//! renames pin them while the Rust side keeps idiomatic names. Round-tripping
//! a payload must never change its JSON shape.

use serde::{Deserialize, Serialize};

use crate::{RoomId, UserId};

/// A chat message, as returned by the history endpoint and delivered live on
/// a room topic.
///
/// Messages are immutable once created. Ordering is send-time order as
/// observed by the broker; the client appends in delivery order and never
/// re-sorts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Server-side send timestamp, passed through verbatim.
    #[serde(rename = "create_date_time")]
    pub sent_at: String,

    /// Message text.
    #[serde(rename = "message")]
    pub body: String,

    /// Sender's user id.
    pub sender_id: UserId,

    /// Sender's display name at send time.
    pub sender_name: String,
}

/// Outbound chat message published to [`crate::SEND_CHAT_MESSAGE`].
///
/// The server echoes it back on the room topic as a [`ChatMessage`]; the
/// client does no local echo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundChat {
    /// Target room.
    pub room_id: RoomId,
    /// Sending user.
    pub sender_id: UserId,
    /// Message text.
    pub message: String,
}

/// Video-call invitation published to [`crate::SEND_CHAT_RTC`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtcInvite {
    /// Inviting user.
    pub user_id: UserId,
    /// Room hosting the call.
    pub room_id: RoomId,
}

/// REST request creating a two-party room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    /// First participant.
    pub user_id1: UserId,
    /// Second participant.
    pub user_id2: UserId,
}

/// Payload of a successful room-creation response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoomData {
    /// Id of the newly created room.
    pub chat_room_id: RoomId,
}

/// Standard REST response envelope: `{"data": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Wrapped response payload.
    pub data: T,
}
