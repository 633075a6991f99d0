//! Session events and actions.

use huddle_proto::{ChatMessage, RoomId};

/// Events the caller feeds into the session.
///
/// The caller is responsible for:
/// - Forwarding room selection from the UI
/// - Completing asynchronous steps (connect, history fetch) and reporting
///   their outcome
/// - Delivering inbound broker message bodies
///
/// Every event that completes an asynchronous step carries the `generation`
/// it was issued for (taken from the [`crate::SessionAction`] that requested
/// it). The session drops events whose generation no longer matches, so a
/// fast room switch cannot leak a stale continuation into the new room's
/// state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The UI selected a room. [`huddle_proto::ROOM_NONE`] returns to the
    /// chat list view.
    RoomSelected {
        /// Newly selected room.
        room_id: RoomId,
    },

    /// The connection requested by `OpenConnection` is established.
    ConnectionOpened {
        /// Generation of the `OpenConnection` action this answers.
        generation: u64,
    },

    /// The connection could not be established, or an established one died.
    ConnectionFailed {
        /// Generation of the connection this refers to.
        generation: u64,
        /// Human-readable failure description for logging.
        reason: String,
    },

    /// History fetch completed for the active room.
    HistoryLoaded {
        /// Generation of the `FetchHistory` action this answers.
        generation: u64,
        /// Full prior-message sequence, oldest first.
        messages: Vec<ChatMessage>,
    },

    /// History fetch failed. History keeps whatever it held; the session
    /// never substitutes fallback content.
    HistoryFetchFailed {
        /// Generation of the `FetchHistory` action this answers.
        generation: u64,
        /// Human-readable failure description for logging.
        reason: String,
    },

    /// A live message body arrived on the subscribed room topic.
    MessageDelivered {
        /// Generation of the connection that delivered it.
        generation: u64,
        /// Raw JSON body from the broker frame.
        body: Vec<u8>,
    },

    /// The caller is tearing the session down (unmount).
    Teardown,
}

/// Actions the session produces for the caller to execute.
///
/// Actions in one batch must be executed in order: room switches rely on
/// `CloseConnection` preceding `OpenConnection` so that at most one
/// connection is ever live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Open a broker connection for the active room.
    OpenConnection {
        /// Generation to tag the completion event with.
        generation: u64,
    },

    /// Close the currently open broker connection.
    CloseConnection,

    /// Fetch prior messages for a room via REST.
    FetchHistory {
        /// Room to fetch.
        room_id: RoomId,
        /// Generation to tag the completion event with.
        generation: u64,
    },

    /// Subscribe the open connection to a room topic.
    Subscribe {
        /// Topic path, e.g. `/receive/chat/room/5`.
        topic: String,
    },

    /// Publish a payload to a broker destination.
    Publish {
        /// Destination path.
        destination: String,
        /// JSON payload bytes.
        body: Vec<u8>,
    },

    /// Log message for debugging.
    Log {
        /// Log message.
        message: String,
    },
}
