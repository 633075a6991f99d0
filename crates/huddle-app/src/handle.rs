//! Session handle exposed to UIs.

use huddle_proto::{ChatMessage, RoomId, UserId};
use thiserror::Error;
use tokio::sync::{mpsc, watch};

/// Closure type for caller-side history edits.
pub type HistoryEdit = Box<dyn FnOnce(&mut Vec<ChatMessage>) + Send>;

/// Commands the handle forwards to the runtime.
pub enum SessionCommand {
    /// Select a room (or [`huddle_proto::ROOM_NONE`] for the list view).
    SelectRoom {
        /// Newly selected room.
        room_id: RoomId,
    },
    /// Send a chat message to the active room.
    Send {
        /// Message text.
        body: String,
    },
    /// Publish a call invitation, creating the room first if needed.
    InitiateCallLink {
        /// Inviting user.
        from: UserId,
        /// Invited user, or the room id when `is_existing_room` is true.
        target: u64,
        /// Whether `target` is already a room id.
        is_existing_room: bool,
    },
    /// Apply a caller-side edit to the message history.
    EditHistory(HistoryEdit),
    /// Tear the session down and stop the runtime.
    Shutdown,
}

impl std::fmt::Debug for SessionCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelectRoom { room_id } => {
                f.debug_struct("SelectRoom").field("room_id", room_id).finish()
            },
            Self::Send { body } => f.debug_struct("Send").field("body", body).finish(),
            Self::InitiateCallLink { from, target, is_existing_room } => f
                .debug_struct("InitiateCallLink")
                .field("from", from)
                .field("target", target)
                .field("is_existing_room", is_existing_room)
                .finish(),
            Self::EditHistory(_) => f.write_str("EditHistory(..)"),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

/// The session runtime has stopped and can no longer accept commands.
#[derive(Debug, Clone, Copy, Error)]
#[error("session runtime has shut down")]
pub struct SessionClosed;

/// Handle to a running session.
///
/// Cloneable; all clones feed the same runtime. The message log and the
/// connected flag are exposed as `watch` channels so UIs subscribe to
/// updates instead of registering ad-hoc callbacks.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    history: watch::Receiver<Vec<ChatMessage>>,
    connected: watch::Receiver<bool>,
}

impl SessionHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<SessionCommand>,
        history: watch::Receiver<Vec<ChatMessage>>,
        connected: watch::Receiver<bool>,
    ) -> Self {
        Self { commands, history, connected }
    }

    /// Select a room, connecting to it and loading its history.
    pub async fn select_room(&self, room_id: RoomId) -> Result<(), SessionClosed> {
        self.command(SessionCommand::SelectRoom { room_id }).await
    }

    /// Send a chat message to the active room.
    ///
    /// Dropped silently (logged only) when no connection is open.
    pub async fn send(&self, body: impl Into<String>) -> Result<(), SessionClosed> {
        self.command(SessionCommand::Send { body: body.into() }).await
    }

    /// Publish a call invitation. When `is_existing_room` is false, `target`
    /// is a user id and a two-party room is created first.
    pub async fn initiate_call_link(
        &self,
        from: UserId,
        target: u64,
        is_existing_room: bool,
    ) -> Result<(), SessionClosed> {
        self.command(SessionCommand::InitiateCallLink { from, target, is_existing_room }).await
    }

    /// Apply an edit to the message history (e.g. pruning).
    pub async fn edit_history(
        &self,
        edit: impl FnOnce(&mut Vec<ChatMessage>) + Send + 'static,
    ) -> Result<(), SessionClosed> {
        self.command(SessionCommand::EditHistory(Box::new(edit))).await
    }

    /// Tear the session down and stop the runtime.
    pub async fn shutdown(&self) -> Result<(), SessionClosed> {
        self.command(SessionCommand::Shutdown).await
    }

    /// Subscribe to message-history updates.
    pub fn history(&self) -> watch::Receiver<Vec<ChatMessage>> {
        self.history.clone()
    }

    /// Subscribe to connection-state updates.
    pub fn connected(&self) -> watch::Receiver<bool> {
        self.connected.clone()
    }

    /// Snapshot of the current message history.
    pub fn latest_history(&self) -> Vec<ChatMessage> {
        self.history.borrow().clone()
    }

    /// Whether sends are currently accepted.
    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    async fn command(&self, command: SessionCommand) -> Result<(), SessionClosed> {
        self.commands.send(command).await.map_err(|_| SessionClosed)
    }
}
