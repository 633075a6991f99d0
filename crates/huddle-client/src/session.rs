//! Chat session state machine.
//!
//! [`ChatSession`] owns the lifecycle of one chat connection: for the active
//! room it opens a connection, loads prior messages, appends live-arriving
//! messages in delivery order, and provides the send operation. It is pure
//! state machine logic: no I/O dependencies, fully testable in simulation.
//!
//! # Connection lifecycle
//!
//! ```text
//! Idle --select R--> Connecting --opened--> (fetch) --loaded--> Connected
//!   ^                    |                                         |
//!   +----select 0 / teardown / close-before-open on room switch----+
//! ```
//!
//! Switching rooms always emits `CloseConnection` before `OpenConnection`,
//! so at most one connection is live at any time and a stale room's
//! subscription can never feed the new room's history. History is fetched
//! before subscribing, never concurrently, so a live message cannot be
//! overwritten by a late-arriving fetch response.

use huddle_proto::{ChatMessage, OutboundChat, ROOM_NONE, RoomId, SEND_CHAT_MESSAGE, UserId, room_topic};

use crate::event::{SessionAction, SessionEvent};

/// Connection state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No room selected; no connection, empty history.
    Idle,
    /// Connection opening, or open with history still loading.
    Connecting,
    /// Connected and subscribed; sends are accepted.
    Connected,
    /// Connect or fetch failed. No automatic retry; re-selecting the room
    /// starts over.
    Failed,
}

/// Per-room chat session state machine.
///
/// Owns the message history for the active room and the (logical) connection
/// handle. The connection itself is an action-level resource: the session
/// decides when to acquire and release it, the caller performs the I/O.
#[derive(Debug, Clone)]
pub struct ChatSession {
    /// Our user id, stamped on outbound messages.
    sender_id: UserId,
    /// Active room. `ROOM_NONE` in the chat list view.
    room_id: RoomId,
    /// Monotonic counter invalidating in-flight continuations on room
    /// switches and teardown.
    generation: u64,
    /// Connection state.
    state: SessionState,
    /// Message history for the active room, oldest first.
    history: Vec<ChatMessage>,
}

impl ChatSession {
    /// Create an idle session for the given user.
    pub fn new(sender_id: UserId) -> Self {
        Self {
            sender_id,
            room_id: ROOM_NONE,
            generation: 0,
            state: SessionState::Idle,
            history: Vec::new(),
        }
    }

    /// Process an event and return actions for the caller to execute in
    /// order.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionAction> {
        match event {
            SessionEvent::RoomSelected { room_id } => self.select_room(room_id),
            SessionEvent::ConnectionOpened { generation } => {
                if !self.is_current(generation) || self.state != SessionState::Connecting {
                    return stale("connection opened", generation);
                }
                vec![SessionAction::FetchHistory { room_id: self.room_id, generation }]
            },
            SessionEvent::ConnectionFailed { generation, reason } => {
                if !self.is_current(generation) {
                    return stale("connection failure", generation);
                }
                self.state = SessionState::Failed;
                vec![SessionAction::Log { message: format!("connection failed: {reason}") }]
            },
            SessionEvent::HistoryLoaded { generation, messages } => {
                if !self.is_current(generation) || self.state != SessionState::Connecting {
                    return stale("history response", generation);
                }
                // Wholesale replace, then subscribe: the subscription only
                // starts appending once the baseline is in place.
                self.history = messages;
                self.state = SessionState::Connected;
                vec![SessionAction::Subscribe { topic: room_topic(self.room_id) }]
            },
            SessionEvent::HistoryFetchFailed { generation, reason } => {
                if !self.is_current(generation) {
                    return stale("history failure", generation);
                }
                self.state = SessionState::Failed;
                vec![
                    SessionAction::CloseConnection,
                    SessionAction::Log { message: format!("history fetch failed: {reason}") },
                ]
            },
            SessionEvent::MessageDelivered { generation, body } => {
                if !self.is_current(generation) || self.state != SessionState::Connected {
                    return stale("message delivery", generation);
                }
                match serde_json::from_slice::<ChatMessage>(&body) {
                    Ok(message) => {
                        // Delivery order is authoritative: append only, no
                        // reorder, no dedup.
                        self.history.push(message);
                        Vec::new()
                    },
                    Err(e) => vec![SessionAction::Log {
                        message: format!("dropping malformed message payload: {e}"),
                    }],
                }
            },
            SessionEvent::Teardown => self.teardown(),
        }
    }

    /// Send a chat message to the active room.
    ///
    /// Requires an open connection; otherwise the message is dropped with
    /// only a log action, matching the platform's no-feedback behavior.
    /// There is no local echo: the sender sees its own message when the
    /// broker delivers it back on the room topic.
    pub fn send(&self, body: impl Into<String>) -> Vec<SessionAction> {
        if self.state != SessionState::Connected || self.room_id == ROOM_NONE {
            return vec![SessionAction::Log {
                message: "send dropped: no active connection".to_string(),
            }];
        }

        let outbound = OutboundChat {
            room_id: self.room_id,
            sender_id: self.sender_id,
            message: body.into(),
        };
        match serde_json::to_vec(&outbound) {
            Ok(payload) => vec![SessionAction::Publish {
                destination: SEND_CHAT_MESSAGE.to_string(),
                body: payload,
            }],
            Err(e) => {
                vec![SessionAction::Log { message: format!("send dropped: encode failed: {e}") }]
            },
        }
    }

    fn select_room(&mut self, room_id: RoomId) -> Vec<SessionAction> {
        // Re-selecting the active room is a no-op unless the session failed,
        // in which case it is the retry path.
        if room_id == self.room_id && self.state != SessionState::Failed {
            return Vec::new();
        }

        let mut actions = Vec::new();
        if self.owns_connection() {
            // Close-before-open: the previous room's connection is released
            // before the new one is acquired.
            actions.push(SessionAction::CloseConnection);
        }

        self.generation += 1;
        self.history.clear();
        self.room_id = room_id;

        if room_id == ROOM_NONE {
            self.state = SessionState::Idle;
        } else {
            self.state = SessionState::Connecting;
            actions.push(SessionAction::OpenConnection { generation: self.generation });
        }
        actions
    }

    fn teardown(&mut self) -> Vec<SessionAction> {
        let mut actions = Vec::new();
        if self.owns_connection() {
            actions.push(SessionAction::CloseConnection);
        }
        self.generation += 1;
        self.room_id = ROOM_NONE;
        self.history.clear();
        self.state = SessionState::Idle;
        actions
    }

    /// Whether the session currently owns a live-or-pending connection.
    fn owns_connection(&self) -> bool {
        matches!(self.state, SessionState::Connecting | SessionState::Connected)
    }

    fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// Active room. [`ROOM_NONE`] in the chat list view.
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Our user id.
    pub fn sender_id(&self) -> UserId {
        self.sender_id
    }

    /// Current generation, for tagging completion events.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Connection state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether sends are currently accepted.
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Message history for the active room, oldest first.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Apply an arbitrary edit to the history, e.g. pruning by the UI.
    ///
    /// This is the only external mutation path; live appends and fetch
    /// replaces stay internal to the session.
    pub fn edit_history(&mut self, edit: impl FnOnce(&mut Vec<ChatMessage>)) {
        edit(&mut self.history);
    }
}

fn stale(what: &str, generation: u64) -> Vec<SessionAction> {
    vec![SessionAction::Log {
        message: format!("dropping stale {what} (generation {generation})"),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(sender_id: UserId, body: &str) -> ChatMessage {
        ChatMessage {
            sent_at: "2021-08-12 10:00:00".into(),
            body: body.into(),
            sender_id,
            sender_name: format!("user-{sender_id}"),
        }
    }

    fn delivered(generation: u64, message: &ChatMessage) -> SessionEvent {
        SessionEvent::MessageDelivered {
            generation,
            body: serde_json::to_vec(message).unwrap(),
        }
    }

    /// Drive the full connect handshake for a room.
    fn connect(session: &mut ChatSession, room_id: RoomId, history: Vec<ChatMessage>) {
        let actions = session.handle(SessionEvent::RoomSelected { room_id });
        assert!(actions.contains(&SessionAction::OpenConnection { generation: session.generation() }));

        let generation = session.generation();
        let actions = session.handle(SessionEvent::ConnectionOpened { generation });
        assert_eq!(actions, vec![SessionAction::FetchHistory { room_id, generation }]);

        let actions = session.handle(SessionEvent::HistoryLoaded { generation, messages: history });
        assert_eq!(actions, vec![SessionAction::Subscribe { topic: room_topic(room_id) }]);
        assert!(session.is_connected());
    }

    #[test]
    fn idle_session_has_no_room_and_no_history() {
        let session = ChatSession::new(1);
        assert_eq!(session.room_id(), ROOM_NONE);
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.history().is_empty());
    }

    #[test]
    fn room_switch_closes_before_opening() {
        let mut session = ChatSession::new(1);
        connect(&mut session, 5, vec![]);

        let actions = session.handle(SessionEvent::RoomSelected { room_id: 7 });
        assert_eq!(actions, vec![
            SessionAction::CloseConnection,
            SessionAction::OpenConnection { generation: session.generation() },
        ]);
        assert_eq!(session.state(), SessionState::Connecting);
        assert!(session.history().is_empty());
    }

    #[test]
    fn first_room_select_opens_without_close() {
        let mut session = ChatSession::new(1);
        let actions = session.handle(SessionEvent::RoomSelected { room_id: 5 });
        assert_eq!(actions, vec![SessionAction::OpenConnection { generation: 1 }]);
    }

    #[test]
    fn history_replaces_exactly_before_any_live_append() {
        let mut session = ChatSession::new(1);
        let fetched = vec![msg(9, "a"), msg(9, "b"), msg(2, "c")];
        connect(&mut session, 5, fetched.clone());
        assert_eq!(session.history(), fetched.as_slice());
    }

    #[test]
    fn live_messages_append_in_delivery_order() {
        let mut session = ChatSession::new(1);
        connect(&mut session, 5, vec![msg(9, "base")]);

        let generation = session.generation();
        let live = [msg(2, "m1"), msg(9, "m2"), msg(2, "m3")];
        for message in &live {
            assert_eq!(session.handle(delivered(generation, message)), vec![]);
        }

        let bodies: Vec<&str> = session.history().iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["base", "m1", "m2", "m3"]);
    }

    #[test]
    fn scenario_fetch_then_live() {
        // Room id transitions 0 -> 5; fetch resolves with one message, then
        // a live message arrives. History must be exactly ["hi", "there"].
        let mut session = ChatSession::new(1);
        connect(&mut session, 5, vec![msg(9, "hi")]);
        session.handle(delivered(session.generation(), &msg(9, "there")));

        let bodies: Vec<&str> = session.history().iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["hi", "there"]);
    }

    #[test]
    fn send_publishes_exact_wire_payload() {
        let mut session = ChatSession::new(1);
        connect(&mut session, 5, vec![]);

        let actions = session.send("hello");
        let [SessionAction::Publish { destination, body }] = actions.as_slice() else {
            panic!("expected a single publish, got {actions:?}");
        };
        assert_eq!(destination, SEND_CHAT_MESSAGE);
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(body).unwrap(),
            serde_json::json!({"room_id": 5, "sender_id": 1, "message": "hello"})
        );
    }

    #[test]
    fn send_is_noop_while_disconnected() {
        let session = ChatSession::new(1);
        let actions = session.send("hello");
        assert!(!actions.iter().any(|a| matches!(a, SessionAction::Publish { .. })));
    }

    #[test]
    fn send_is_noop_while_connecting() {
        let mut session = ChatSession::new(1);
        session.handle(SessionEvent::RoomSelected { room_id: 5 });
        let actions = session.send("hello");
        assert!(!actions.iter().any(|a| matches!(a, SessionAction::Publish { .. })));
    }

    #[test]
    fn send_does_not_locally_echo() {
        let mut session = ChatSession::new(1);
        connect(&mut session, 5, vec![]);
        session.send("hello");
        assert!(session.history().is_empty());
    }

    #[test]
    fn stale_connection_opened_is_dropped() {
        let mut session = ChatSession::new(1);
        session.handle(SessionEvent::RoomSelected { room_id: 5 });
        let old_generation = session.generation();

        // Fast switch before the first connect completes.
        session.handle(SessionEvent::RoomSelected { room_id: 7 });

        let actions = session.handle(SessionEvent::ConnectionOpened { generation: old_generation });
        assert!(!actions.iter().any(|a| matches!(a, SessionAction::FetchHistory { .. })));
        assert_eq!(session.state(), SessionState::Connecting);
    }

    #[test]
    fn stale_history_response_is_dropped() {
        let mut session = ChatSession::new(1);
        session.handle(SessionEvent::RoomSelected { room_id: 5 });
        let old_generation = session.generation();
        session.handle(SessionEvent::ConnectionOpened { generation: old_generation });

        // Switch rooms while the fetch is in flight.
        session.handle(SessionEvent::RoomSelected { room_id: 7 });

        session.handle(SessionEvent::HistoryLoaded {
            generation: old_generation,
            messages: vec![msg(9, "stale")],
        });
        assert!(session.history().is_empty());
        assert!(!session.is_connected());
    }

    #[test]
    fn stale_delivery_is_dropped() {
        let mut session = ChatSession::new(1);
        connect(&mut session, 5, vec![]);
        let old_generation = session.generation();

        session.handle(SessionEvent::RoomSelected { room_id: 7 });

        session.handle(delivered(old_generation, &msg(9, "late")));
        assert!(session.history().is_empty());
    }

    #[test]
    fn malformed_payload_is_rejected_not_appended() {
        let mut session = ChatSession::new(1);
        connect(&mut session, 5, vec![]);

        let actions = session.handle(SessionEvent::MessageDelivered {
            generation: session.generation(),
            body: b"not json at all".to_vec(),
        });
        assert!(matches!(actions.as_slice(), [SessionAction::Log { .. }]));
        assert!(session.history().is_empty());
    }

    #[test]
    fn connection_failure_is_logged_without_retry() {
        let mut session = ChatSession::new(1);
        session.handle(SessionEvent::RoomSelected { room_id: 5 });

        let actions = session.handle(SessionEvent::ConnectionFailed {
            generation: session.generation(),
            reason: "refused".into(),
        });
        assert!(matches!(actions.as_slice(), [SessionAction::Log { .. }]));
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn failed_room_can_be_reselected() {
        let mut session = ChatSession::new(1);
        session.handle(SessionEvent::RoomSelected { room_id: 5 });
        session.handle(SessionEvent::ConnectionFailed {
            generation: session.generation(),
            reason: "refused".into(),
        });

        let actions = session.handle(SessionEvent::RoomSelected { room_id: 5 });
        assert!(actions.contains(&SessionAction::OpenConnection { generation: session.generation() }));
    }

    #[test]
    fn reselecting_active_room_is_noop() {
        let mut session = ChatSession::new(1);
        connect(&mut session, 5, vec![msg(9, "hi")]);

        let actions = session.handle(SessionEvent::RoomSelected { room_id: 5 });
        assert!(actions.is_empty());
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn fetch_failure_releases_connection() {
        let mut session = ChatSession::new(1);
        session.handle(SessionEvent::RoomSelected { room_id: 5 });
        let generation = session.generation();
        session.handle(SessionEvent::ConnectionOpened { generation });

        let actions = session.handle(SessionEvent::HistoryFetchFailed {
            generation,
            reason: "503".into(),
        });
        assert_eq!(actions.first(), Some(&SessionAction::CloseConnection));
        assert_eq!(session.state(), SessionState::Failed);
        assert!(session.history().is_empty());
    }

    #[test]
    fn selecting_room_none_closes_and_clears() {
        let mut session = ChatSession::new(1);
        connect(&mut session, 5, vec![msg(9, "hi")]);

        let actions = session.handle(SessionEvent::RoomSelected { room_id: ROOM_NONE });
        assert_eq!(actions, vec![SessionAction::CloseConnection]);
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.history().is_empty());
    }

    #[test]
    fn teardown_closes_connection() {
        let mut session = ChatSession::new(1);
        connect(&mut session, 5, vec![]);

        let actions = session.handle(SessionEvent::Teardown);
        assert_eq!(actions, vec![SessionAction::CloseConnection]);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn teardown_while_idle_emits_nothing() {
        let mut session = ChatSession::new(1);
        assert!(session.handle(SessionEvent::Teardown).is_empty());
    }

    #[test]
    fn edit_history_applies_caller_edit() {
        let mut session = ChatSession::new(1);
        connect(&mut session, 5, vec![msg(9, "a"), msg(9, "b")]);

        session.edit_history(|history| history.retain(|m| m.body != "a"));
        let bodies: Vec<&str> = session.history().iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["b"]);
    }
}
