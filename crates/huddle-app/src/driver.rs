//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the session runtime from specific I/O
//! implementations. Each platform implements the trait, while the generic
//! [`crate::SessionRuntime`] handles all orchestration. This ensures the
//! same orchestration code runs against the real broker and in simulation.

use std::future::Future;

use huddle_proto::{ChatMessage, RoomId, RtcInvite, UserId};

/// Abstracts broker and REST I/O for the session runtime.
///
/// # Implementations
///
/// - **Net** (feature `net`): STOMP over WebSocket plus the REST API
/// - **Simulation**: in-memory channels and canned histories for tests
///
/// # Contract
///
/// At most one main connection is open at a time; [`Driver::open`] on an
/// already-open driver must replace the old connection. The runtime always
/// calls [`Driver::close`] before re-opening, so implementations may treat a
/// replacing `open` as a bug-tolerance path rather than the norm.
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Open the main broker connection.
    fn open(&mut self, broker_url: &str)
    -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Close the main broker connection. No-op when none is open.
    fn close(&mut self) -> impl Future<Output = ()> + Send;

    /// Subscribe the main connection to a room topic.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is closed or the send fails.
    fn subscribe(&mut self, topic: &str) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Publish a payload to a destination on the main connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is closed or the send fails.
    fn publish(
        &mut self,
        destination: &str,
        body: Vec<u8>,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receive the next inbound message body from the subscribed topic.
    ///
    /// Pends forever while no connection is open; returns `None` when the
    /// open connection's delivery stream ends.
    fn next_message(&mut self) -> impl Future<Output = Option<Vec<u8>>> + Send;

    /// Fetch a room's prior messages, oldest first.
    fn fetch_history(
        &mut self,
        room_id: RoomId,
    ) -> impl Future<Output = Result<Vec<ChatMessage>, Self::Error>> + Send;

    /// Create a two-party room, returning its id.
    fn create_room(
        &mut self,
        user_id1: UserId,
        user_id2: UserId,
    ) -> impl Future<Output = Result<RoomId, Self::Error>> + Send;

    /// Publish a call invitation over a separate short-lived connection,
    /// independent of the main one.
    fn send_call_invite(
        &mut self,
        broker_url: &str,
        invite: RtcInvite,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
