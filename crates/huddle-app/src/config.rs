//! Session configuration.

use huddle_proto::UserId;

/// Injected configuration for a chat session.
///
/// Endpoints are always passed in by the embedding application; nothing in
/// this workspace hard-codes broker or API addresses.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// STOMP-over-WebSocket broker URL, e.g. `wss://host:8080/stomp/chat`.
    pub broker_url: String,
    /// Base URL of the REST API serving history and room creation.
    pub rest_base_url: String,
    /// Id of the signed-in user, stamped on outbound messages.
    pub sender_id: UserId,
}
