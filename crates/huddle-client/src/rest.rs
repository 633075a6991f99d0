//! REST collaborators: history fetch and room creation.
//!
//! Failures propagate to the caller as errors; there is no fallback content
//! and no retry here. The session keeps whatever history it had.

use huddle_proto::{ChatMessage, CreateRoomData, CreateRoomRequest, Envelope, RoomId, UserId};
use thiserror::Error;

/// REST endpoint errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level HTTP failure, including body decode.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("unexpected status {status} from {endpoint}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Endpoint that produced it.
        endpoint: String,
    },
}

/// Client for the chat REST endpoints.
///
/// Cheap to clone; the underlying `reqwest` client is a shared handle.
#[derive(Debug, Clone)]
pub struct ChatApi {
    base_url: String,
    http: reqwest::Client,
}

impl ChatApi {
    /// Create an API client for the given base URL (trailing slashes are
    /// tolerated).
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url, http: reqwest::Client::new() }
    }

    /// Fetch the full prior-message history of a room, oldest first.
    pub async fn fetch_history(&self, room_id: RoomId) -> Result<Vec<ChatMessage>, ApiError> {
        let endpoint = format!("{}/chat/{room_id}", self.base_url);
        let response = self.http.get(&endpoint).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::Status { status: response.status().as_u16(), endpoint });
        }
        let envelope: Envelope<Vec<ChatMessage>> = response.json().await?;
        Ok(envelope.data)
    }

    /// Create a two-party room and return its id.
    pub async fn create_room(
        &self,
        user_id1: UserId,
        user_id2: UserId,
    ) -> Result<RoomId, ApiError> {
        let endpoint = format!("{}/chat", self.base_url);
        let response = self
            .http
            .post(&endpoint)
            .json(&CreateRoomRequest { user_id1, user_id2 })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ApiError::Status { status: response.status().as_u16(), endpoint });
        }
        let envelope: Envelope<CreateRoomData> = response.json().await?;
        Ok(envelope.data.chat_room_id)
    }

    /// Base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
