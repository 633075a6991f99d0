//! Chat session client.
//!
//! Action-based state machine for one chat session: a live broker connection
//! per active room, REST-loaded history, ordered append of live messages, and
//! outbound sends.
//!
//! # Architecture
//!
//! The session is Sans-IO: it receives events ([`SessionEvent`]), processes
//! them through pure state machine logic, and returns actions
//! ([`SessionAction`]) for the caller to execute. The same machine therefore
//! runs unchanged under a real broker and in simulation tests.
//!
//! # Components
//!
//! - [`ChatSession`]: per-room connection lifecycle, history, and sends
//! - [`SessionEvent`]: events fed into the session
//! - [`SessionAction`]: actions produced for the caller
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::ConnectedBroker`]: STOMP-over-WebSocket broker connection
//! - [`rest::ChatApi`]: history fetch and room creation over HTTP

#![forbid(unsafe_code)]

mod event;
mod session;

#[cfg(feature = "transport")]
pub mod rest;
#[cfg(feature = "transport")]
pub mod transport;

pub use event::{SessionAction, SessionEvent};
pub use huddle_proto::{ChatMessage, ROOM_NONE, RoomId, UserId};
pub use session::{ChatSession, SessionState};
