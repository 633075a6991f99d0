//! Application layer for the huddle chat client.
//!
//! Glue between the Sans-IO [`huddle_client::ChatSession`] and real I/O,
//! enabling deterministic simulation testing with the same orchestration code
//! that runs in production.
//!
//! # Components
//!
//! - [`Driver`]: trait for platform-specific I/O (broker + REST)
//! - [`SessionRuntime`]: event loop executing session actions through a driver
//! - [`SessionHandle`]: the surface handed to UIs (commands in, watched
//!   history/connection state out)
//! - [`NetDriver`] (feature `net`): production driver over the STOMP
//!   transport and REST API

#![forbid(unsafe_code)]

mod config;
mod driver;
mod handle;
#[cfg(feature = "net")]
mod net;
mod runtime;

pub use config::SessionConfig;
pub use driver::Driver;
pub use handle::{HistoryEdit, SessionClosed, SessionCommand, SessionHandle};
#[cfg(feature = "net")]
pub use net::{NetDriver, NetDriverError};
pub use runtime::SessionRuntime;
