//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding wire data.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame contained no command line.
    #[error("empty frame")]
    EmptyFrame,

    /// Command line did not match any known STOMP command.
    #[error("unknown command: {0:?}")]
    UnknownCommand(String),

    /// Header line was not a `key:value` pair.
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    /// Command or header section was not valid UTF-8.
    #[error("frame command or headers are not valid UTF-8")]
    InvalidUtf8,

    /// Frame body ended before the NUL terminator.
    #[error("missing NUL frame terminator")]
    MissingTerminator,

    /// `content-length` claimed more bytes than the frame holds.
    #[error("body truncated: expected {expected} bytes, got {actual}")]
    BodyTruncated {
        /// Bytes claimed by `content-length`.
        expected: usize,
        /// Bytes actually present before the terminator.
        actual: usize,
    },

    /// `content-length` header was not a decimal integer.
    #[error("invalid content-length: {0:?}")]
    InvalidContentLength(String),

    /// Header value used an escape sequence outside the STOMP 1.2 set.
    #[error("invalid header escape sequence in {0:?}")]
    InvalidEscape(String),
}
