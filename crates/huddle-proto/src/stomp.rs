//! STOMP 1.2 frame codec (client subset).
//!
//! A frame is a command line, zero or more `key:value` header lines, a blank
//! line, an optional body, and a NUL terminator:
//!
//! ```text
//! SEND
//! destination:/send/chat/message
//! content-type:application/json
//! content-length:42
//!
//! {"room_id":5,...}\0
//! ```
//!
//! This is a pure codec (bytes in, [`Frame`] out). Connection handling lives
//! in the transport layer; what to do with a frame is the session's decision.
//!
//! # Invariants
//!
//! - Encoding always emits `content-length` for non-empty bodies, so bodies
//!   may contain NUL bytes without corrupting framing.
//! - Header names and values are octet-escaped per STOMP 1.2 (`\n`, `\r`,
//!   `\c`, `\\`); `CONNECT`/`CONNECTED` frames are exempt, as STOMP 1.2
//!   requires for backwards compatibility.

use crate::errors::{ProtocolError, Result};

/// Header carrying the body length in bytes.
const CONTENT_LENGTH: &str = "content-length";

/// STOMP commands used by this client.
///
/// Server-only commands (`MESSAGE`, `CONNECTED`, `RECEIPT`, `ERROR`) are
/// parsed but never constructed locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Client handshake.
    Connect,
    /// Server handshake acknowledgment.
    Connected,
    /// Client publishes a message to a destination.
    Send,
    /// Client subscribes to a topic.
    Subscribe,
    /// Client cancels a subscription.
    Unsubscribe,
    /// Client closes the session.
    Disconnect,
    /// Server delivers a message from a subscribed topic.
    Message,
    /// Server acknowledges a receipt-requesting frame.
    Receipt,
    /// Server reports a protocol or broker error.
    Error,
}

impl Command {
    /// Wire spelling of the command.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Connected => "CONNECTED",
            Self::Send => "SEND",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Disconnect => "DISCONNECT",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
        }
    }

    /// Parse a command line.
    ///
    /// `STOMP` is accepted as an alias for `CONNECT` per the 1.2 spec.
    fn parse(line: &str) -> Result<Self> {
        match line {
            "CONNECT" | "STOMP" => Ok(Self::Connect),
            "CONNECTED" => Ok(Self::Connected),
            "SEND" => Ok(Self::Send),
            "SUBSCRIBE" => Ok(Self::Subscribe),
            "UNSUBSCRIBE" => Ok(Self::Unsubscribe),
            "DISCONNECT" => Ok(Self::Disconnect),
            "MESSAGE" => Ok(Self::Message),
            "RECEIPT" => Ok(Self::Receipt),
            "ERROR" => Ok(Self::Error),
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }

    /// Whether headers of this frame use octet escaping.
    ///
    /// STOMP 1.2 exempts the handshake frames.
    fn escapes_headers(self) -> bool {
        !matches!(self, Self::Connect | Self::Connected)
    }
}

/// A single STOMP frame.
///
/// Headers are kept in wire order; lookups take the first match, which is the
/// one STOMP defines as authoritative when a header repeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame command.
    pub command: Command,
    /// Header pairs, unescaped, excluding `content-length`.
    pub headers: Vec<(String, String)>,
    /// Raw body bytes (JSON for every destination this client uses).
    pub body: Vec<u8>,
}

impl Frame {
    /// Create a frame from parts.
    pub fn new(command: Command, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self { command, headers, body }
    }

    /// Client handshake frame. Heartbeats are disabled; the session treats a
    /// dead socket as a connection failure instead.
    pub fn connect(host: &str) -> Self {
        Self::new(
            Command::Connect,
            vec![
                ("accept-version".into(), "1.2".into()),
                ("host".into(), host.into()),
                ("heart-beat".into(), "0,0".into()),
            ],
            Vec::new(),
        )
    }

    /// Subscription frame for a topic, with a client-chosen subscription id.
    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new(
            Command::Subscribe,
            vec![
                ("id".into(), id.into()),
                ("destination".into(), destination.into()),
                ("ack".into(), "auto".into()),
            ],
            Vec::new(),
        )
    }

    /// Publish frame carrying a JSON body to a destination.
    pub fn send(destination: &str, body: Vec<u8>) -> Self {
        Self::new(
            Command::Send,
            vec![
                ("destination".into(), destination.into()),
                ("content-type".into(), "application/json".into()),
            ],
            body,
        )
    }

    /// Session close frame.
    pub fn disconnect() -> Self {
        Self::new(Command::Disconnect, Vec::new(), Vec::new())
    }

    /// First value of the named header. `None` if absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    /// The `destination` header. `None` if absent.
    pub fn destination(&self) -> Option<&str> {
        self.header("destination")
    }

    /// Encode to wire bytes.
    ///
    /// `content-length` is computed here, never taken from [`Frame::headers`].
    pub fn encode(&self) -> Vec<u8> {
        let escaping = self.command.escapes_headers();
        let mut out = Vec::with_capacity(64 + self.body.len());

        out.extend_from_slice(self.command.as_str().as_bytes());
        out.push(b'\n');

        for (name, value) in &self.headers {
            if escaping {
                out.extend_from_slice(escape(name).as_bytes());
                out.push(b':');
                out.extend_from_slice(escape(value).as_bytes());
            } else {
                out.extend_from_slice(name.as_bytes());
                out.push(b':');
                out.extend_from_slice(value.as_bytes());
            }
            out.push(b'\n');
        }

        if !self.body.is_empty() {
            out.extend_from_slice(CONTENT_LENGTH.as_bytes());
            out.push(b':');
            out.extend_from_slice(self.body.len().to_string().as_bytes());
            out.push(b'\n');
        }

        out.push(b'\n');
        out.extend_from_slice(&self.body);
        out.push(0);
        out
    }

    /// Encode to a `String` for WebSocket text frames.
    ///
    /// STOMP frames are UTF-8 end to end for this client (JSON bodies), and
    /// the NUL terminator is a valid UTF-8 scalar.
    pub fn encode_string(&self) -> String {
        String::from_utf8_lossy(&self.encode()).into_owned()
    }

    /// Decode a frame from wire bytes.
    ///
    /// If `content-length` is present it is authoritative for the body size;
    /// otherwise the body runs to the first NUL. Bytes after the terminator
    /// (trailing EOLs some brokers append) are ignored.
    ///
    /// # Errors
    ///
    /// Structural failures only; JSON bodies are decoded later by the session
    /// with their own error handling.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut pos = 0usize;

        let command_line = next_line(bytes, &mut pos).ok_or(ProtocolError::EmptyFrame)?;
        if command_line.is_empty() {
            return Err(ProtocolError::EmptyFrame);
        }
        let command_str =
            std::str::from_utf8(command_line).map_err(|_| ProtocolError::InvalidUtf8)?;
        let command = Command::parse(command_str)?;

        let mut headers = Vec::new();
        let mut content_length: Option<usize> = None;
        loop {
            let line = next_line(bytes, &mut pos).ok_or(ProtocolError::MissingTerminator)?;
            if line.is_empty() {
                break;
            }
            let line = std::str::from_utf8(line).map_err(|_| ProtocolError::InvalidUtf8)?;
            let (raw_name, raw_value) = line
                .split_once(':')
                .ok_or_else(|| ProtocolError::MalformedHeader(line.to_string()))?;
            let (name, value) = if command.escapes_headers() {
                (unescape(raw_name)?, unescape(raw_value)?)
            } else {
                (raw_name.to_string(), raw_value.to_string())
            };
            if name == CONTENT_LENGTH {
                let parsed = value
                    .parse::<usize>()
                    .map_err(|_| ProtocolError::InvalidContentLength(value.clone()))?;
                content_length = Some(parsed);
            } else {
                headers.push((name, value));
            }
        }

        let body = match content_length {
            Some(expected) => {
                let end = pos.saturating_add(expected);
                if end > bytes.len() {
                    return Err(ProtocolError::BodyTruncated {
                        expected,
                        actual: bytes.len().saturating_sub(pos),
                    });
                }
                if bytes.get(end) != Some(&0) {
                    return Err(ProtocolError::MissingTerminator);
                }
                bytes[pos..end].to_vec()
            },
            None => {
                let nul = bytes[pos..]
                    .iter()
                    .position(|&b| b == 0)
                    .ok_or(ProtocolError::MissingTerminator)?;
                bytes[pos..pos + nul].to_vec()
            },
        };

        Ok(Self { command, headers, body })
    }
}

/// Next line of the header section, with the EOL (and optional `\r`) stripped.
/// Advances `pos` past the EOL. `None` at end of input.
fn next_line<'a>(bytes: &'a [u8], pos: &mut usize) -> Option<&'a [u8]> {
    let rest = bytes.get(*pos..)?;
    let nl = rest.iter().position(|&b| b == b'\n')?;
    let mut line = &rest[..nl];
    if line.last() == Some(&b'\r') {
        line = &line[..line.len() - 1];
    }
    *pos += nl + 1;
    Some(line)
}

/// Octet-escape a header name or value per STOMP 1.2.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

/// Reverse of [`escape`]. Undefined escape sequences are a fatal protocol
/// error per STOMP 1.2, not passed through.
fn unescape(value: &str) -> Result<String> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            _ => return Err(ProtocolError::InvalidEscape(value.to_string())),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_encodes_exact_layout() {
        let frame = Frame::subscribe("sub-0", "/receive/chat/room/5");
        let wire = frame.encode();

        let expected =
            b"SUBSCRIBE\nid:sub-0\ndestination:/receive/chat/room/5\nack:auto\n\n\0".to_vec();
        assert_eq!(wire, expected);
    }

    #[test]
    fn send_includes_content_length() {
        let body = br#"{"room_id":5,"sender_id":1,"message":"hi"}"#.to_vec();
        let frame = Frame::send("/send/chat/message", body.clone());
        let wire = frame.encode();

        let text = String::from_utf8(wire).unwrap();
        assert!(text.starts_with("SEND\ndestination:/send/chat/message\n"));
        assert!(text.contains(&format!("content-length:{}\n", body.len())));
        assert!(text.ends_with("\u{0}"));
    }

    #[test]
    fn message_frame_decodes_with_content_length() {
        let wire = b"MESSAGE\ndestination:/receive/chat/room/5\nmessage-id:7\nsubscription:sub-0\ncontent-length:4\n\nabcd\0";
        let frame = Frame::decode(wire).unwrap();

        assert_eq!(frame.command, Command::Message);
        assert_eq!(frame.destination(), Some("/receive/chat/room/5"));
        assert_eq!(frame.header("message-id"), Some("7"));
        assert_eq!(frame.body, b"abcd");
    }

    #[test]
    fn content_length_allows_nul_in_body() {
        let frame = Frame::send("/send/chat/message", vec![0, 1, 0, 2]);
        let parsed = Frame::decode(&frame.encode()).unwrap();
        assert_eq!(parsed.body, vec![0, 1, 0, 2]);
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let wire = b"CONNECTED\r\nversion:1.2\r\n\r\n\0";
        let frame = Frame::decode(wire).unwrap();
        assert_eq!(frame.command, Command::Connected);
        assert_eq!(frame.header("version"), Some("1.2"));
    }

    #[test]
    fn escaped_headers_round_trip() {
        let frame = Frame::new(
            Command::Send,
            vec![("destination".into(), "/queue/a:b\nc".into())],
            Vec::new(),
        );
        let parsed = Frame::decode(&frame.encode()).unwrap();
        assert_eq!(parsed.header("destination"), Some("/queue/a:b\nc"));
    }

    #[test]
    fn connect_headers_are_not_escaped() {
        let wire = Frame::connect("broker.example.com").encode();
        let text = String::from_utf8(wire).unwrap();
        assert!(text.contains("accept-version:1.2\n"));
        assert!(text.contains("heart-beat:0,0\n"));
    }

    #[test]
    fn reject_missing_terminator() {
        let result = Frame::decode(b"SEND\ndestination:/x\n\nbody-without-nul");
        assert!(matches!(result, Err(ProtocolError::MissingTerminator)));
    }

    #[test]
    fn reject_truncated_body() {
        let result = Frame::decode(b"SEND\ndestination:/x\ncontent-length:100\n\nshort\0");
        assert!(matches!(result, Err(ProtocolError::BodyTruncated { expected: 100, .. })));
    }

    #[test]
    fn reject_unknown_command() {
        let result = Frame::decode(b"NONSENSE\n\n\0");
        assert!(matches!(result, Err(ProtocolError::UnknownCommand(_))));
    }

    #[test]
    fn reject_header_without_separator() {
        let result = Frame::decode(b"SEND\nnocolonhere\n\n\0");
        assert!(matches!(result, Err(ProtocolError::MalformedHeader(_))));
    }

    #[test]
    fn reject_invalid_escape() {
        let result = Frame::decode(b"SEND\ndestination:bad\\qescape\n\n\0");
        assert!(matches!(result, Err(ProtocolError::InvalidEscape(_))));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(Frame::decode(b""), Err(ProtocolError::EmptyFrame)));
        assert!(matches!(Frame::decode(b"\n"), Err(ProtocolError::EmptyFrame)));
    }

    #[test]
    fn repeated_header_first_value_wins() {
        let wire = b"MESSAGE\nfoo:first\nfoo:second\n\n\0";
        let frame = Frame::decode(wire).unwrap();
        assert_eq!(frame.header("foo"), Some("first"));
    }
}
