//! STOMP-over-WebSocket transport for the chat broker.
//!
//! Provides [`ConnectedBroker`] which handles the WebSocket I/O for STOMP
//! frame transport. This is a thin layer that just sends/receives frames -
//! session logic remains in the Sans-IO [`crate::ChatSession`].

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use huddle_proto::stomp::{Command, Frame};
use thiserror::Error;
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite};

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Stream error.
    #[error("stream error: {0}")]
    Stream(String),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Broker rejected the STOMP handshake.
    #[error("handshake failed: {0}")]
    Handshake(String),
}

/// Transport tuning knobs.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Limit on WebSocket connect plus STOMP handshake. `None` leaves the
    /// timeout policy to the caller, which is the platform default.
    pub connect_timeout: Option<Duration>,

    /// Capacity of the frame channels in each direction.
    pub channel_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { connect_timeout: None, channel_capacity: 32 }
    }
}

impl TransportConfig {
    /// Config for tests and tools: fail fast instead of hanging on an
    /// unreachable broker.
    pub fn development() -> Self {
        Self { connect_timeout: Some(Duration::from_secs(5)), ..Self::default() }
    }
}

/// Handle to a connected broker session.
///
/// Provides channels for frame transport. Frames are sent/received via the
/// channels, and an internal task handles the WebSocket I/O. Only `MESSAGE`
/// frames are forwarded to `from_broker`; broker `ERROR` frames are logged.
pub struct ConnectedBroker {
    /// Send frames to the broker.
    pub to_broker: mpsc::Sender<Frame>,
    /// Receive `MESSAGE` frames from subscribed topics.
    pub from_broker: mpsc::Receiver<Frame>,
    /// Connection task, kept so disconnect can await a clean shutdown.
    task: tokio::task::JoinHandle<()>,
}

impl ConnectedBroker {
    /// Close the session with a `DISCONNECT` frame, then stop.
    ///
    /// Best effort: if the connection task already died the frame is simply
    /// dropped.
    pub async fn disconnect(self) {
        let Self { to_broker, from_broker, task } = self;
        drop(from_broker);
        let _ = to_broker.send(Frame::disconnect()).await;
        drop(to_broker);
        let _ = task.await;
    }
}

type BrokerSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connect to the chat broker and complete the STOMP handshake.
///
/// Returns a [`ConnectedBroker`] with channels for frame transport.
pub async fn connect(broker_url: &str) -> Result<ConnectedBroker, TransportError> {
    connect_with_config(broker_url, TransportConfig::default()).await
}

/// [`connect`] with explicit configuration.
pub async fn connect_with_config(
    broker_url: &str,
    config: TransportConfig,
) -> Result<ConnectedBroker, TransportError> {
    let establish = async {
        let (mut ws, _response) = connect_async(broker_url)
            .await
            .map_err(|e| TransportError::Connection(format!("websocket connect failed: {e}")))?;

        let connect_frame = Frame::connect(&host_of(broker_url));
        ws.send(tungstenite::Message::Text(connect_frame.encode_string()))
            .await
            .map_err(|e| TransportError::Stream(format!("handshake write failed: {e}")))?;

        await_connected(&mut ws).await?;
        Ok::<_, TransportError>(ws)
    };

    let ws = match config.connect_timeout {
        Some(limit) => tokio::time::timeout(limit, establish).await.map_err(|_| {
            TransportError::Connection(format!("connect to {broker_url} timed out"))
        })??,
        None => establish.await?,
    };

    let (to_broker_tx, to_broker_rx) = mpsc::channel::<Frame>(config.channel_capacity);
    let (from_broker_tx, from_broker_rx) = mpsc::channel::<Frame>(config.channel_capacity);

    // Spawn connection handler
    let task = tokio::spawn(run_connection(ws, to_broker_rx, from_broker_tx));

    Ok(ConnectedBroker { to_broker: to_broker_tx, from_broker: from_broker_rx, task })
}

/// Wait for the broker's `CONNECTED` reply.
async fn await_connected(ws: &mut BrokerSocket) -> Result<(), TransportError> {
    while let Some(message) = ws.next().await {
        let message =
            message.map_err(|e| TransportError::Stream(format!("handshake read failed: {e}")))?;
        let Some(frame) = decode_message(&message)? else {
            continue;
        };
        return match frame.command {
            Command::Connected => Ok(()),
            Command::Error => Err(TransportError::Handshake(format!(
                "broker rejected connection: {}",
                frame.header("message").unwrap_or("unknown")
            ))),
            other => Err(TransportError::Handshake(format!(
                "unexpected {other:?} frame before CONNECTED"
            ))),
        };
    }
    Err(TransportError::Connection("connection closed during handshake".to_string()))
}

/// Decode a WebSocket message into a STOMP frame.
///
/// Returns `None` for control messages and STOMP heartbeats (bare EOLs).
fn decode_message(message: &tungstenite::Message) -> Result<Option<Frame>, TransportError> {
    let bytes: &[u8] = match message {
        tungstenite::Message::Text(text) => text.as_bytes(),
        tungstenite::Message::Binary(bytes) => bytes.as_slice(),
        _ => return Ok(None),
    };
    if bytes.iter().all(|b| matches!(b, b'\n' | b'\r')) {
        return Ok(None);
    }
    Frame::decode(bytes)
        .map(Some)
        .map_err(|e| TransportError::Protocol(format!("invalid STOMP frame: {e}")))
}

/// Run the connection, bridging between channels and the WebSocket.
async fn run_connection(
    ws: BrokerSocket,
    mut to_broker: mpsc::Receiver<Frame>,
    from_broker: mpsc::Sender<Frame>,
) {
    let (mut sink, mut stream) = ws.split();

    // Reader task for incoming frames
    let reader = tokio::spawn(async move {
        while let Some(message) = stream.next().await {
            let message = match message {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!("websocket read failed: {e}");
                    break;
                },
            };
            match decode_message(&message) {
                Ok(Some(frame)) => match frame.command {
                    Command::Message => {
                        if from_broker.send(frame).await.is_err() {
                            break;
                        }
                    },
                    Command::Error => tracing::warn!(
                        message = frame.header("message").unwrap_or("unknown"),
                        "broker reported an error"
                    ),
                    other => tracing::debug!(?other, "ignoring unexpected broker frame"),
                },
                Ok(None) => {},
                Err(e) => tracing::warn!("dropping malformed broker frame: {e}"),
            }
        }
    });

    // Main loop: send outgoing frames
    while let Some(frame) = to_broker.recv().await {
        let disconnecting = frame.command == Command::Disconnect;
        if let Err(e) = sink.send(tungstenite::Message::Text(frame.encode_string())).await {
            tracing::warn!("websocket write failed: {e}");
            break;
        }
        if disconnecting {
            let _ = sink.close().await;
            break;
        }
    }

    reader.abort();
}

/// Host portion of the broker URL, for the STOMP `host` header.
fn host_of(broker_url: &str) -> String {
    let without_scheme =
        broker_url.split_once("://").map_or(broker_url, |(_, rest)| rest);
    let authority =
        without_scheme.split_once('/').map_or(without_scheme, |(authority, _)| authority);
    authority.split_once(':').map_or(authority, |(host, _)| host).to_string()
}
