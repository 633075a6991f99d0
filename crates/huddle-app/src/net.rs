//! Production driver: STOMP over WebSocket plus the REST API.

use huddle_client::rest::{ApiError, ChatApi};
use huddle_client::transport::{
    ConnectedBroker, TransportConfig, TransportError, connect_with_config,
};
use huddle_proto::stomp::Frame;
use huddle_proto::{ChatMessage, RoomId, RtcInvite, SEND_CHAT_RTC, UserId};
use thiserror::Error;
use tracing::debug;

use crate::driver::Driver;

/// Errors from the network driver.
#[derive(Debug, Error)]
pub enum NetDriverError {
    /// Broker transport failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// REST endpoint failure.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// An operation that needs the main connection ran without one.
    #[error("no broker connection is open")]
    NotConnected,

    /// The connection task stopped while a frame was queued for it.
    #[error("broker connection closed while sending")]
    ChannelClosed,

    /// Payload could not be encoded.
    #[error("payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// [`Driver`] over the real broker and REST API.
pub struct NetDriver {
    api: ChatApi,
    transport_config: TransportConfig,
    broker: Option<ConnectedBroker>,
    next_subscription: u64,
}

impl NetDriver {
    /// Create a driver talking to the given REST base URL with default
    /// transport settings.
    pub fn new(rest_base_url: impl Into<String>) -> Self {
        Self::with_transport_config(rest_base_url, TransportConfig::default())
    }

    /// [`NetDriver::new`] with explicit transport settings.
    pub fn with_transport_config(
        rest_base_url: impl Into<String>,
        transport_config: TransportConfig,
    ) -> Self {
        Self {
            api: ChatApi::new(rest_base_url),
            transport_config,
            broker: None,
            next_subscription: 0,
        }
    }

    async fn send_frame(&mut self, frame: Frame) -> Result<(), NetDriverError> {
        let broker = self.broker.as_ref().ok_or(NetDriverError::NotConnected)?;
        broker.to_broker.send(frame).await.map_err(|_| NetDriverError::ChannelClosed)
    }
}

impl Driver for NetDriver {
    type Error = NetDriverError;

    async fn open(&mut self, broker_url: &str) -> Result<(), NetDriverError> {
        if let Some(previous) = self.broker.take() {
            previous.disconnect().await;
        }
        let broker = connect_with_config(broker_url, self.transport_config.clone()).await?;
        debug!(broker_url, "broker connection established");
        self.broker = Some(broker);
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(broker) = self.broker.take() {
            broker.disconnect().await;
            debug!("broker connection closed");
        }
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), NetDriverError> {
        self.next_subscription += 1;
        let id = format!("sub-{}", self.next_subscription);
        self.send_frame(Frame::subscribe(&id, topic)).await
    }

    async fn publish(&mut self, destination: &str, body: Vec<u8>) -> Result<(), NetDriverError> {
        self.send_frame(Frame::send(destination, body)).await
    }

    async fn next_message(&mut self) -> Option<Vec<u8>> {
        match &mut self.broker {
            Some(broker) => broker.from_broker.recv().await.map(|frame| frame.body),
            None => std::future::pending().await,
        }
    }

    async fn fetch_history(&mut self, room_id: RoomId) -> Result<Vec<ChatMessage>, NetDriverError> {
        Ok(self.api.fetch_history(room_id).await?)
    }

    async fn create_room(
        &mut self,
        user_id1: UserId,
        user_id2: UserId,
    ) -> Result<RoomId, NetDriverError> {
        Ok(self.api.create_room(user_id1, user_id2).await?)
    }

    async fn send_call_invite(
        &mut self,
        broker_url: &str,
        invite: RtcInvite,
    ) -> Result<(), NetDriverError> {
        // Dedicated connection so a call from the list view (no active room)
        // never disturbs the main one.
        let body = serde_json::to_vec(&invite)?;
        let broker = connect_with_config(broker_url, self.transport_config.clone()).await?;
        let sent = broker
            .to_broker
            .send(Frame::send(SEND_CHAT_RTC, body))
            .await
            .map_err(|_| NetDriverError::ChannelClosed);
        broker.disconnect().await;
        sent
    }
}
