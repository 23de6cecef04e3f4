mod client;
mod frame;
mod memory;
mod message;
mod noop;
mod tcp;
mod transport;

pub use client::AppBridgeClient;
pub use frame::{DEFAULT_MAX_FRAME_BYTES, FrameCodec, FrameError};
pub use memory::{MemoryConnector, MemoryHub, MemoryTransport, SharedEntry};
pub use message::{BridgeMessage, Envelope, Hello, MessageId, SharedObject, WireError, WireErrorCode};
pub use noop::NoopBridge;
pub use tcp::{TcpConnector, TcpTransport};
pub use transport::{Connector, Transport, TransportError};

use async_trait::async_trait;
use pulse_core::{Event, SerializableMap, StreamKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("transport unavailable: {0}")]
    TransportUnavailable(#[source] TransportError),
    #[error("not connected to companion app")]
    NotConnected,
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),
    #[error("publish failed: {0}")]
    TransportPublishFailure(#[source] TransportError),
    #[error("failed to encode event: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

/// Identifies the companion app; handed to the transport when it is first opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppBridgeConfig {
    pub remote_app_id: String,
    pub remote_app_url_scheme: String,
    pub ios_app_group_id: String,
}

impl AppBridgeConfig {
    pub fn validate(&self) -> Result<(), TransportError> {
        if self.remote_app_id.trim().is_empty() {
            return Err(TransportError::InvalidConfig("remote_app_id is empty"));
        }
        if self.remote_app_url_scheme.trim().is_empty() {
            return Err(TransportError::InvalidConfig("remote_app_url_scheme is empty"));
        }
        if self.ios_app_group_id.trim().is_empty() {
            return Err(TransportError::InvalidConfig("ios_app_group_id is empty"));
        }
        Ok(())
    }
}

impl Default for AppBridgeConfig {
    fn default() -> Self {
        Self {
            remote_app_id: "com.clinicalink.orion".into(),
            remote_app_url_scheme: "lxhost".into(),
            ios_app_group_id: "group.com.clinicalink.Connector".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteStreamParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteStreamResponse {
    pub items: Vec<SerializableMap>,
    pub has_more: bool,
}

pub type ChangeCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Publish side of the bridge to the companion app.
///
/// Lifecycle calls take `&mut self`, so one owner drives connect, publish and
/// disconnect in sequence. `publish` never waits for an in-flight connect; it
/// fails with [`BridgeError::NotConnected`] unless the state is `Connected`.
#[async_trait]
pub trait BridgeClient: Send + Sync {
    /// Idempotent; a no-op when already connected.
    async fn connect(&mut self) -> Result<(), BridgeError>;

    /// Always ends in `Disconnected`. Transport errors are logged, not returned.
    async fn disconnect(&mut self);

    fn state(&self) -> ConnectionState;

    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    async fn publish(&mut self, stream: StreamKey, event: &Event) -> Result<(), BridgeError>;

    /// Number of successful publishes since construction.
    fn published_count(&self) -> u64;

    /// This client only publishes; reads go through the companion app.
    async fn get_items_from_remote_stream(
        &self,
        _stream: StreamKey,
        _params: RemoteStreamParams,
    ) -> Result<RemoteStreamResponse, BridgeError> {
        Err(BridgeError::UnsupportedOperation(
            "get_items_from_remote_stream",
        ))
    }

    fn listen_for_changes_to_remote_stream(
        &self,
        _stream: StreamKey,
        _callback: ChangeCallback,
    ) -> Result<(), BridgeError> {
        Err(BridgeError::UnsupportedOperation(
            "listen_for_changes_to_remote_stream",
        ))
    }
}
