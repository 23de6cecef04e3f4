use std::time::Duration;

use async_trait::async_trait;
use pulse_core::SerializableMap;
use thiserror::Error;

use crate::{AppBridgeConfig, FrameError};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("companion app unreachable: {0}")]
    Unreachable(String),
    #[error("companion app rejected request: {0}")]
    Rejected(String),
    #[error("unexpected response")]
    UnexpectedResponse,
    #[error("invalid bridge config: {0}")]
    InvalidConfig(&'static str),
    #[error("transport is not open")]
    Closed,
}

impl TransportError {
    /// Whether the link to the companion can no longer be trusted, so the
    /// caller has to reconnect before publishing again.
    pub fn breaks_link(&self) -> bool {
        matches!(
            self,
            TransportError::Io(_)
                | TransportError::Frame(_)
                | TransportError::Timeout(_)
                | TransportError::UnexpectedResponse
                | TransportError::Closed
        )
    }
}

/// Opaque shared-stream channel to the companion app.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&mut self) -> Result<(), TransportError>;

    async fn disconnect(&mut self) -> Result<(), TransportError>;

    async fn add_object_to_shared_stream(
        &mut self,
        stream_key: &str,
        object: SerializableMap,
    ) -> Result<(), TransportError>;
}

/// Builds a [`Transport`] on first use.
///
/// Opening happens inside the first `connect`, so a missing companion app
/// surfaces there instead of at construction.
#[async_trait]
pub trait Connector: Send + Sync {
    type Transport: Transport;

    async fn open(&self, config: &AppBridgeConfig) -> Result<Self::Transport, TransportError>;
}
