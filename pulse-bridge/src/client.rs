use async_trait::async_trait;
use pulse_core::{Event, StreamKey};
use tracing::{debug, info, warn};

use crate::{
    AppBridgeConfig, BridgeClient, BridgeError, ConnectionState, Connector, Transport,
    TransportError,
};

/// Transport slot, filled by the first `connect`.
enum TransportHandle<T> {
    Uninitialized,
    Ready(T),
}

impl<T> TransportHandle<T> {
    fn get_mut(&mut self) -> Option<&mut T> {
        match self {
            TransportHandle::Uninitialized => None,
            TransportHandle::Ready(transport) => Some(transport),
        }
    }
}

/// Bridge client backed by a real transport to the companion app.
///
/// Nothing touches the transport until the first [`BridgeClient::connect`]:
/// the connector opens it then, and the client keeps it for later
/// reconnects.
pub struct AppBridgeClient<C: Connector> {
    connector: C,
    config: AppBridgeConfig,
    handle: TransportHandle<C::Transport>,
    state: ConnectionState,
    published: u64,
}

impl<C: Connector> AppBridgeClient<C> {
    pub fn new(connector: C, config: AppBridgeConfig) -> Self {
        info!(
            remote_app_id = %config.remote_app_id,
            "app bridge publisher created"
        );

        Self {
            connector,
            config,
            handle: TransportHandle::Uninitialized,
            state: ConnectionState::Disconnected,
            published: 0,
        }
    }

    pub fn config(&self) -> &AppBridgeConfig {
        &self.config
    }

    /// Whether the underlying transport has been opened yet.
    pub fn is_initialized(&self) -> bool {
        matches!(self.handle, TransportHandle::Ready(_))
    }

    async fn establish(&mut self) -> Result<(), TransportError> {
        if !self.is_initialized() {
            let transport = self.connector.open(&self.config).await?;
            self.handle = TransportHandle::Ready(transport);
            info!("app bridge transport initialized");
        }

        match self.handle.get_mut() {
            Some(transport) => transport.connect().await,
            None => Err(TransportError::Closed),
        }
    }
}

#[async_trait]
impl<C: Connector> BridgeClient for AppBridgeClient<C> {
    async fn connect(&mut self) -> Result<(), BridgeError> {
        if self.state == ConnectionState::Connected {
            debug!("already connected to companion app");
            return Ok(());
        }

        info!(remote_app_id = %self.config.remote_app_id, "connecting to companion app");
        self.state = ConnectionState::Connecting;

        match self.establish().await {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                info!("connected to companion app, ready to publish");
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                warn!(error = %e, "connection to companion app failed");
                Err(BridgeError::TransportUnavailable(e))
            }
        }
    }

    async fn disconnect(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }

        info!("disconnecting from companion app");
        self.state = ConnectionState::Disconnecting;

        if let Some(transport) = self.handle.get_mut()
            && let Err(e) = transport.disconnect().await
        {
            warn!(error = %e, "transport disconnect failed, marking disconnected anyway");
        }

        self.state = ConnectionState::Disconnected;
        info!("disconnected from companion app");
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    async fn publish(&mut self, stream: StreamKey, event: &Event) -> Result<(), BridgeError> {
        if self.state != ConnectionState::Connected {
            return Err(BridgeError::NotConnected);
        }
        let Some(transport) = self.handle.get_mut() else {
            return Err(BridgeError::NotConnected);
        };

        let payload = event.to_payload()?;

        info!(%stream, event_id = %event.event_id, "publishing event to companion app");
        debug!(?payload, "event data");

        if let Err(e) = transport
            .add_object_to_shared_stream(stream.as_str(), payload)
            .await
        {
            warn!(%stream, event_id = %event.event_id, error = %e, "publish failed");
            if e.breaks_link() {
                self.state = ConnectionState::Disconnected;
                warn!("lost companion app connection, reconnect before publishing");
            }
            return Err(BridgeError::TransportPublishFailure(e));
        }

        self.published += 1;
        info!(published = self.published, "event published");

        Ok(())
    }

    fn published_count(&self) -> u64 {
        self.published
    }
}
