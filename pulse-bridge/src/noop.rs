use async_trait::async_trait;
use pulse_core::{Event, StreamKey};
use tracing::info;

use crate::{BridgeClient, BridgeError, ConnectionState};

/// Local stand-in for environments without a companion app.
///
/// Follows the same lifecycle as [`crate::AppBridgeClient`] but only logs
/// what it would have published.
#[derive(Debug)]
pub struct NoopBridge {
    state: ConnectionState,
    published: u64,
}

impl NoopBridge {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            published: 0,
        }
    }
}

impl Default for NoopBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BridgeClient for NoopBridge {
    async fn connect(&mut self) -> Result<(), BridgeError> {
        if self.state == ConnectionState::Connected {
            return Ok(());
        }

        self.state = ConnectionState::Connected;
        info!("noop bridge connected");
        Ok(())
    }

    async fn disconnect(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }

        self.state = ConnectionState::Disconnected;
        info!("noop bridge disconnected");
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    async fn publish(&mut self, stream: StreamKey, event: &Event) -> Result<(), BridgeError> {
        if self.state != ConnectionState::Connected {
            return Err(BridgeError::NotConnected);
        }

        let body = serde_json::to_string(event)?;
        self.published += 1;

        info!(
            %stream,
            event_id = %event.event_id,
            published = self.published,
            %body,
            "event logged"
        );

        Ok(())
    }

    fn published_count(&self) -> u64 {
        self.published
    }
}
