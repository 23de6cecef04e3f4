use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use pulse_core::SerializableMap;

use crate::{AppBridgeConfig, Connector, Transport, TransportError};

/// An object as the companion app received it.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedEntry {
    pub stream_key: String,
    pub object: SerializableMap,
}

#[derive(Default)]
struct HubState {
    entries: Vec<SharedEntry>,
    opened: usize,
    connected: bool,
    unreachable: bool,
    fail_publish: bool,
    fail_disconnect: bool,
}

/// In-process stand-in for the companion app side of the bridge.
/// This is primarily intended for testing and as a reference
/// implementation of the Transport trait.
#[derive(Clone, Default)]
pub struct MemoryHub {
    state: Arc<Mutex<HubState>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector { hub: self.clone() }
    }

    /// Everything published so far, oldest first.
    pub fn entries(&self) -> Vec<SharedEntry> {
        self.lock().entries.clone()
    }

    pub fn entries_on(&self, stream_key: &str) -> Vec<SharedEntry> {
        self.lock()
            .entries
            .iter()
            .filter(|entry| entry.stream_key == stream_key)
            .cloned()
            .collect()
    }

    /// How many transports have been opened against this hub.
    pub fn open_count(&self) -> usize {
        self.lock().opened
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    /// Simulates the companion hanging up without a goodbye.
    pub fn drop_link(&self) {
        self.lock().connected = false;
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    pub fn set_publish_failure(&self, fail: bool) {
        self.lock().fail_publish = fail;
    }

    pub fn set_disconnect_failure(&self, fail: bool) {
        self.lock().fail_disconnect = fail;
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone)]
pub struct MemoryConnector {
    hub: MemoryHub,
}

#[async_trait]
impl Connector for MemoryConnector {
    type Transport = MemoryTransport;

    async fn open(&self, config: &AppBridgeConfig) -> Result<MemoryTransport, TransportError> {
        config.validate()?;

        let mut state = self.hub.lock();
        if state.unreachable {
            return Err(TransportError::Unreachable(config.remote_app_id.clone()));
        }
        state.opened += 1;

        Ok(MemoryTransport {
            hub: self.hub.clone(),
        })
    }
}

pub struct MemoryTransport {
    hub: MemoryHub,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let mut state = self.hub.lock();
        if state.unreachable {
            return Err(TransportError::Unreachable("memory hub".into()));
        }
        state.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        let mut state = self.hub.lock();
        if state.fail_disconnect {
            return Err(TransportError::Rejected("disconnect refused".into()));
        }
        state.connected = false;
        Ok(())
    }

    async fn add_object_to_shared_stream(
        &mut self,
        stream_key: &str,
        object: SerializableMap,
    ) -> Result<(), TransportError> {
        let mut state = self.hub.lock();
        if !state.connected {
            return Err(TransportError::Closed);
        }
        if state.fail_publish {
            return Err(TransportError::Rejected("publish refused".into()));
        }

        state.entries.push(SharedEntry {
            stream_key: stream_key.to_owned(),
            object,
        });

        Ok(())
    }
}
