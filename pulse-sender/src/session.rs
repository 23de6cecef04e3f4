use std::sync::Arc;

use pulse_bridge::{BridgeClient, BridgeError};
use pulse_core::{Event, StreamKey};
use tracing::{info, warn};

use crate::generator::EventGenerator;
use crate::ledger::SentLedger;

/// A user request to generate and send one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendIntent {
    Hypo { glucose: Option<i64> },
    Hyper { glucose: Option<i64> },
    Device { device_id: Option<String> },
    Alert { alert_type: Option<String> },
    Random,
}

/// Owns the generator, the bridge client and the ledger for one publisher.
///
/// Events go generator → router → bridge, and only land in the ledger once
/// the bridge reports success.
pub struct Session<B: BridgeClient> {
    generator: EventGenerator,
    bridge: B,
    ledger: SentLedger,
}

impl<B: BridgeClient> Session<B> {
    pub fn new(bridge: B) -> Self {
        Self::with_generator(bridge, EventGenerator::new())
    }

    pub fn with_generator(bridge: B, generator: EventGenerator) -> Self {
        Self {
            generator,
            bridge,
            ledger: SentLedger::new(),
        }
    }

    pub async fn connect(&mut self) -> Result<(), BridgeError> {
        self.bridge.connect().await
    }

    pub async fn disconnect(&mut self) {
        self.bridge.disconnect().await
    }

    pub fn is_connected(&self) -> bool {
        self.bridge.is_connected()
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    pub fn generator_mut(&mut self) -> &mut EventGenerator {
        &mut self.generator
    }

    pub fn generate(&mut self, intent: &SendIntent) -> Event {
        match intent {
            SendIntent::Hypo { glucose } => self.generator.generate_hypo_event(*glucose),
            SendIntent::Hyper { glucose } => self.generator.generate_hyper_event(*glucose),
            SendIntent::Device { device_id } => {
                self.generator.generate_device_event(device_id.as_deref())
            }
            SendIntent::Alert { alert_type } => {
                self.generator.generate_alert_event(alert_type.as_deref())
            }
            SendIntent::Random => self.generator.generate_random_event(),
        }
    }

    /// Publishes to the stream for the event's category and records it.
    pub async fn publish(&mut self, event: Event) -> Result<Arc<Event>, BridgeError> {
        let stream = StreamKey::for_event(&event);

        if let Err(e) = self.bridge.publish(stream, &event).await {
            warn!(%stream, event_id = %event.event_id, error = %e, "event not sent");
            return Err(e);
        }

        let event = Arc::new(event);
        self.ledger.append(Arc::clone(&event));
        info!(
            %stream,
            event_type = %event.event_type,
            event_id = %event.event_id,
            sent = self.ledger.len(),
            "event sent"
        );

        Ok(event)
    }

    pub async fn send(&mut self, intent: &SendIntent) -> Result<Arc<Event>, BridgeError> {
        let event = self.generate(intent);
        self.publish(event).await
    }

    pub fn sent_events(&self) -> &[Arc<Event>] {
        self.ledger.list()
    }

    pub fn clear_sent_events(&mut self) {
        self.ledger.clear();
    }
}
