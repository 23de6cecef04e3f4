use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Event, EventType};

/// Named publish channel on the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamKey {
    #[serde(rename = "dataEvents")]
    DataEvents,
    #[serde(rename = "device")]
    Device,
    #[serde(rename = "alert")]
    Alert,
}

impl StreamKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKey::DataEvents => "dataEvents",
            StreamKey::Device => "device",
            StreamKey::Alert => "alert",
        }
    }

    pub fn for_event_type(event_type: EventType) -> Self {
        match event_type {
            EventType::HypoLow | EventType::HyperHigh => StreamKey::DataEvents,
            EventType::DeviceStatus => StreamKey::Device,
            EventType::DeviceAlert => StreamKey::Alert,
        }
    }

    pub fn for_event(event: &Event) -> Self {
        Self::for_event_type(event.event_type)
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
