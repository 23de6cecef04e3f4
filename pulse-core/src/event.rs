use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON object handed to the bridge transport.
pub type SerializableMap = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("unknown event type `{0}`")]
    UnknownEventType(String),
    #[error("properties do not match event type `{0}`")]
    PropertiesMismatch(EventType),
}

/// Closed vocabulary of event discriminators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "cgm_hypo_low")]
    HypoLow,
    #[serde(rename = "cgm_hyper_high")]
    HyperHigh,
    #[serde(rename = "device_status")]
    DeviceStatus,
    #[serde(rename = "device_alert")]
    DeviceAlert,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::HypoLow,
        EventType::HyperHigh,
        EventType::DeviceStatus,
        EventType::DeviceAlert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::HypoLow => "cgm_hypo_low",
            EventType::HyperHigh => "cgm_hyper_high",
            EventType::DeviceStatus => "device_status",
            EventType::DeviceAlert => "device_alert",
        }
    }

    /// Prefix used when building `eventId` values, e.g. `hypo-event-3`.
    pub fn category(&self) -> &'static str {
        match self {
            EventType::HypoLow => "hypo",
            EventType::HyperHigh => "hyper",
            EventType::DeviceStatus => "device",
            EventType::DeviceAlert => "alert",
        }
    }

    pub fn is_glucose(&self) -> bool {
        matches!(self, EventType::HypoLow | EventType::HyperHigh)
    }

    fn accepts(&self, properties: &Properties) -> bool {
        match (self, properties) {
            (EventType::HypoLow, Properties::Glucose(reading)) => {
                reading.hypo_id.is_some() && reading.hyper_id.is_none()
            }
            (EventType::HyperHigh, Properties::Glucose(reading)) => {
                reading.hyper_id.is_some() && reading.hypo_id.is_none()
            }
            (EventType::DeviceStatus, Properties::DeviceStatus(_)) => true,
            (EventType::DeviceAlert, Properties::DeviceAlert(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| SchemaError::UnknownEventType(s.to_owned()))
    }
}

/// A synthetic event: the shared envelope around category specific properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawEvent")]
pub struct Event {
    pub event_id: String,
    pub timestamp: jiff::Timestamp,
    pub event_type: EventType,
    pub properties: Properties,
}

impl Event {
    pub fn new(
        event_id: String,
        timestamp: jiff::Timestamp,
        event_type: EventType,
        properties: Properties,
    ) -> Result<Self, SchemaError> {
        if !event_type.accepts(&properties) {
            return Err(SchemaError::PropertiesMismatch(event_type));
        }

        Ok(Self {
            event_id,
            timestamp,
            event_type,
            properties,
        })
    }

    /// Encodes the event as the JSON object shape the companion app reads.
    pub fn to_payload(&self) -> Result<SerializableMap, serde_json::Error> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err(<serde_json::Error as serde::ser::Error>::custom(
                "event did not encode to a JSON object",
            )),
        }
    }

    pub fn from_payload(payload: SerializableMap) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::Value::Object(payload))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    event_id: String,
    timestamp: jiff::Timestamp,
    event_type: EventType,
    properties: Properties,
}

impl TryFrom<RawEvent> for Event {
    type Error = SchemaError;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        Event::new(raw.event_id, raw.timestamp, raw.event_type, raw.properties)
    }
}

/// Category specific payload. Decoded by shape, most specific first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Properties {
    Glucose(GlucoseReading),
    DeviceStatus(DeviceStatus),
    DeviceAlert(DeviceAlert),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlucoseReading {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hypo_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hyper_id: Option<String>,
    pub sensor: SensorInfo,
    pub glucose_unit: String,
    pub glucose: i64,
    pub app_install_unique_id: u64,
    /// Seconds since the unix epoch.
    pub transmitter_time: i64,
    pub sequence_number: u64,
    pub reading_time: jiff::Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorInfo {
    pub manufacturer: String,
    pub serial_number: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    pub id: String,
    pub device_id: String,
    pub device_name: String,
    /// Percent, 0..100.
    pub battery_level: u8,
    /// Bars, 1..=5.
    pub signal_strength: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAlert {
    pub id: String,
    pub alert_type: String,
    pub message: String,
    pub priority: AlertPriority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    Low,
    Medium,
    High,
}

impl fmt::Display for AlertPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertPriority::Low => "low",
            AlertPriority::Medium => "medium",
            AlertPriority::High => "high",
        };
        f.write_str(s)
    }
}
