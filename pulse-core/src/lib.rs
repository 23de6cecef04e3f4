mod event;
mod stream;

pub use event::{
    AlertPriority, DeviceAlert, DeviceStatus, Event, EventType, GlucoseReading, Properties,
    SchemaError, SensorInfo, SerializableMap,
};
pub use stream::StreamKey;
