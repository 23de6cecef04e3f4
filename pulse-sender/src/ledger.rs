use std::fmt;
use std::sync::Arc;

use pulse_core::{Event, Properties};

/// Ordered record of events that reached the companion app.
///
/// Entries are shared, never mutated; the only removal is [`SentLedger::clear`].
#[derive(Debug, Clone, Default)]
pub struct SentLedger {
    entries: Vec<Arc<Event>>,
}

impl SentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call only after the bridge accepted the event.
    pub fn append(&mut self, event: Arc<Event>) {
        self.entries.push(event);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Oldest first.
    pub fn list(&self) -> &[Arc<Event>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One line headline plus one detail line, as shown in the event monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub headline: String,
    pub detail: String,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n    {}", self.headline, self.detail)
    }
}

pub fn summarize(event: &Event) -> Summary {
    let headline = format!(
        "{} - {}",
        event.event_type.as_str().to_uppercase(),
        event.timestamp.strftime("%H:%M:%S")
    );

    let detail = match &event.properties {
        Properties::Glucose(reading) => {
            format!("Glucose: {} {}", reading.glucose, reading.glucose_unit)
        }
        Properties::DeviceStatus(status) => format!(
            "Device: {} (battery {}%, signal {}/5)",
            status.device_id, status.battery_level, status.signal_strength
        ),
        Properties::DeviceAlert(alert) => {
            format!("Alert: {} [{}]", alert.message, alert.priority)
        }
    };

    Summary { headline, detail }
}
