use std::ops::Range;

use pulse_core::{
    AlertPriority, DeviceAlert, DeviceStatus, Event, EventType, GlucoseReading, Properties,
    SensorInfo,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const DEFAULT_HYPO_GLUCOSE: i64 = 55;
pub const DEFAULT_HYPER_GLUCOSE: i64 = 300;
pub const DEFAULT_DEVICE_ID: &str = "test-device-123";
pub const DEFAULT_ALERT_TYPE: &str = "low_battery";

/// Glucose ranges (mg/dL) used by [`EventGenerator::generate_random_event`].
pub const RANDOM_HYPO_RANGE: Range<i64> = 30..70;
pub const RANDOM_HYPER_RANGE: Range<i64> = 250..450;

pub const ALERT_TYPES: [&str; 4] = [
    "low_battery",
    "connection_lost",
    "calibration_needed",
    "sensor_error",
];

const GLUCOSE_UNIT: &str = "mg/dL";
const DEVICE_NAME: &str = "Test Glucose Monitor";
const APP_INSTALL_UNIQUE_ID: u64 = 12345;
const HYPO_ID_OFFSET: u64 = 456;
const HYPER_ID_OFFSET: u64 = 789;

/// Synthesizes test events. Every generate call takes the next value of a
/// single counter shared by all categories.
pub struct EventGenerator<R = StdRng> {
    counter: u64,
    rng: R,
}

impl EventGenerator<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Reproducible generator for tests and scripted runs.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for EventGenerator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> EventGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { counter: 0, rng }
    }

    /// Low glucose reading; defaults to 55 mg/dL. The value is not range checked.
    pub fn generate_hypo_event(&mut self, glucose: Option<i64>) -> Event {
        self.glucose_event(
            EventType::HypoLow,
            glucose.unwrap_or(DEFAULT_HYPO_GLUCOSE),
        )
    }

    /// High glucose reading; defaults to 300 mg/dL. The value is not range checked.
    pub fn generate_hyper_event(&mut self, glucose: Option<i64>) -> Event {
        self.glucose_event(
            EventType::HyperHigh,
            glucose.unwrap_or(DEFAULT_HYPER_GLUCOSE),
        )
    }

    pub fn generate_device_event(&mut self, device_id: Option<&str>) -> Event {
        let seq = self.next_sequence();
        let battery_level = self.rng.random_range(0..100);
        let signal_strength = self.rng.random_range(1..=5);

        envelope(
            seq,
            EventType::DeviceStatus,
            Properties::DeviceStatus(DeviceStatus {
                id: format!("event-{seq}"),
                device_id: device_id.unwrap_or(DEFAULT_DEVICE_ID).to_owned(),
                device_name: DEVICE_NAME.to_owned(),
                battery_level,
                signal_strength,
            }),
        )
    }

    pub fn generate_alert_event(&mut self, alert_type: Option<&str>) -> Event {
        let seq = self.next_sequence();
        let alert_type = alert_type.unwrap_or(DEFAULT_ALERT_TYPE);

        envelope(
            seq,
            EventType::DeviceAlert,
            Properties::DeviceAlert(DeviceAlert {
                id: format!("event-{seq}"),
                alert_type: alert_type.to_owned(),
                message: format!("Test alert: {alert_type}"),
                priority: AlertPriority::High,
            }),
        )
    }

    /// Picks one of the four categories uniformly and randomizes its input.
    pub fn generate_random_event(&mut self) -> Event {
        match self.rng.random_range(0..4) {
            0 => {
                let glucose = self.rng.random_range(RANDOM_HYPO_RANGE);
                self.generate_hypo_event(Some(glucose))
            }
            1 => {
                let glucose = self.rng.random_range(RANDOM_HYPER_RANGE);
                self.generate_hyper_event(Some(glucose))
            }
            2 => {
                let device_id = format!("device-{}", self.rng.random_range(0..1000));
                self.generate_device_event(Some(&device_id))
            }
            _ => {
                let alert_type = ALERT_TYPES[self.rng.random_range(0..ALERT_TYPES.len())];
                self.generate_alert_event(Some(alert_type))
            }
        }
    }

    pub fn event_count(&self) -> u64 {
        self.counter
    }

    /// Restarts numbering at 1. Events already handed out keep their ids.
    pub fn reset_counter(&mut self) {
        self.counter = 0;
    }

    fn next_sequence(&mut self) -> u64 {
        self.counter += 1;
        self.counter
    }

    fn glucose_event(&mut self, event_type: EventType, glucose: i64) -> Event {
        let seq = self.next_sequence();
        let timestamp = now();

        let (hypo_id, hyper_id) = match event_type {
            EventType::HyperHigh => (None, Some(format!("hyper-{}", seq + HYPER_ID_OFFSET))),
            _ => (Some(format!("hypo-{}", seq + HYPO_ID_OFFSET)), None),
        };

        let properties = Properties::Glucose(GlucoseReading {
            id: format!("event-{seq}"),
            hypo_id,
            hyper_id,
            sensor: SensorInfo {
                manufacturer: "Dexcom".to_owned(),
                serial_number: "E06819507836".to_owned(),
                model: "Dexcom-G7-Emulator".to_owned(),
            },
            glucose_unit: GLUCOSE_UNIT.to_owned(),
            glucose,
            app_install_unique_id: APP_INSTALL_UNIQUE_ID,
            transmitter_time: timestamp.as_second(),
            sequence_number: seq,
            reading_time: timestamp,
        });

        Event {
            event_id: format!("{}-event-{seq}", event_type.category()),
            timestamp,
            event_type,
            properties,
        }
    }
}

fn envelope(seq: u64, event_type: EventType, properties: Properties) -> Event {
    Event {
        event_id: format!("{}-event-{seq}", event_type.category()),
        timestamp: now(),
        event_type,
        properties,
    }
}

/// Current instant truncated to milliseconds, the precision companion apps expect.
fn now() -> jiff::Timestamp {
    let now = jiff::Timestamp::now();
    jiff::Timestamp::from_millisecond(now.as_millisecond()).unwrap_or(now)
}

/// Reads a glucose value typed by a user.
///
/// Takes the leading integer of `raw` (so `"42 mg/dL"` reads as 42). Input
/// without one, or that reads as zero, falls back to `default`.
pub fn coerce_glucose(raw: &str, default: i64) -> i64 {
    let trimmed = raw.trim_start();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());

    match digits[..end].parse::<i64>() {
        Ok(0) | Err(_) => default,
        Ok(value) => sign * value,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use super::*;

    fn glucose_of(event: &Event) -> i64 {
        match &event.properties {
            Properties::Glucose(reading) => reading.glucose,
            other => panic!("expected glucose properties, got {other:?}"),
        }
    }

    fn sequence_of(event: &Event) -> u64 {
        let suffix = event.event_id.rsplit('-').next().unwrap();
        suffix.parse().unwrap()
    }

    #[test]
    fn ids_share_one_counter_across_categories() {
        let mut generator = EventGenerator::seeded(7);

        let events = vec![
            generator.generate_hypo_event(None),
            generator.generate_device_event(None),
            generator.generate_alert_event(None),
            generator.generate_hyper_event(None),
            generator.generate_random_event(),
        ];

        let ids: Vec<&str> = events.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(
            &ids[..4],
            &["hypo-event-1", "device-event-2", "alert-event-3", "hyper-event-4"]
        );

        let sequences: Vec<u64> = events.iter().map(sequence_of).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
        assert_eq!(generator.event_count(), 5);

        let unique: HashSet<&str> = ids.into_iter().collect();
        assert_eq!(unique.len(), 5);
    }

    #[test]
    fn glucose_sequence_number_matches_event_id() {
        let mut generator = EventGenerator::seeded(1);
        generator.generate_alert_event(None);

        let event = generator.generate_hyper_event(Some(280));
        let Properties::Glucose(reading) = &event.properties else {
            panic!("expected glucose properties");
        };

        assert_eq!(event.event_id, "hyper-event-2");
        assert_eq!(reading.sequence_number, 2);
        assert_eq!(reading.id, "event-2");
        assert_eq!(reading.hyper_id.as_deref(), Some("hyper-791"));
        assert_eq!(reading.hypo_id, None);
        assert_eq!(reading.reading_time, event.timestamp);
        assert_eq!(reading.transmitter_time, event.timestamp.as_second());
        assert_eq!(reading.glucose_unit, "mg/dL");
    }

    #[test]
    fn default_glucose_values() {
        let mut generator = EventGenerator::seeded(2);

        let hypo = generator.generate_hypo_event(None);
        let hyper = generator.generate_hyper_event(None);

        assert_eq!(hypo.event_type, EventType::HypoLow);
        assert_eq!(glucose_of(&hypo), 55);
        assert_eq!(hyper.event_type, EventType::HyperHigh);
        assert_eq!(glucose_of(&hyper), 300);
    }

    #[test]
    fn glucose_is_not_range_checked() {
        let mut generator = EventGenerator::seeded(3);

        assert_eq!(glucose_of(&generator.generate_hypo_event(Some(-20))), -20);
        assert_eq!(glucose_of(&generator.generate_hyper_event(Some(5000))), 5000);
    }

    #[test]
    fn device_event_fields() {
        let mut generator = EventGenerator::seeded(4);

        for _ in 0..200 {
            let event = generator.generate_device_event(None);
            let Properties::DeviceStatus(status) = &event.properties else {
                panic!("expected device status");
            };

            assert_eq!(status.device_id, "test-device-123");
            assert_eq!(status.device_name, "Test Glucose Monitor");
            assert!(status.battery_level < 100);
            assert!((1..=5).contains(&status.signal_strength));
        }
    }

    #[test]
    fn alert_message_follows_type() {
        let mut generator = EventGenerator::seeded(5);

        let event = generator.generate_alert_event(None);
        let Properties::DeviceAlert(alert) = &event.properties else {
            panic!("expected device alert");
        };

        assert_eq!(alert.alert_type, "low_battery");
        assert_eq!(alert.message, "Test alert: low_battery");
        assert_eq!(alert.priority, AlertPriority::High);
    }

    #[test]
    fn random_events_cover_all_categories_within_ranges() {
        let mut generator = EventGenerator::seeded(42);
        let mut seen: HashMap<EventType, usize> = HashMap::new();

        for _ in 0..1000 {
            let event = generator.generate_random_event();
            *seen.entry(event.event_type).or_default() += 1;

            match &event.properties {
                Properties::Glucose(reading) if event.event_type == EventType::HypoLow => {
                    assert!(RANDOM_HYPO_RANGE.contains(&reading.glucose));
                }
                Properties::Glucose(reading) => {
                    assert!(RANDOM_HYPER_RANGE.contains(&reading.glucose));
                }
                Properties::DeviceStatus(status) => {
                    let n: u32 = status.device_id.strip_prefix("device-").unwrap().parse().unwrap();
                    assert!(n < 1000);
                }
                Properties::DeviceAlert(alert) => {
                    assert!(ALERT_TYPES.contains(&alert.alert_type.as_str()));
                }
            }
        }

        assert_eq!(seen.len(), 4);
        assert!(seen.values().all(|&n| n > 0));
        assert_eq!(generator.event_count(), 1000);
    }

    #[test]
    fn reset_restarts_numbering() {
        let mut generator = EventGenerator::seeded(6);
        let first = generator.generate_hypo_event(None);
        generator.generate_hypo_event(None);

        generator.reset_counter();
        assert_eq!(generator.event_count(), 0);

        let device = generator.generate_device_event(None);
        assert_eq!(device.event_id, "device-event-1");
        assert_eq!(first.event_id, "hypo-event-1");
    }

    #[test]
    fn generated_events_round_trip_through_payload() {
        let mut generator = EventGenerator::seeded(8);

        for _ in 0..50 {
            let event = generator.generate_random_event();
            let decoded = Event::from_payload(event.to_payload().unwrap()).unwrap();
            assert_eq!(decoded, event);
        }
    }

    #[test]
    fn coerces_user_glucose_input() {
        assert_eq!(coerce_glucose("40", 55), 40);
        assert_eq!(coerce_glucose("  72 mg/dL", 55), 72);
        assert_eq!(coerce_glucose("-5", 55), -5);
        assert_eq!(coerce_glucose("abc", 55), 55);
        assert_eq!(coerce_glucose("", 300), 300);
        assert_eq!(coerce_glucose("0", 300), 300);
    }
}
