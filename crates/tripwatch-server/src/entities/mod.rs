//! Read-only views of a booking snapshot.
//!
//! Every adapter is a pure render over the coordinator's current snapshot
//! and refresh status; nothing here mutates state except the camera's
//! rotation index.

pub mod binary_sensor;
pub mod calendar;
pub mod camera;
pub mod device;
pub mod sensor;

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;
use serde_json::{Map, Value};
use tripwatch_core::Snapshot;

use crate::coordinator::RefreshStatus;

pub use binary_sensor::{BINARY_SENSOR_TYPES, BinarySensorDescription, BinarySensorState};
pub use calendar::CalendarView;
pub use camera::{CameraFeed, CameraState};
pub use device::DeviceInfo;
pub use sensor::{SENSOR_TYPES, SensorDescription, SensorKind, SensorState, SensorValue};

/// Integration domain used in identifiers.
pub const DOMAIN: &str = "jet2";

pub(crate) static NULL: Value = Value::Null;

/// `jet2-{reference}-{key}{suffix}`, lowercased.
pub(crate) fn unique_id(reference: &str, key: &str, suffix: &str) -> String {
    format!("{DOMAIN}-{reference}-{key}{suffix}").to_lowercase()
}

/// `{platform}.jet2_{reference}_{key}`, lowercased.
pub(crate) fn entity_id(platform: &str, reference: &str, key: &str) -> String {
    format!("{platform}.{DOMAIN}_{reference}_{key}").to_lowercase()
}

/// Extra attributes exposed alongside a sensor state.
///
/// Object members are copied as-is. Objects inside an array are flattened
/// with the element index appended to each key (`name0`, `name1`, ...).
/// Anything else contributes nothing.
pub(crate) fn flatten_attributes(value: &Value) -> Map<String, Value> {
    let mut attrs = Map::new();
    match value {
        Value::Object(map) => {
            attrs.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                if let Value::Object(map) = item {
                    for (k, v) in map {
                        attrs.insert(format!("{k}{index}"), v.clone());
                    }
                }
            }
        }
        _ => {}
    }
    attrs
}

/// Truthiness of a JSON value: null, false, zero and empty values are off.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Everything one booking exposes, rendered at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct BookingEntities {
    pub device: DeviceInfo,
    pub available: bool,
    pub sensors: Vec<SensorState>,
    pub binary_sensors: Vec<BinarySensorState>,
    pub camera: CameraState,
    pub calendar: CalendarView,
}

impl BookingEntities {
    /// Renders every adapter for `reference` from `snapshot`.
    ///
    /// Adapters are available while the snapshot is successful and the
    /// latest poll in `status` succeeded. A failed poll keeps the previous
    /// values but reports them unavailable until a poll succeeds again.
    pub fn render(
        reference: &str,
        snapshot: Option<&Snapshot>,
        status: &RefreshStatus,
        tz: &Tz,
        today: NaiveDate,
    ) -> Self {
        let available = snapshot.is_some_and(Snapshot::success) && status.last_update_success();
        Self {
            device: DeviceInfo::new(reference, snapshot),
            available,
            sensors: sensor::render(reference, snapshot, available, tz),
            binary_sensors: binary_sensor::render(reference, snapshot, available),
            camera: CameraState::render(reference, snapshot, available),
            calendar: CalendarView::render(reference, snapshot, available, tz, today),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RefreshError;
    use crate::testing::booking_body;
    use chrono_tz::Europe::London;
    use serde_json::json;

    #[test]
    fn identifiers_are_lowercased() {
        assert_eq!(
            unique_id("ABC123", "flightSummary", ""),
            "jet2-abc123-flightsummary"
        );
        assert_eq!(
            unique_id("ABC123", "checkInStatus", "-binary"),
            "jet2-abc123-checkinstatus-binary"
        );
        assert_eq!(
            entity_id("sensor", "ABC123", "holidayType"),
            "sensor.jet2_abc123_holidaytype"
        );
    }

    #[test]
    fn flattens_objects_and_arrays_of_objects() {
        let attrs = flatten_attributes(&json!({ "adults": 2, "children": 1 }));
        assert_eq!(attrs["adults"], 2);
        assert_eq!(attrs.len(), 2);

        let attrs = flatten_attributes(&json!([
            { "seat": "1A" },
            { "seat": "1B" },
            "ignored"
        ]));
        assert_eq!(attrs["seat0"], "1A");
        assert_eq!(attrs["seat1"], "1B");
        assert_eq!(attrs.len(), 2);

        assert!(flatten_attributes(&json!("text")).is_empty());
    }

    #[test]
    fn truthiness() {
        for off in [json!(null), json!(false), json!(0), json!(""), json!([]), json!({})] {
            assert!(!is_truthy(&off), "{off} should be off");
        }
        for on in [json!(true), json!(1.5), json!("x"), json!([0]), json!({ "a": 0 })] {
            assert!(is_truthy(&on), "{on} should be on");
        }
    }

    #[test]
    fn render_without_snapshot_is_unavailable() {
        let today = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        let entities =
            BookingEntities::render("ABC123", None, &RefreshStatus::default(), &London, today);
        assert!(!entities.available);
        assert!(entities.sensors.is_empty());
        assert!(entities.binary_sensors.is_empty());
        assert!(!entities.camera.available);
        assert!(entities.calendar.event.is_none());
    }

    #[test]
    fn render_full_booking() {
        let snapshot = Snapshot::from_value(booking_body()).unwrap();
        let today = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        let entities = BookingEntities::render(
            "ABC123",
            Some(&snapshot),
            &RefreshStatus::default(),
            &London,
            today,
        );

        assert!(entities.available);
        assert_eq!(entities.device.name, "ABC123");
        assert!(!entities.sensors.is_empty());
        assert_eq!(entities.binary_sensors.len(), 3);
        assert_eq!(entities.camera.name, "Hotel Sol");
        assert_eq!(entities.calendar.name, "Jet2 - ABC123");
    }

    #[test]
    fn failed_refresh_marks_everything_unavailable() {
        let snapshot = Snapshot::from_value(booking_body()).unwrap();
        let today = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        let status = RefreshStatus {
            last_error: Some(RefreshError::Unknown("unexpected status 503".into())),
            consecutive_failures: 3,
            ..Default::default()
        };
        let entities = BookingEntities::render("ABC123", Some(&snapshot), &status, &London, today);

        assert!(!entities.available);
        assert!(!entities.sensors.is_empty());
        assert!(entities.sensors.iter().all(|s| !s.available));
        assert!(entities.binary_sensors.iter().all(|s| !s.available));
        assert!(!entities.camera.available);
        assert!(!entities.calendar.available);
        assert!(entities.calendar.event.is_some());
    }
}
