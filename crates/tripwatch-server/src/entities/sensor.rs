//! Sensors: one per top-level booking field.

use std::fmt;

use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use tripwatch_core::{CheckInStatus, CheckedInFlight, Snapshot};

use super::{NULL, entity_id, flatten_attributes, unique_id};

/// How a sensor turns its raw field into a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    /// Scalars as-is, objects by their first value, arrays by their length.
    Plain,
    /// Sum of the numeric members.
    Total,
    /// Outbound flight number.
    OutboundFlight,
    /// Check-in opening time.
    Timestamp,
    /// Check-in state derived from `checkInStatus`.
    CheckInState,
}

#[derive(Debug, Clone, Copy)]
pub struct SensorDescription {
    pub key: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub kind: SensorKind,
}

impl SensorDescription {
    const fn plain(key: &'static str, name: &'static str, icon: &'static str) -> Self {
        Self {
            key,
            name,
            icon,
            kind: SensorKind::Plain,
        }
    }

    /// The data key whose presence creates this sensor.
    pub fn source_key(&self) -> &'static str {
        match self.kind {
            SensorKind::CheckInState => "checkInStatus",
            _ => self.key,
        }
    }
}

pub const SENSOR_TYPES: [SensorDescription; 25] = [
    SensorDescription::plain("departure", "Departure", "mdi:airplane-takeoff"),
    SensorDescription::plain("region", "Region", "mdi:map"),
    SensorDescription::plain("area", "Area", "mdi:map-outline"),
    SensorDescription::plain("resort", "Resort", "mdi:beach"),
    SensorDescription {
        key: "numberOfPassengers",
        name: "Number of Passengers",
        icon: "mdi:account-multiple",
        kind: SensorKind::Total,
    },
    SensorDescription::plain("reservedSeats", "Reserved Seats", "mdi:seat-passenger"),
    SensorDescription::plain(
        "numberOfInclusiveBags",
        "Number of Inclusive Bags",
        "mdi:bag-personal",
    ),
    SensorDescription::plain(
        "numberOfAdditionalBags",
        "Number of Additional Bags",
        "mdi:bag-personal-outline",
    ),
    SensorDescription::plain("insurance", "Insurance", "mdi:shield-airplane"),
    SensorDescription::plain("bookedMeals", "Booked Meals", "mdi:food"),
    SensorDescription::plain("bookingReference", "Booking Reference", "mdi:file-document"),
    SensorDescription::plain("holidayType", "Holiday Type", "mdi:information-outline"),
    SensorDescription::plain("priceBreakdown", "Price Breakdown", "mdi:cash"),
    SensorDescription::plain("hotel", "Hotel", "mdi:office-building"),
    SensorDescription {
        key: "flightSummary",
        name: "Flight Summary",
        icon: "mdi:airplane-settings",
        kind: SensorKind::OutboundFlight,
    },
    SensorDescription::plain("transferSummary", "Transfer Summary", "mdi:bus"),
    SensorDescription::plain("carHireSummaries", "Car Hire Summary", "mdi:car-settings"),
    SensorDescription::plain(
        "numberOfFreeChildPlaces",
        "Number of Free Child Places",
        "mdi:human-child",
    ),
    SensorDescription::plain(
        "numberOfFreeInfantPlaces",
        "Number of Free Infant Places",
        "mdi:baby",
    ),
    SensorDescription::plain(
        "holidaySummaries",
        "Holiday Summaries",
        "mdi:information-variant",
    ),
    SensorDescription::plain(
        "holidayDuration",
        "Holiday Duration",
        "mdi:calendar-start-outline",
    ),
    SensorDescription {
        key: "checkInStatus",
        name: "Check-In Open",
        icon: "mdi:airplane-check",
        kind: SensorKind::Timestamp,
    },
    SensorDescription {
        key: "checkInState",
        name: "Check-In Status",
        icon: "mdi:airplane-check",
        kind: SensorKind::CheckInState,
    },
    SensorDescription::plain(
        "scheduleChangeInfo",
        "Schedule Change Info",
        "mdi:information-variant-box",
    ),
    SensorDescription::plain(
        "accommodationExtrasSummaries",
        "Accommodation Extras Summaries",
        "mdi:information-box",
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorValue {
    Text(String),
    Number(Number),
    Bool(bool),
    Timestamp(DateTime<Tz>),
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorValue::Text(text) => f.write_str(text),
            SensorValue::Number(n) => write!(f, "{n}"),
            SensorValue::Bool(b) => write!(f, "{b}"),
            SensorValue::Timestamp(dt) => f.write_str(&dt.to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorState {
    pub key: &'static str,
    pub unique_id: String,
    pub entity_id: String,
    pub name: &'static str,
    pub icon: &'static str,
    pub available: bool,
    pub value: Option<SensorValue>,
    pub attributes: Map<String, Value>,
}

/// Renders every sensor whose source field is present in the snapshot.
pub fn render(
    reference: &str,
    snapshot: Option<&Snapshot>,
    available: bool,
    tz: &Tz,
) -> Vec<SensorState> {
    let Some(snapshot) = snapshot else {
        return Vec::new();
    };
    let data = snapshot.data();
    SENSOR_TYPES
        .iter()
        .filter(|description| data.contains_key(description.source_key()))
        .map(|description| {
            let raw = data.get(description.key).unwrap_or(&NULL);
            SensorState {
                key: description.key,
                unique_id: unique_id(reference, description.key, ""),
                entity_id: entity_id("sensor", reference, description.key),
                name: description.name,
                icon: description.icon,
                available,
                value: value_of(description.kind, raw, snapshot, tz),
                attributes: flatten_attributes(raw),
            }
        })
        .collect()
}

fn value_of(kind: SensorKind, raw: &Value, snapshot: &Snapshot, tz: &Tz) -> Option<SensorValue> {
    let details = snapshot.data().details();
    match kind {
        SensorKind::Plain => plain_value(raw),
        SensorKind::Total => {
            let Value::Object(members) = raw else {
                return plain_value(raw);
            };
            total(members).map(SensorValue::Number)
        }
        SensorKind::OutboundFlight => details
            .flight_summary
            .as_ref()?
            .outbound
            .as_ref()?
            .number
            .clone()
            .map(SensorValue::Text),
        SensorKind::Timestamp => details
            .check_in_status
            .as_ref()?
            .check_in_date
            .map(|date| SensorValue::Timestamp(date.localize(tz))),
        SensorKind::CheckInState => check_in_state(details.check_in_status.as_ref()?)
            .map(SensorValue::Text),
    }
}

/// Sum of the numeric members, integral while every member is an integer.
fn total(members: &Map<String, Value>) -> Option<Number> {
    let numbers: Vec<&Number> = members
        .values()
        .filter_map(|value| match value {
            Value::Number(n) => Some(n),
            _ => None,
        })
        .collect();
    let integral = numbers
        .iter()
        .try_fold(0i64, |sum, n| sum.checked_add(n.as_i64()?));
    match integral {
        Some(sum) => Some(Number::from(sum)),
        None => Number::from_f64(numbers.iter().filter_map(|n| n.as_f64()).sum()),
    }
}

fn plain_value(raw: &Value) -> Option<SensorValue> {
    match raw {
        Value::Null => None,
        Value::Bool(b) => Some(SensorValue::Bool(*b)),
        Value::Number(n) => Some(SensorValue::Number(n.clone())),
        Value::String(s) => Some(SensorValue::Text(s.clone())),
        Value::Array(items) => Some(SensorValue::Text(items.len().to_string())),
        Value::Object(members) => match members.values().next()? {
            Value::Object(_) => None,
            first => plain_value(first),
        },
    }
}

/// "Not Allowed", or the latest checked-in code, or "Allowed".
fn check_in_state(status: &CheckInStatus) -> Option<String> {
    if !status.check_in_allowed? {
        return Some("Not Allowed".to_string());
    }
    let code = |flight: &Option<CheckedInFlight>| {
        flight
            .as_ref()
            .and_then(|flight| flight.checked_in_code.clone())
    };
    Some(
        code(&status.inbound_flight)
            .or_else(|| code(&status.outbound_flight))
            .unwrap_or_else(|| "Allowed".to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::booking_body;
    use chrono_tz::Europe::London;
    use serde_json::json;

    fn sensors(body: Value) -> Vec<SensorState> {
        let snapshot = Snapshot::from_value(body).unwrap();
        render("ABC123", Some(&snapshot), snapshot.success(), &London)
    }

    fn sensor<'a>(sensors: &'a [SensorState], key: &str) -> &'a SensorState {
        sensors.iter().find(|s| s.key == key).unwrap()
    }

    fn text(value: &str) -> Option<SensorValue> {
        Some(SensorValue::Text(value.to_string()))
    }

    #[test]
    fn only_present_fields_become_sensors() {
        let sensors = sensors(json!({
            "success": true,
            "data": { "region": "Majorca", "unrelated": 1 }
        }));
        assert_eq!(sensors.len(), 1);
        let region = &sensors[0];
        assert_eq!(region.unique_id, "jet2-abc123-region");
        assert_eq!(region.entity_id, "sensor.jet2_abc123_region");
        assert_eq!(region.value, text("Majorca"));
        assert!(region.available);
    }

    #[test]
    fn derived_values() {
        let sensors = sensors(booking_body());

        assert_eq!(
            sensor(&sensors, "numberOfPassengers").value,
            Some(SensorValue::Number(3.into()))
        );
        assert_eq!(sensor(&sensors, "flightSummary").value, text("LS123"));
        assert_eq!(sensor(&sensors, "hotel").value, text("Hotel Sol"));
        assert_eq!(
            sensor(&sensors, "priceBreakdown").value,
            text("2030-05-01T00:00:00")
        );

        let opens = sensor(&sensors, "checkInStatus").value.clone().unwrap();
        assert_eq!(opens.to_string(), "2030-05-25T10:00:00+01:00");
    }

    #[test]
    fn totals_keep_fractions() {
        let sensors = sensors(json!({
            "success": true,
            "data": { "numberOfPassengers": { "adults": 1000, "children": 1450.5, "note": "x" } }
        }));
        let value = sensor(&sensors, "numberOfPassengers").value.clone().unwrap();
        assert_eq!(value.to_string(), "2450.5");

        let whole = total(json!({ "a": 2, "b": 1 }).as_object().unwrap()).unwrap();
        assert_eq!(whole.as_i64(), Some(3));
        let mixed = total(json!({ "a": 2, "b": 1.0 }).as_object().unwrap()).unwrap();
        assert_eq!(mixed.as_f64(), Some(3.0));
        assert!(mixed.as_i64().is_none());
    }

    #[test]
    fn arrays_report_their_length() {
        let sensors = sensors(json!({
            "success": true,
            "data": { "reservedSeats": [{ "seat": "1A" }, { "seat": "1B" }] }
        }));
        let seats = sensor(&sensors, "reservedSeats");
        assert_eq!(seats.value, text("2"));
        assert_eq!(seats.attributes["seat1"], "1B");
    }

    #[test]
    fn attributes_copy_object_members() {
        let sensors = sensors(booking_body());
        let passengers = sensor(&sensors, "numberOfPassengers");
        assert_eq!(passengers.attributes["adults"], 2);
        assert_eq!(passengers.attributes["infants"], 0);
    }

    #[test]
    fn check_in_state_variants() {
        let status = |value: Value| -> CheckInStatus { serde_json::from_value(value).unwrap() };

        assert_eq!(
            check_in_state(&status(json!({ "checkInAllowed": false }))),
            Some("Not Allowed".into())
        );
        assert_eq!(
            check_in_state(&status(json!({ "checkInAllowed": true }))),
            Some("Allowed".into())
        );
        assert_eq!(
            check_in_state(&status(json!({
                "checkInAllowed": true,
                "outboundFlight": { "checkedInCode": "OUT" },
                "inboundFlight": { "checkedInCode": "IN" }
            }))),
            Some("IN".into())
        );
        assert_eq!(
            check_in_state(&status(json!({
                "checkInAllowed": true,
                "outboundFlight": { "checkedInCode": "OUT" },
                "inboundFlight": null
            }))),
            Some("OUT".into())
        );
        assert_eq!(check_in_state(&status(json!({}))), None);
    }

    #[test]
    fn check_in_state_sensor_follows_check_in_status() {
        let sensors = sensors(json!({
            "success": true,
            "data": { "checkInStatus": { "checkInAllowed": false } }
        }));
        assert_eq!(sensor(&sensors, "checkInState").value, text("Not Allowed"));
        assert_eq!(sensor(&sensors, "checkInStatus").value, None);
    }

    #[test]
    fn no_snapshot_no_sensors() {
        assert!(render("ABC123", None, false, &London).is_empty());
    }
}
