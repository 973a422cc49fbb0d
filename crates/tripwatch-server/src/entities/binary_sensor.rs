//! Binary sensors for boolean-ish booking flags.

use serde::Serialize;
use serde_json::{Map, Value};
use tripwatch_core::Snapshot;

use super::{NULL, entity_id, flatten_attributes, is_truthy, unique_id};

#[derive(Debug, Clone, Copy)]
pub struct BinarySensorDescription {
    pub key: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    /// Member of the field's object holding the flag, if the field is an object.
    pub member: Option<&'static str>,
}

pub const BINARY_SENSOR_TYPES: [BinarySensorDescription; 3] = [
    BinarySensorDescription {
        key: "isTradeBooking",
        name: "Is Trade Booking",
        icon: "mdi:briefcase",
        member: None,
    },
    BinarySensorDescription {
        key: "hasResortFlightCheckIn",
        name: "Has Resort Flight Check-in",
        icon: "mdi:airplane-check",
        member: None,
    },
    BinarySensorDescription {
        key: "checkInStatus",
        name: "Check-In Allowed",
        icon: "mdi:airplane-check",
        member: Some("checkInAllowed"),
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinarySensorState {
    pub key: &'static str,
    pub unique_id: String,
    pub entity_id: String,
    pub name: &'static str,
    pub icon: &'static str,
    pub available: bool,
    pub is_on: bool,
    pub attributes: Map<String, Value>,
}

/// Renders every binary sensor whose field is present in the snapshot.
pub fn render(
    reference: &str,
    snapshot: Option<&Snapshot>,
    available: bool,
) -> Vec<BinarySensorState> {
    let Some(snapshot) = snapshot else {
        return Vec::new();
    };
    let data = snapshot.data();
    BINARY_SENSOR_TYPES
        .iter()
        .filter_map(|description| {
            let raw = data.get(description.key)?;
            let value = match (description.member, raw) {
                (Some(member), Value::Object(map)) => map.get(member).unwrap_or(&NULL),
                _ => raw,
            };
            Some(BinarySensorState {
                key: description.key,
                unique_id: unique_id(reference, description.key, "-binary"),
                entity_id: entity_id("binary_sensor", reference, description.key),
                name: description.name,
                icon: description.icon,
                available,
                is_on: is_truthy(value),
                attributes: flatten_attributes(value),
            })
        })
        .collect()
}
