//! Decoded booking snapshots.
//!
//! The upstream response is decoded once into a [`Snapshot`] before any
//! field-specific logic runs. The raw JSON object is kept for sensors that
//! expose arbitrary keys, next to a typed [`BookingDetails`] view of the
//! fields the projector and adapters depend on. A known field with the wrong
//! shape fails the whole decode with [`DecodeError::Schema`].

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::time::WallClock;

/// Why an upstream body could not be turned into a [`Snapshot`].
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("response body is not valid JSON: {0}")]
    NotJson(#[source] serde_json::Error),

    #[error("response body is not a JSON object")]
    NotAnObject,

    #[error("response does not match the booking schema: {0}")]
    Schema(String),
}

/// One booking response, replaced wholesale on every successful poll.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    success: bool,
    data: BookingData,
}

impl Snapshot {
    /// Decodes a raw response body.
    pub fn decode(body: &[u8]) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_slice(body).map_err(DecodeError::NotJson)?;
        Self::from_value(value)
    }

    /// Decodes an already parsed JSON document.
    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        let Value::Object(mut root) = value else {
            return Err(DecodeError::NotAnObject);
        };

        let success = match root.remove("success") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(flag)) => flag,
            Some(other) => {
                return Err(DecodeError::Schema(format!(
                    "`success` must be a boolean, got {}",
                    kind_of(&other)
                )));
            }
        };

        let raw = match root.remove("data") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(DecodeError::Schema(format!(
                    "`data` must be an object, got {}",
                    kind_of(&other)
                )));
            }
        };

        Ok(Self {
            success,
            data: BookingData::from_map(raw)?,
        })
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> &BookingData {
        &self.data
    }

    /// Whether the booking is still live as of `now`.
    ///
    /// A rejected response, or a booking whose `expiryDate` is at most one
    /// hour ahead, is expired. Without an `expiryDate` the booking stays
    /// active.
    pub fn lifecycle(&self, now: DateTime<Utc>, tz: &Tz) -> BookingLifecycle {
        if !self.success {
            return BookingLifecycle::Expired(ExpiryReason::Rejected);
        }
        match self.data.details().expiry_date {
            Some(expiry) => {
                let expiry = expiry.localize(tz).with_timezone(&Utc);
                if expiry - now <= Duration::hours(1) {
                    BookingLifecycle::Expired(ExpiryReason::PastExpiry(expiry))
                } else {
                    BookingLifecycle::Active
                }
            }
            None => BookingLifecycle::Active,
        }
    }
}

/// Lifecycle verdict for a booking snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingLifecycle {
    Active,
    Expired(ExpiryReason),
}

impl BookingLifecycle {
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryReason {
    /// Upstream answered with `success: false`.
    Rejected,
    /// The booking's expiry date is less than an hour away.
    PastExpiry(DateTime<Utc>),
}

/// The `data` object of a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingData {
    raw: Map<String, Value>,
    details: BookingDetails,
}

impl BookingData {
    fn from_map(raw: Map<String, Value>) -> Result<Self, DecodeError> {
        let details = serde_json::from_value(Value::Object(raw.clone()))
            .map_err(|e| DecodeError::Schema(e.to_string()))?;
        Ok(Self { raw, details })
    }

    /// The untouched JSON object.
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.raw.contains_key(key)
    }

    pub fn details(&self) -> &BookingDetails {
        &self.details
    }

    /// Display name of the accommodation, using [`ACCOMMODATION_NAME_RULES`].
    pub fn accommodation_name(&self) -> Option<&str> {
        first_match(&ACCOMMODATION_NAME_RULES, &self.details)
    }

    /// `"hotel, resort, area, region"` when all four parts are known.
    pub fn full_location(&self) -> Option<String> {
        let parts: Option<Vec<&str>> = ACCOMMODATION_NAME_RULES
            .iter()
            .map(|rule| rule.value(&self.details))
            .collect();
        parts.map(|parts| parts.join(", "))
    }
}

/// Typed view of the booking fields the rest of the system reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    pub booking_reference: Option<String>,
    pub holiday_type: Option<String>,
    #[serde(default, deserialize_with = "optional_wall_clock")]
    pub expiry_date: Option<WallClock>,
    pub price_breakdown: Option<PriceBreakdown>,
    pub flight_summary: Option<FlightSummary>,
    pub check_in_status: Option<CheckInStatus>,
    pub hotel: Option<Hotel>,
    pub resort: Option<String>,
    pub area: Option<String>,
    pub region: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub accommodation_images: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    #[serde(default, deserialize_with = "optional_wall_clock")]
    pub payment_date_due: Option<WallClock>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightSummary {
    pub outbound: Option<FlightLeg>,
    pub inbound: Option<FlightLeg>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightLeg {
    pub number: Option<String>,
    #[serde(default, deserialize_with = "optional_wall_clock")]
    pub local_departure_date_time: Option<WallClock>,
    #[serde(default, deserialize_with = "optional_wall_clock")]
    pub local_arrival_date_time: Option<WallClock>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInStatus {
    #[serde(default, deserialize_with = "optional_wall_clock")]
    pub check_in_date: Option<WallClock>,
    pub check_in_allowed: Option<bool>,
    pub outbound_flight: Option<CheckedInFlight>,
    pub inbound_flight: Option<CheckedInFlight>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckedInFlight {
    pub checked_in_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotel {
    pub name: Option<String>,
}

/// Empty strings count as absent, like `null`.
fn optional_wall_clock<'de, D>(deserializer: D) -> Result<Option<WallClock>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => WallClock::parse(&raw)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// One step of a "first present field wins" name derivation.
#[derive(Debug, Clone, Copy)]
pub struct NameRule {
    /// Upstream key the rule reads.
    pub field: &'static str,
    /// Whether the rule can contribute for this booking.
    pub applies: fn(&BookingDetails) -> bool,
    /// The value the rule contributes.
    pub extract: fn(&BookingDetails) -> Option<&str>,
}

impl NameRule {
    /// The rule's value, if it applies and yields a non-blank string.
    pub fn value<'a>(&self, details: &'a BookingDetails) -> Option<&'a str> {
        if !(self.applies)(details) {
            return None;
        }
        (self.extract)(details).filter(|value| !value.trim().is_empty())
    }
}

/// Evaluates `rules` in order and returns the first value produced.
pub fn first_match<'a>(rules: &[NameRule], details: &'a BookingDetails) -> Option<&'a str> {
    rules.iter().find_map(|rule| rule.value(details))
}

/// Hotel name, then resort, then area, then region.
pub const ACCOMMODATION_NAME_RULES: [NameRule; 4] = [
    NameRule {
        field: "hotel",
        applies: has_hotel,
        extract: hotel_name,
    },
    NameRule {
        field: "resort",
        applies: has_resort,
        extract: resort,
    },
    NameRule {
        field: "area",
        applies: has_area,
        extract: area,
    },
    NameRule {
        field: "region",
        applies: has_region,
        extract: region,
    },
];

fn has_hotel(details: &BookingDetails) -> bool {
    details.hotel.is_some()
}

fn hotel_name(details: &BookingDetails) -> Option<&str> {
    details.hotel.as_ref()?.name.as_deref()
}

fn has_resort(details: &BookingDetails) -> bool {
    details.resort.is_some()
}

fn resort(details: &BookingDetails) -> Option<&str> {
    details.resort.as_deref()
}

fn has_area(details: &BookingDetails) -> bool {
    details.area.is_some()
}

fn area(details: &BookingDetails) -> Option<&str> {
    details.area.as_deref()
}

fn has_region(details: &BookingDetails) -> bool {
    details.region.is_some()
}

fn region(details: &BookingDetails) -> Option<&str> {
    details.region.as_deref()
}
