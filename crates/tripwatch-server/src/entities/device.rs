//! Device grouping shared by every entity of a booking.

use serde::Serialize;
use tripwatch_core::Snapshot;

use super::DOMAIN;

pub const MANUFACTURER: &str = "Jet2";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// `(domain, reference)` pair identifying the device.
    pub identifiers: (String, String),
    pub manufacturer: &'static str,
    /// The booking's `holidayType`.
    pub model: Option<String>,
    /// Upper-cased booking reference.
    pub name: String,
}

impl DeviceInfo {
    pub fn new(reference: &str, snapshot: Option<&Snapshot>) -> Self {
        Self {
            identifiers: (DOMAIN.to_string(), reference.to_string()),
            manufacturer: MANUFACTURER,
            model: snapshot.and_then(|s| s.data().details().holiday_type.clone()),
            name: reference.to_uppercase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn model_is_holiday_type() {
        let snapshot = Snapshot::from_value(json!({
            "success": true,
            "data": { "holidayType": "Package" }
        }))
        .unwrap();

        let device = DeviceInfo::new("abc123", Some(&snapshot));
        assert_eq!(device.identifiers, ("jet2".to_string(), "abc123".to_string()));
        assert_eq!(device.manufacturer, "Jet2");
        assert_eq!(device.model.as_deref(), Some("Package"));
        assert_eq!(device.name, "ABC123");

        assert_eq!(DeviceInfo::new("abc123", None).model, None);
    }
}
