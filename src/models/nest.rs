//! Typed records for the Nest mobile API payloads.
//!
//! Only the fields the client reads are modeled explicitly. Everything else
//! the service sends is kept in `extra` so a snapshot can be re-serialized
//! without loss. Per-device and per-structure fields are optional here;
//! they are required only on the records the client actually uses.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// =====================
// Login
// =====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub urls: LoginUrls,
    pub access_token: String,
    pub userid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginUrls {
    pub transport_url: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

// =====================
// State snapshot
// =====================

/// Whole-account state as returned by `GET /v2/mobile/user.<id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub device: BTreeMap<String, DeviceRecord>,
    pub schedule: BTreeMap<String, Value>,
    pub shared: BTreeMap<String, SharedRecord>,
    pub structure: BTreeMap<String, StructureRecord>,
    pub user: BTreeMap<String, UserRecord>,
}

impl StateSnapshot {
    /// Attach forecasts to structures, in the order given.
    ///
    /// A structure listed twice ends up with the last forecast. Ids that do
    /// not name a structure in the snapshot are ignored; callers resolve
    /// them before fetching.
    pub fn with_weather<I>(mut self, forecasts: I) -> Self
    where
        I: IntoIterator<Item = (String, ForecastData)>,
    {
        for (structure_id, forecast) in forecasts {
            if let Some(structure) = self.structure.get_mut(&structure_id) {
                structure.weather = Some(forecast);
            }
        }
        self
    }
}

/// Per-thermostat settings (`device.<serial>`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Display scale code, `C` or `F`. Kept raw; validated on selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_scale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_humidity: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Live values for a thermostat (`shared.<serial>`). Always Celsius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_temperature: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<ForecastData>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl StructureRecord {
    pub fn name(&self) -> Option<&str> {
        self.extra.get("name").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub structures: Vec<StructureRef>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A `structure.<id>` reference from a user record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructureRef(pub String);

impl StructureRef {
    /// The id segment after the first `.` separator.
    pub fn structure_id(&self) -> Option<&str> {
        self.0.split('.').nth(1).filter(|id| !id.is_empty())
    }
}

// =====================
// Weather
// =====================

/// Forecast payload, passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForecastData(pub Value);

// =====================
// Commands
// =====================

/// Body of `POST /v2/put/shared.<serial>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandBody {
    pub target_change_pending: bool,
    pub target_temperature: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn load_state_fixture() -> StateSnapshot {
        let json = std::fs::read_to_string("tests/data/state.json").expect("fixture present");
        serde_json::from_str(&json).expect("parse state snapshot")
    }

    #[test]
    fn parses_state_fixture() {
        let state = load_state_fixture();
        let device = state.device.get("01AA02AB031234XY").expect("device present");
        assert_eq!(device.temperature_scale.as_deref(), Some("F"));
        assert_eq!(device.current_humidity, Some(41.0));
        assert!(device.extra.contains_key("serial_number"));

        let shared = state.shared.get("01AA02AB031234XY").expect("shared present");
        assert_eq!(shared.current_temperature, Some(20.0));
        assert_eq!(shared.target_temperature, Some(21.5));

        let user = state.user.get("1234567").expect("user present");
        let ids: Vec<_> = user.structures.iter().filter_map(StructureRef::structure_id).collect();
        assert_eq!(ids, ["1", "2"]);
        assert_eq!(state.structure.get("1").and_then(StructureRecord::name), Some("Home"));
        assert!(state.structure.values().all(|s| s.weather.is_none()));
    }

    #[test]
    fn records_without_read_fields_still_parse() {
        let state: StateSnapshot = serde_json::from_value(json!({
            "device": {"02BB": {"serial_number": "02BB"}},
            "schedule": {},
            "shared": {"02BB": {"name": "Basement"}},
            "structure": {"9": {"name": "Storage"}},
            "user": {"1": {"structures": []}}
        }))
        .expect("parse sparse snapshot");
        assert_eq!(state.device["02BB"].temperature_scale, None);
        assert_eq!(state.device["02BB"].current_humidity, None);
        assert_eq!(state.shared["02BB"].current_temperature, None);
        assert_eq!(state.structure["9"].postal_code, None);

        let back = serde_json::to_value(&state.device["02BB"]).expect("serialize");
        assert_eq!(back, json!({"serial_number": "02BB"}));
    }

    #[test]
    fn structure_ref_takes_segment_after_separator() {
        assert_eq!(StructureRef("structure.abc-123".into()).structure_id(), Some("abc-123"));
        assert_eq!(StructureRef("structure.a.b".into()).structure_id(), Some("a"));
        assert_eq!(StructureRef("structure".into()).structure_id(), None);
        assert_eq!(StructureRef("structure.".into()).structure_id(), None);
    }

    #[test]
    fn with_weather_overwrites_in_order() {
        let state = load_state_fixture();
        let augmented = state.with_weather([
            ("1".to_string(), ForecastData(json!({"now": {"temp": 1}}))),
            ("2".to_string(), ForecastData(json!({"now": {"temp": 2}}))),
            ("1".to_string(), ForecastData(json!({"now": {"temp": 3}}))),
            ("missing".to_string(), ForecastData(json!({}))),
        ]);
        assert_eq!(
            augmented.structure["1"].weather,
            Some(ForecastData(json!({"now": {"temp": 3}})))
        );
        assert_eq!(
            augmented.structure["2"].weather,
            Some(ForecastData(json!({"now": {"temp": 2}})))
        );
        assert_eq!(augmented.structure.len(), 2);
    }

    #[test]
    fn weather_is_serialized_only_when_present() {
        let mut structure: StructureRecord =
            serde_json::from_value(json!({"postal_code": "94043", "name": "Home"})).expect("parse");
        let plain = serde_json::to_value(&structure).expect("serialize");
        assert!(plain.get("weather").is_none());
        assert_eq!(plain["name"], "Home");

        structure.weather = Some(ForecastData(json!({"94043": {}})));
        let with = serde_json::to_value(&structure).expect("serialize");
        assert_eq!(with["weather"], json!({"94043": {}}));
    }

    #[test]
    fn command_body_shape() {
        let body = CommandBody {
            target_change_pending: true,
            target_temperature: 20.0,
        };
        assert_eq!(
            serde_json::to_value(&body).expect("serialize"),
            json!({"target_change_pending": true, "target_temperature": 20.0})
        );
    }
}
