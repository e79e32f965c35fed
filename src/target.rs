use crate::error::NestClientError;
use crate::models::nest::{DeviceRecord, StateSnapshot};
use crate::units::TemperatureScale;

/// The selected thermostat with its values converted for display.
///
/// The view is a copy taken at selection time; it does not follow later
/// state fetches until it is rebuilt.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetDevice {
    pub device_id: String,
    pub temperature_scale: TemperatureScale,
    pub temperature: f64,
    pub target_temperature: f64,
    pub humidity: f64,
    pub device: DeviceRecord,
}

impl TargetDevice {
    /// Build the display view for `device_id` from a snapshot.
    ///
    /// Only this device's records need the scale, humidity and temperature
    /// fields; other devices on the account may lack them.
    pub fn from_state(state: &StateSnapshot, device_id: &str) -> Result<Self, NestClientError> {
        let device = state
            .device
            .get(device_id)
            .ok_or_else(|| NestClientError::UnknownDevice(device_id.to_string()))?;
        let shared = state
            .shared
            .get(device_id)
            .ok_or_else(|| NestClientError::UnknownDevice(device_id.to_string()))?;

        let scale_code = require(device.temperature_scale.as_deref(), "device", device_id, "temperature_scale")?;
        let scale = TemperatureScale::from_code(scale_code)?;
        let current = require(shared.current_temperature, "shared", device_id, "current_temperature")?;
        let target = require(shared.target_temperature, "shared", device_id, "target_temperature")?;
        let humidity = require(device.current_humidity, "device", device_id, "current_humidity")?;

        Ok(TargetDevice {
            device_id: device_id.to_string(),
            temperature_scale: scale,
            temperature: scale.celsius_to_display(current),
            target_temperature: scale.celsius_to_display(target),
            humidity,
            device: device.clone(),
        })
    }
}

fn require<V>(value: Option<V>, kind: &str, id: &str, field: &'static str) -> Result<V, NestClientError> {
    value.ok_or_else(|| NestClientError::IncompleteRecord {
        record: format!("{} {}", kind, id),
        field,
    })
}
