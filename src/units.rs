//! Temperature scales and the conversions between them.
//!
//! The service always stores temperatures in Celsius; the scale only affects
//! what the user sees and types.

use crate::error::NestClientError;
use core::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TemperatureScale {
    Celsius,
    Fahrenheit,
}

impl TemperatureScale {
    /// Parse the single-letter code the service uses in `temperature_scale`.
    pub fn from_code(code: &str) -> Result<Self, NestClientError> {
        match code {
            "C" => Ok(TemperatureScale::Celsius),
            "F" => Ok(TemperatureScale::Fahrenheit),
            other => Err(NestClientError::InvalidScale(other.to_string())),
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            TemperatureScale::Celsius => "C",
            TemperatureScale::Fahrenheit => "F",
        }
    }

    /// Convert a server-side Celsius value into this display scale.
    pub fn celsius_to_display(self, celsius: f64) -> f64 {
        match self {
            TemperatureScale::Celsius => celsius,
            TemperatureScale::Fahrenheit => celsius_to_fahrenheit(celsius),
        }
    }

    /// Convert a value given in this display scale into Celsius.
    pub fn display_to_celsius(self, value: f64) -> f64 {
        match self {
            TemperatureScale::Celsius => value,
            TemperatureScale::Fahrenheit => fahrenheit_to_celsius(value),
        }
    }
}

impl fmt::Display for TemperatureScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "°{}", self.code())
    }
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    9.0 / 5.0 * celsius + 32.0
}

pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}
