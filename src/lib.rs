//! Client for the unofficial Nest thermostat web API.
//!
//! ```no_run
//! use nest_thermostat::client::NestClient;
//! use nest_thermostat::transport::UreqTransport;
//!
//! let mut nest = NestClient::new(UreqTransport::default(), "me@example.com", "secret");
//! let target = nest.connect(None)?;
//! println!("{} is at {:.1}{}", target.device_id, target.temperature, target.temperature_scale);
//! let result = nest.set_target_temperature(68.0)?;
//! assert!(result.is_success());
//! # Ok::<(), nest_thermostat::error::NestClientError>(())
//! ```

pub mod models {
    pub mod nest;
}

pub mod client;
pub mod config;
pub mod env_file;
pub mod error;
pub mod session;
pub mod target;
pub mod transport;
pub mod units;

pub use client::{CommandResult, Endpoints, NestClient};
pub use error::NestClientError;
pub use target::TargetDevice;
pub use units::{TemperatureScale, celsius_to_fahrenheit, fahrenheit_to_celsius};
