//! Session client for the unofficial Nest mobile API.
//!
//! - Blocking and strictly sequential: login, fetch state (with weather),
//!   select a target thermostat, then read or command it.
//! - Every step needs the output of the previous one; the first failure
//!   aborts the chain.
//! - HTTP goes through a [`Transport`], `ureq` by default.

use http::StatusCode;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

use crate::error::{NestClientError, describe_json_error};
use crate::models::nest::{
    CommandBody, DeviceRecord, ForecastData, LoginResponse, StateSnapshot, StructureRecord, UserRecord,
};
use crate::session::Session;
use crate::target::TargetDevice;
use crate::transport::{HttpRequest, RequestBody, Transport, UreqTransport};

const LOGIN_URL: &str = "https://home.nest.com/user/login";
const WEATHER_URL: &str = "https://home.nest.com/api/0.1/weather/forecast/";
const RESOURCE_PATH: &str = "/v2/mobile/user.";
const COMMAND_PATH: &str = "/v2/put/shared.";
const USER_AGENT: &str = "Nest/1.1.0.10 CFNetwork/548.0.4";

/// Where the client sends its requests and how it identifies itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub login_url: String,
    /// The percent-encoded postal code is appended.
    pub weather_url: String,
    /// Appended to the session's transport URL, followed by the user id.
    pub resource_path: String,
    /// Appended to the session's transport URL, followed by the device id.
    pub command_path: String,
    pub user_agent: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            login_url: LOGIN_URL.to_string(),
            weather_url: WEATHER_URL.to_string(),
            resource_path: RESOURCE_PATH.to_string(),
            command_path: COMMAND_PATH.to_string(),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

/// Outcome of a temperature command. The status is reported, not judged.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult {
    pub status: StatusCode,
    pub body: String,
}

impl CommandResult {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

pub struct NestClient<T: Transport = UreqTransport> {
    transport: T,
    endpoints: Endpoints,
    username: String,
    password: String,
    session: Option<Session>,
    state: Option<StateSnapshot>,
    target: Option<TargetDevice>,
}

fn parse_json<D: DeserializeOwned>(body: &str) -> Result<D, String> {
    let de = &mut serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(de).map_err(|e| describe_json_error(&e))
}

impl<T: Transport> NestClient<T> {
    pub fn new(transport: T, username: impl Into<String>, password: impl Into<String>) -> Self {
        NestClient {
            transport,
            endpoints: Endpoints::default(),
            username: username.into(),
            password: password.into(),
            session: None,
            state: None,
            target: None,
        }
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Log in, fetch state and select the target device in one go.
    ///
    /// With no `device_id` the account must hold exactly one thermostat.
    pub fn connect(&mut self, device_id: Option<&str>) -> Result<&TargetDevice, NestClientError> {
        self.login()?;
        self.fetch_state()?;
        self.select_target_device(device_id)
    }

    pub fn login(&mut self) -> Result<&Session, NestClientError> {
        let request = HttpRequest::post(
            self.endpoints.login_url.as_str(),
            RequestBody::Form(vec![
                ("username".to_string(), self.username.clone()),
                ("password".to_string(), self.password.clone()),
            ]),
        )
        .with_headers(&[("user-agent".to_string(), self.endpoints.user_agent.clone())]);

        let response = self.transport.send(request)?;
        let login: LoginResponse = parse_json(&response.body)
            .map_err(|e| NestClientError::Authentication(format!("http {}: {}", response.status, e)))?;

        let session = Session::from_login(login, &self.endpoints.resource_path);
        info!("Logged in to Nest as user {}", session.user_id);
        Ok(self.session.insert(session))
    }

    /// Fetch the account state and attach a weather forecast to every
    /// structure the user owns.
    ///
    /// The stored snapshot is only replaced once every forecast arrived.
    pub fn fetch_state(&mut self) -> Result<&StateSnapshot, NestClientError> {
        let session = self.session.as_ref().ok_or(NestClientError::NotAuthenticated)?;
        let request = HttpRequest::get(session.resource_endpoint.as_str())
            .with_headers(&session.auth_headers(&self.endpoints.user_agent));

        let response = self.transport.send(request)?;
        let raw: StateSnapshot = parse_json(&response.body)
            .map_err(|e| NestClientError::StateFetch(format!("http {}: {}", response.status, e)))?;

        let user = raw
            .user
            .get(&session.user_id)
            .ok_or_else(|| NestClientError::StateFetch(format!("user {} missing from state", session.user_id)))?;

        let mut forecasts = Vec::with_capacity(user.structures.len());
        for structure_ref in &user.structures {
            let structure_id = structure_ref
                .structure_id()
                .ok_or_else(|| NestClientError::StateFetch(format!("malformed structure reference {:?}", structure_ref.0)))?;
            let structure = raw
                .structure
                .get(structure_id)
                .ok_or_else(|| NestClientError::StateFetch(format!("structure {} missing from state", structure_id)))?;
            let postal_code = structure.postal_code.as_deref().ok_or_else(|| NestClientError::IncompleteRecord {
                record: format!("structure {}", structure_id),
                field: "postal_code",
            })?;
            let forecast = self.fetch_weather(postal_code)?;
            forecasts.push((structure_id.to_string(), forecast));
        }

        info!(
            "Fetched state: {} device(s), {} structure(s), {} forecast(s)",
            raw.device.len(),
            raw.structure.len(),
            forecasts.len()
        );
        Ok(self.state.insert(raw.with_weather(forecasts)))
    }

    pub fn fetch_weather(&self, postal_code: &str) -> Result<ForecastData, NestClientError> {
        debug!("Fetching weather forecast for {}", postal_code);
        // postal codes may contain spaces (`SW1A 1AA`)
        let url = format!("{}{}", self.endpoints.weather_url, urlencoding::encode(postal_code));
        let response = self.transport.send(HttpRequest::get(url))?;
        parse_json(&response.body).map_err(|message| NestClientError::WeatherFetch {
            postal_code: postal_code.to_string(),
            message,
        })
    }

    /// Pick the thermostat later reads and commands refer to.
    ///
    /// An explicit `device_id` wins; otherwise the only device on the
    /// account is chosen.
    pub fn select_target_device(&mut self, device_id: Option<&str>) -> Result<&TargetDevice, NestClientError> {
        let state = self.state.as_ref().ok_or(NestClientError::StateNotLoaded)?;
        let device_id = match device_id {
            Some(id) => id,
            None => {
                let mut ids = state.device.keys();
                match (ids.next(), ids.next()) {
                    (Some(only), None) => only.as_str(),
                    _ => {
                        return Err(NestClientError::AmbiguousDevice {
                            count: state.device.len(),
                        });
                    }
                }
            }
        };

        let target = TargetDevice::from_state(state, device_id)?;
        info!(
            "Target device {}: {:.1}{} (target {:.1}{}), humidity {}%",
            target.device_id,
            target.temperature,
            target.temperature_scale,
            target.target_temperature,
            target.temperature_scale,
            target.humidity
        );
        Ok(self.target.insert(target))
    }

    /// Rebuild the cached view of the current target from the latest state.
    /// Without a target yet, this is the default selection.
    pub fn refresh_target_device(&mut self) -> Result<&TargetDevice, NestClientError> {
        let device_id = self.target.as_ref().map(|t| t.device_id.clone());
        self.select_target_device(device_id.as_deref())
    }

    /// Set the target temperature, given in the device's display scale.
    ///
    /// Any HTTP status is returned as `Ok`; check
    /// [`CommandResult::is_success`]. NaN and infinities are refused
    /// before anything is sent.
    pub fn set_target_temperature(&mut self, value: f64) -> Result<CommandResult, NestClientError> {
        if !value.is_finite() {
            return Err(NestClientError::InvalidTemperature(value));
        }
        if self.target.is_none() {
            self.select_target_device(None)?;
        }
        let session = self.session.as_ref().ok_or(NestClientError::NotAuthenticated)?;
        let target = self.target.as_ref().ok_or(NestClientError::StateNotLoaded)?;

        let body = CommandBody {
            target_change_pending: true,
            target_temperature: target.temperature_scale.display_to_celsius(value),
        };
        let payload =
            serde_json::to_value(&body).map_err(|e| NestClientError::Transport(format!("encode command: {}", e)))?;
        let url = format!("{}{}{}", session.transport_url, self.endpoints.command_path, target.device_id);
        let request = HttpRequest::post(url, RequestBody::Json(payload))
            .with_headers(&session.auth_headers(&self.endpoints.user_agent));

        let response = self.transport.send(request)?;
        let result = CommandResult {
            status: response.status,
            body: response.body,
        };
        if result.is_success() {
            info!(
                "Set target temperature of {} to {}{} ({:.2}°C)",
                target.device_id, value, target.temperature_scale, body.target_temperature
            );
        } else {
            warn!(
                "Target temperature command for {} answered with http {}",
                target.device_id, result.status
            );
        }
        Ok(result)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn state(&self) -> Option<&StateSnapshot> {
        self.state.as_ref()
    }

    pub fn target_device(&self) -> Option<&TargetDevice> {
        self.target.as_ref()
    }

    pub fn devices(&self) -> Option<&BTreeMap<String, DeviceRecord>> {
        self.state.as_ref().map(|s| &s.device)
    }

    pub fn structures(&self) -> Option<&BTreeMap<String, StructureRecord>> {
        self.state.as_ref().map(|s| &s.structure)
    }

    pub fn schedule(&self) -> Option<&BTreeMap<String, serde_json::Value>> {
        self.state.as_ref().map(|s| &s.schedule)
    }

    /// The logged-in user's record from the current state.
    pub fn user(&self) -> Option<&UserRecord> {
        let session = self.session.as_ref()?;
        self.state.as_ref()?.user.get(&session.user_id)
    }
}
