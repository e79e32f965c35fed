use core::fmt;
use std::error::Error;

#[derive(Debug)]
pub enum NestClientError {
    /// Connection, TLS, timeout or body read failure below the HTTP layer.
    Transport(String),
    /// Login did not yield a usable session.
    Authentication(String),
    /// An operation needing a session was called before `login`.
    NotAuthenticated,
    /// The state endpoint answered with something other than a state snapshot.
    StateFetch(String),
    /// Device selection was attempted before any state was fetched.
    StateNotLoaded,
    WeatherFetch { postal_code: String, message: String },
    /// No explicit device id and the account does not have exactly one device.
    AmbiguousDevice { count: usize },
    UnknownDevice(String),
    InvalidScale(String),
    /// NaN or infinite command value; JSON has no encoding for it.
    InvalidTemperature(f64),
    /// A record the client needs lacks a field, e.g. the target's `current_humidity`.
    IncompleteRecord { record: String, field: &'static str },
}

impl fmt::Display for NestClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NestClientError::Transport(s) => write!(f, "transport error: {}", s),
            NestClientError::Authentication(s) => write!(f, "nest login failed: {}", s),
            NestClientError::NotAuthenticated => write!(f, "not logged in"),
            NestClientError::StateFetch(s) => write!(f, "nest remote service not available: {}", s),
            NestClientError::StateNotLoaded => write!(f, "thermostat state has not been fetched"),
            NestClientError::WeatherFetch { postal_code, message } => {
                write!(f, "weather forecast for {} unavailable: {}", postal_code, message)
            }
            NestClientError::AmbiguousDevice { count } => {
                write!(f, "cannot determine target device ({} devices on account)", count)
            }
            NestClientError::UnknownDevice(id) => write!(f, "device {} not found in state", id),
            NestClientError::InvalidScale(s) => write!(f, "invalid temperature scale {:?}", s),
            NestClientError::InvalidTemperature(v) => write!(f, "invalid target temperature {}", v),
            NestClientError::IncompleteRecord { record, field } => write!(f, "{} has no {}", record, field),
        }
    }
}

impl Error for NestClientError {}

impl From<ureq::Error> for NestClientError {
    fn from(value: ureq::Error) -> Self {
        NestClientError::Transport(value.to_string())
    }
}

/// Render a path-aware JSON error, e.g. `device.01AA.current_humidity: invalid type ...`.
pub(crate) fn describe_json_error(err: &serde_path_to_error::Error<serde_json::Error>) -> String {
    let path = err.path().to_string();
    if path.is_empty() || path == "." {
        err.inner().to_string()
    } else {
        format!("{}: {}", path, err.inner())
    }
}
