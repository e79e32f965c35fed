//! Runtime configuration for the command-line tool.
//! Credentials come from the environment (or a `.env` file loaded first).

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub username: String,
    pub password: String,
    /// Thermostat serial to target when the account has several.
    pub device_id: Option<String>,
    /// Per-request timeout; unset means wait indefinitely.
    pub http_timeout: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let required = |key: &str| match lookup(key) {
            Some(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(format!("Missing {}: set it in the environment or an .env file", key)),
        };
        let username = required("NEST_USERNAME")?;
        let password = required("NEST_PASSWORD")?;

        let device_id = lookup("NEST_DEVICE_ID")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let http_timeout = match lookup("NEST_HTTP_TIMEOUT_SECS") {
            Some(s) if !s.trim().is_empty() => {
                let secs = s
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| "NEST_HTTP_TIMEOUT_SECS must be a whole number of seconds".to_string())?;
                Some(Duration::from_secs(secs))
            }
            _ => None,
        };

        Ok(Config {
            username,
            password,
            device_id,
            http_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn minimal_config() {
        let cfg = Config::from_lookup(lookup_from(&[("NEST_USERNAME", "me"), ("NEST_PASSWORD", "pw")]))
            .expect("config");
        assert_eq!(cfg.username, "me");
        assert_eq!(cfg.password, "pw");
        assert_eq!(cfg.device_id, None);
        assert_eq!(cfg.http_timeout, None);
    }

    #[test]
    fn optional_settings() {
        let cfg = Config::from_lookup(lookup_from(&[
            ("NEST_USERNAME", "me"),
            ("NEST_PASSWORD", "pw"),
            ("NEST_DEVICE_ID", " 01AA02AB031234XY "),
            ("NEST_HTTP_TIMEOUT_SECS", "15"),
        ]))
        .expect("config");
        assert_eq!(cfg.device_id.as_deref(), Some("01AA02AB031234XY"));
        assert_eq!(cfg.http_timeout, Some(Duration::from_secs(15)));
    }

    #[test]
    fn rejects_missing_credentials_and_bad_timeout() {
        let err = Config::from_lookup(lookup_from(&[("NEST_USERNAME", "me")])).expect_err("no password");
        assert!(err.contains("NEST_PASSWORD"));

        let err = Config::from_lookup(lookup_from(&[
            ("NEST_USERNAME", "me"),
            ("NEST_PASSWORD", "pw"),
            ("NEST_HTTP_TIMEOUT_SECS", "soon"),
        ]))
        .expect_err("bad timeout");
        assert!(err.contains("NEST_HTTP_TIMEOUT_SECS"));
    }
}
