use log::{error, info, warn};
use nest_thermostat::client::NestClient;
use nest_thermostat::config::Config;
use nest_thermostat::env_file;
use nest_thermostat::transport::UreqTransport;
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Debug)]
struct LoadedEnvFile {
    path: PathBuf,
    explicit: bool,
    applied: usize,
}

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    env_file: Option<PathBuf>,
    /// Target temperature in the device's display scale.
    set_temperature: Option<f64>,
}

fn parse_args(args: impl IntoIterator<Item = OsString>) -> Result<CliArgs, String> {
    let mut parsed = CliArgs::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let arg = arg.into_string().map_err(|_| "argument contains invalid UTF-8".to_string())?;
        let (flag, inline) = match arg.split_once('=') {
            Some((f, v)) if f.starts_with("--") => (f.to_string(), Some(v.to_string())),
            _ => (arg.clone(), None),
        };
        let mut value = |name: &str| -> Result<String, String> {
            let v = match inline.clone() {
                Some(v) => v,
                None => args
                    .next()
                    .and_then(|v| v.into_string().ok())
                    .ok_or_else(|| format!("`{}` requires a value", name))?,
            };
            if v.is_empty() {
                return Err(format!("`{}` requires a value", name));
            }
            Ok(v)
        };

        match flag.as_str() {
            "--env-file" => {
                if parsed.env_file.is_some() {
                    return Err("`--env-file` provided more than once".to_string());
                }
                parsed.env_file = Some(PathBuf::from(value("--env-file")?));
            }
            "--set" => {
                if parsed.set_temperature.is_some() {
                    return Err("`--set` provided more than once".to_string());
                }
                let raw = value("--set")?;
                let temp = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|t| t.is_finite())
                    .ok_or_else(|| format!("`--set` expects a temperature, got {}", raw))?;
                parsed.set_temperature = Some(temp);
            }
            "--" => break,
            other => return Err(format!("unrecognised argument: {}", other)),
        }
    }

    Ok(parsed)
}

fn load_env(explicit: Option<PathBuf>) -> Result<Option<LoadedEnvFile>, String> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(format!("env file not found: {}", path.display()));
        }
        let applied = env_file::load(&path)?;
        return Ok(Some(LoadedEnvFile {
            path,
            explicit: true,
            applied,
        }));
    }

    let cwd = std::env::current_dir().map_err(|e| format!("unable to read current directory: {}", e))?;
    let default_path = cwd.join(".env");
    if default_path.is_file() {
        let applied = env_file::load(&default_path)?;
        Ok(Some(LoadedEnvFile {
            path: default_path,
            explicit: false,
            applied,
        }))
    } else {
        Ok(None)
    }
}

fn run(args: &CliArgs) -> Result<(), String> {
    // 1) Load config
    let cfg = Config::from_env()?;
    info!(
        "Config loaded (device_id={}, http_timeout={})",
        cfg.device_id.as_deref().unwrap_or("-"),
        cfg.http_timeout
            .map(|d| format!("{}s", d.as_secs()))
            .unwrap_or_else(|| "-".to_string())
    );

    // 2) Login, state, target device
    let transport = UreqTransport::new(cfg.http_timeout);
    let mut nest = NestClient::new(transport, cfg.username, cfg.password);
    let target = nest
        .connect(cfg.device_id.as_deref())
        .map_err(|e| format!("Nest initialization failed: {}", e))?;
    info!(
        "Thermostat {}: temperature {:.1}{}, target {:.1}{}, humidity {}%",
        target.device_id,
        target.temperature,
        target.temperature_scale,
        target.target_temperature,
        target.temperature_scale,
        target.humidity
    );

    // 3) Structures
    for (id, structure) in nest.structures().into_iter().flatten() {
        info!(
            "Structure {} ({}), postal code {}, weather {}",
            id,
            structure.name().unwrap_or("unnamed"),
            structure.postal_code.as_deref().unwrap_or("-"),
            if structure.weather.is_some() { "attached" } else { "missing" }
        );
    }

    // 4) Optional command
    if let Some(temp) = args.set_temperature {
        let result = nest
            .set_target_temperature(temp)
            .map_err(|e| format!("Setting target temperature failed: {}", e))?;
        if !result.is_success() {
            return Err(format!("Nest rejected target temperature: http {}: {}", result.status, result.body));
        }
        info!("Target temperature set to {}", temp);
    }

    Ok(())
}

fn main() {
    let args = match parse_args(std::env::args_os().skip(1)) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(2);
        }
    };
    let loaded_env = match load_env(args.env_file.clone()) {
        Ok(info) => info,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    // Init logging after environment so RUST_LOG from .env is respected.
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(info) = loaded_env.as_ref() {
        let origin = if info.explicit { "CLI-specified" } else { "default" };
        info!(
            "Environment loaded from {} .env file: {} ({} variable(s) applied)",
            origin,
            info.path.display(),
            info.applied
        );
        if info.applied == 0 {
            warn!("Every variable in {} was already set in the environment", info.path.display());
        }
    }

    info!(
        "nest-thermostat {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );
    if let Err(e) = run(&args) {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<CliArgs, String> {
        parse_args(list.iter().map(OsString::from))
    }

    #[test]
    fn no_arguments() {
        assert_eq!(args(&[]), Ok(CliArgs::default()));
    }

    #[test]
    fn env_file_and_set_in_both_forms() {
        let parsed = args(&["--env-file", "/tmp/nest.env", "--set=68.5"]).expect("args");
        assert_eq!(parsed.env_file, Some(PathBuf::from("/tmp/nest.env")));
        assert_eq!(parsed.set_temperature, Some(68.5));

        let parsed = args(&["--env-file=.env.test", "--set", "21"]).expect("args");
        assert_eq!(parsed.env_file, Some(PathBuf::from(".env.test")));
        assert_eq!(parsed.set_temperature, Some(21.0));
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(args(&["--env-file"]).is_err());
        assert!(args(&["--env-file="]).is_err());
        assert!(args(&["--env-file", "a", "--env-file", "b"]).is_err());
        assert!(args(&["--set", "warm"]).is_err());
        assert!(args(&["--set", "NaN"]).is_err());
        assert!(args(&["--verbose"]).is_err());
    }

    #[test]
    fn double_dash_stops_parsing() {
        assert_eq!(args(&["--", "--verbose"]), Ok(CliArgs::default()));
    }
}
