//! Configuration loader for the `weather-etl` job.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Nothing else in the crate reads the environment
//! for job settings; the resulting [`Config`] is passed in explicitly.
//!
use std::{env, path::PathBuf};

use crate::EtlError;

pub const DEFAULT_CITY: &str = "New York";
pub const DEFAULT_COUNTRY: &str = "US";
pub const DEFAULT_DB_PATH: &str = "data/weather_data.db";
pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Read an optional variable, treating blank values as unset.
macro_rules! env_or {
    ($lookup:expr, $var_name:expr, $default:expr) => {
        $lookup($var_name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| $default.to_string())
    };
}

/// Read a required variable.
macro_rules! require_env {
    ($lookup:expr, $var_name:expr) => {
        $lookup($var_name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                EtlError::ConfigMissing(format!("{} must be set in .env or environment", $var_name))
            })?
    };
}

/// Strongly typed job configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of a run.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// OpenWeatherMap API key.
    pub api_key: String,

    /// City name sent in the `q` parameter.
    pub city: String,

    /// ISO country code sent in the `q` parameter.
    pub country: String,

    /// Path of the SQLite store file.
    pub db_path: PathBuf,

    /// Provider base URL, without trailing slash.
    pub base_url: String,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `OPENWEATHER_API_KEY` – provider API key
///
/// Optional:
/// - `WEATHER_CITY` – city (default: New York)
/// - `WEATHER_COUNTRY` – country code (default: US)
/// - `WEATHER_DB_PATH` – store path (default: data/weather_data.db)
/// - `OPENWEATHER_BASE_URL` – provider base URL
///
/// Returns [`EtlError::ConfigMissing`] if the API key is missing.
pub fn load_from_env() -> Result<Config, EtlError> {
    load_with(|name| env::var(name).ok())
}

/// Same as [`load_from_env`] but reads variables through `lookup`.
pub fn load_with<F>(lookup: F) -> Result<Config, EtlError>
where
    F: Fn(&str) -> Option<String>,
{
    // ---
    let api_key = require_env!(lookup, "OPENWEATHER_API_KEY");
    let city = env_or!(lookup, "WEATHER_CITY", DEFAULT_CITY);
    let country = env_or!(lookup, "WEATHER_COUNTRY", DEFAULT_COUNTRY);
    let db_path = PathBuf::from(env_or!(lookup, "WEATHER_DB_PATH", DEFAULT_DB_PATH));
    let base_url = env_or!(lookup, "OPENWEATHER_BASE_URL", DEFAULT_BASE_URL)
        .trim_end_matches('/')
        .to_string();

    Ok(Config {
        api_key,
        city,
        country,
        db_path,
        base_url,
    })
}

/// Directory for daily log files (`WEATHER_LOG_DIR`, default `logs`).
///
/// Kept apart from [`Config`] so logging can start before the API key is
/// validated.
pub fn log_dir_from_env() -> PathBuf {
    let lookup = |name: &str| env::var(name).ok();
    PathBuf::from(env_or!(lookup, "WEATHER_LOG_DIR", DEFAULT_LOG_DIR))
}

/// Store path alone (`WEATHER_DB_PATH`), for jobs that never call the provider.
pub fn db_path_from_env() -> PathBuf {
    let lookup = |name: &str| env::var(name).ok();
    PathBuf::from(env_or!(lookup, "WEATHER_DB_PATH", DEFAULT_DB_PATH))
}

impl Config {
    /// Build a config with defaults for everything but the API key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            city: DEFAULT_CITY.to_string(),
            country: DEFAULT_COUNTRY.to_string(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// The `q` query value, e.g. `New York,US`.
    pub fn location_query(&self) -> String {
        format!("{},{}", self.city, self.country)
    }

    /// Log the loaded configuration for debugging purposes.
    ///
    /// The API key is masked down to its last four characters.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  OPENWEATHER_API_KEY  : {}", mask_secret(&self.api_key));
        tracing::info!("  WEATHER_CITY         : {}", self.city);
        tracing::info!("  WEATHER_COUNTRY      : {}", self.country);
        tracing::info!("  WEATHER_DB_PATH      : {}", self.db_path.display());
        tracing::info!("  OPENWEATHER_BASE_URL : {}", self.base_url);
    }
}

pub(crate) fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "****".to_string();
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("****{tail}")
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn missing_api_key_is_config_missing() {
        // ---
        let err = load_with(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, EtlError::ConfigMissing(_)));
        assert!(err.to_string().contains("OPENWEATHER_API_KEY"));
    }

    #[test]
    fn blank_api_key_is_config_missing() {
        // ---
        let err = load_with(lookup_from(&[("OPENWEATHER_API_KEY", "   ")])).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn defaults_apply_when_only_key_is_set() {
        // ---
        let cfg = load_with(lookup_from(&[("OPENWEATHER_API_KEY", "abc123")])).unwrap();

        assert_eq!(cfg.api_key, "abc123");
        assert_eq!(cfg.city, "New York");
        assert_eq!(cfg.country, "US");
        assert_eq!(cfg.db_path, PathBuf::from("data/weather_data.db"));
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.location_query(), "New York,US");
    }

    #[test]
    fn overrides_are_honored() {
        // ---
        let cfg = load_with(lookup_from(&[
            ("OPENWEATHER_API_KEY", "abc123"),
            ("WEATHER_CITY", "Oslo"),
            ("WEATHER_COUNTRY", "NO"),
            ("WEATHER_DB_PATH", "/tmp/w.db"),
            ("OPENWEATHER_BASE_URL", "http://localhost:9000/"),
        ]))
        .unwrap();

        assert_eq!(cfg.location_query(), "Oslo,NO");
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/w.db"));
        // Trailing slash is dropped so endpoint joins stay clean
        assert_eq!(cfg.base_url, "http://localhost:9000");
    }

    #[test]
    fn secrets_are_masked() {
        // ---
        assert_eq!(mask_secret("abcdef123456"), "****3456");
        assert_eq!(mask_secret("abc"), "****");
    }
}
