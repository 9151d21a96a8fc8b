//! Service configuration.
//!
//! Values come from an optional TOML file, then environment variables
//! (after loading `.env`) override them. The result is a single immutable
//! `Config` handed to each component at construction.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_FORECAST_URL: &str = "https://api.weatherbit.io/v2.0/forecast/daily";
pub const DEFAULT_PUSHOVER_URL: &str = "https://api.pushover.net/1/messages.json";
pub const DEFAULT_CONFIG_FILE: &str = "wxalert.toml";

/// One year.
pub const MAX_COOLDOWN_HOURS: i64 = 8760;
pub const MAX_RETRY_BACKOFF_SECS: u64 = 60;

// ---------------------------------------------------------------------------
// Config sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Display name substituted into alert messages.
    pub location_name: String,
    pub forecast: ForecastConfig,
    pub pushover: PushoverConfig,
    pub alerts: AlertConfig,
    pub files: FileConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ForecastConfig {
    pub api_key: String,
    /// Required; there is no sensible default location.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub days: u8,
    pub base_url: String,
    /// Weatherbit unit system ("M", "I", "S"); omitted from the query when unset.
    pub units: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PushoverConfig {
    pub api_token: String,
    pub user_key: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlertConfig {
    pub high_temp_threshold_f: f64,
    pub cooldown_hours: i64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    pub alert_log: PathBuf,
    pub debug_log: PathBuf,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_secs: u64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            latitude: None,
            longitude: None,
            days: 3,
            base_url: DEFAULT_FORECAST_URL.to_string(),
            units: None,
        }
    }
}

impl Default for PushoverConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            user_key: String::new(),
            url: DEFAULT_PUSHOVER_URL.to_string(),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            high_temp_threshold_f: 90.0,
            cooldown_hours: 24,
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            alert_log: PathBuf::from("weather_alert_log.json"),
            debug_log: PathBuf::from("debug_log.txt"),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            max_retries: 2,
            retry_backoff_secs: 2,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Linear backoff before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_secs(self.retry_backoff_secs.saturating_mul(u64::from(attempt)))
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// The config file could not be read.
    Io(String),
    /// The config file is not valid TOML for this schema.
    Toml(String),
    /// One or more values are missing or out of range.
    Invalid(Vec<String>),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Config file error: {}", msg),
            ConfigError::Toml(msg) => write!(f, "Config parse error: {}", msg),
            ConfigError::Invalid(issues) => {
                write!(f, "Invalid configuration: {}", issues.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Parses a TOML document into a `Config`, filling omitted keys with defaults.
/// Does not validate; see `validate`.
pub fn parse_config(text: &str) -> Result<Config, ConfigError> {
    toml::from_str(text).map_err(|e| ConfigError::Toml(e.to_string()))
}

/// Loads configuration for a run.
///
/// Resolution order for the file: `path` if given, else `$WXALERT_CONFIG`,
/// else `wxalert.toml` in the working directory if it exists, else none.
/// Environment variables are applied on top, then the result is validated.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    dotenv::dotenv().ok();

    let explicit = path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os("WXALERT_CONFIG").map(PathBuf::from));

    let mut config = match explicit {
        Some(p) => read_file(&p)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            read_file(Path::new(DEFAULT_CONFIG_FILE))?
        }
        None => Config::default(),
    };

    apply_env(&mut config, |key| std::env::var(key).ok())?;
    validate(&config)?;
    Ok(config)
}

fn read_file(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
    parse_config(&text)
}

/// Overrides `config` with any values found through `lookup`.
///
/// `lookup` is `std::env::var` in production; tests pass a closure over a map.
pub fn apply_env<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut issues = Vec::new();

    if let Some(v) = lookup("WEATHERBIT_API_KEY") {
        config.forecast.api_key = v;
    }
    if let Some(v) = lookup("WXALERT_LATITUDE") {
        match v.trim().parse() {
            Ok(lat) => config.forecast.latitude = Some(lat),
            Err(_) => issues.push("WXALERT_LATITUDE must be a number".to_string()),
        }
    }
    if let Some(v) = lookup("WXALERT_LONGITUDE") {
        match v.trim().parse() {
            Ok(lon) => config.forecast.longitude = Some(lon),
            Err(_) => issues.push("WXALERT_LONGITUDE must be a number".to_string()),
        }
    }
    if let Some(v) = lookup("WXALERT_FORECAST_DAYS") {
        match v.trim().parse() {
            Ok(days) => config.forecast.days = days,
            Err(_) => issues.push("WXALERT_FORECAST_DAYS must be an integer".to_string()),
        }
    }
    if let Some(v) = lookup("WXALERT_LOCATION_NAME") {
        config.location_name = v;
    }
    if let Some(v) = lookup("PUSHOVER_API_TOKEN") {
        config.pushover.api_token = v;
    }
    if let Some(v) = lookup("PUSHOVER_USER_KEY") {
        config.pushover.user_key = v;
    }
    if let Some(v) = lookup("WXALERT_ALERT_LOG") {
        config.files.alert_log = PathBuf::from(v);
    }
    if let Some(v) = lookup("WXALERT_DEBUG_LOG") {
        config.files.debug_log = PathBuf::from(v);
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(issues))
    }
}

/// Checks required keys and value ranges, reporting every problem at once.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let mut issues: Vec<String> = Vec::new();

    if config.location_name.trim().is_empty() {
        issues.push("location_name is required".into());
    }
    if config.forecast.api_key.trim().is_empty() {
        issues.push("forecast.api_key is required".into());
    }
    match config.forecast.latitude {
        None => issues.push("forecast.latitude is required".into()),
        Some(lat) if !(-90.0..=90.0).contains(&lat) => {
            issues.push("forecast.latitude must be within [-90, 90]".into())
        }
        Some(_) => {}
    }
    match config.forecast.longitude {
        None => issues.push("forecast.longitude is required".into()),
        Some(lon) if !(-180.0..=180.0).contains(&lon) => {
            issues.push("forecast.longitude must be within [-180, 180]".into())
        }
        Some(_) => {}
    }
    if !(1..=16).contains(&config.forecast.days) {
        issues.push("forecast.days must be within 1..=16".into());
    }
    if config.pushover.api_token.trim().is_empty() {
        issues.push("pushover.api_token is required".into());
    }
    if config.pushover.user_key.trim().is_empty() {
        issues.push("pushover.user_key is required".into());
    }
    if !(1..=MAX_COOLDOWN_HOURS).contains(&config.alerts.cooldown_hours) {
        issues.push(format!("alerts.cooldown_hours must be within 1..={}", MAX_COOLDOWN_HOURS));
    }
    if !(1..=120).contains(&config.http.timeout_secs) {
        issues.push("http.timeout_secs must be within 1..=120".into());
    }
    if config.http.max_retries > 5 {
        issues.push("http.max_retries must be <= 5".into());
    }
    if config.http.retry_backoff_secs > MAX_RETRY_BACKOFF_SECS {
        issues.push(format!("http.retry_backoff_secs must be <= {}", MAX_RETRY_BACKOFF_SECS));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(issues))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn complete_toml() -> &'static str {
        r#"
            location_name = "Peoria, IL"

            [forecast]
            api_key = "wb-key"
            latitude = 40.69
            longitude = -89.59

            [pushover]
            api_token = "app-token"
            user_key = "user-key"
        "#
    }

    #[test]
    fn test_parse_fills_defaults_for_omitted_keys() {
        let config = parse_config(complete_toml()).expect("valid toml");
        assert_eq!(config.forecast.days, 3);
        assert_eq!(config.forecast.base_url, DEFAULT_FORECAST_URL);
        assert_eq!(config.pushover.url, DEFAULT_PUSHOVER_URL);
        assert_eq!(config.alerts.high_temp_threshold_f, 90.0);
        assert_eq!(config.alerts.cooldown_hours, 24);
        assert_eq!(config.files.alert_log, PathBuf::from("weather_alert_log.json"));
        assert_eq!(config.files.debug_log, PathBuf::from("debug_log.txt"));
        assert_eq!(config.http.timeout_secs, 20);
        assert!(config.forecast.units.is_none());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_parse_rejects_malformed_toml() {
        let err = parse_config("location_name = ").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = parse_config(complete_toml()).unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            ("WEATHERBIT_API_KEY", "env-key"),
            ("WXALERT_LATITUDE", "41.5"),
            ("WXALERT_LOCATION_NAME", "Henry, IL"),
            ("WXALERT_ALERT_LOG", "/var/lib/wxalert/log.json"),
        ]);

        apply_env(&mut config, |k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.forecast.api_key, "env-key");
        assert_eq!(config.forecast.latitude, Some(41.5));
        assert_eq!(config.forecast.longitude, Some(-89.59));
        assert_eq!(config.location_name, "Henry, IL");
        assert_eq!(config.files.alert_log, PathBuf::from("/var/lib/wxalert/log.json"));
    }

    #[test]
    fn test_env_with_non_numeric_latitude_is_rejected() {
        let mut config = Config::default();
        let result = apply_env(&mut config, |k| {
            (k == "WXALERT_LATITUDE").then(|| "north".to_string())
        });
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_reports_every_missing_credential() {
        let err = validate(&Config::default()).unwrap_err();
        let ConfigError::Invalid(issues) = err else {
            panic!("expected Invalid");
        };
        assert!(issues.iter().any(|i| i.contains("location_name")));
        assert!(issues.iter().any(|i| i.contains("forecast.api_key")));
        assert!(issues.iter().any(|i| i.contains("pushover.api_token")));
        assert!(issues.iter().any(|i| i.contains("pushover.user_key")));
    }

    #[test]
    fn test_validate_requires_coordinates() {
        let config = parse_config(
            r#"
                location_name = "Peoria, IL"
                [forecast]
                api_key = "wb-key"
                [pushover]
                api_token = "app-token"
                user_key = "user-key"
            "#,
        )
        .unwrap();
        let ConfigError::Invalid(issues) = validate(&config).unwrap_err() else {
            panic!("expected Invalid");
        };
        assert_eq!(
            issues,
            vec![
                "forecast.latitude is required".to_string(),
                "forecast.longitude is required".to_string(),
            ]
        );
    }

    #[test]
    fn test_env_coordinates_satisfy_requirement() {
        let mut config = parse_config(complete_toml()).unwrap();
        config.forecast.latitude = None;
        config.forecast.longitude = None;
        let env: HashMap<&str, &str> =
            HashMap::from([("WXALERT_LATITUDE", "40.69"), ("WXALERT_LONGITUDE", "-89.59")]);

        apply_env(&mut config, |k| env.get(k).map(|v| v.to_string())).unwrap();

        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_validate_bounds_cooldown_and_backoff() {
        let mut config = parse_config(complete_toml()).unwrap();
        config.alerts.cooldown_hours = MAX_COOLDOWN_HOURS;
        config.http.retry_backoff_secs = MAX_RETRY_BACKOFF_SECS;
        assert!(validate(&config).is_ok());

        config.alerts.cooldown_hours = 9_000_000_000_000_000_000;
        config.http.retry_backoff_secs = MAX_RETRY_BACKOFF_SECS + 1;
        let ConfigError::Invalid(issues) = validate(&config).unwrap_err() else {
            panic!("expected Invalid");
        };
        assert!(issues.iter().any(|i| i.starts_with("alerts.cooldown_hours")));
        assert!(issues.iter().any(|i| i.starts_with("http.retry_backoff_secs")));
    }

    #[test]
    fn test_validate_rejects_out_of_range_coordinates() {
        let mut config = parse_config(complete_toml()).unwrap();
        config.forecast.latitude = Some(95.0);
        config.forecast.longitude = Some(-200.0);
        let ConfigError::Invalid(issues) = validate(&config).unwrap_err() else {
            panic!("expected Invalid");
        };
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn test_backoff_is_linear_in_attempt() {
        let http = HttpConfig::default();
        assert_eq!(http.backoff(1), Duration::from_secs(2));
        assert_eq!(http.backoff(2), Duration::from_secs(4));
    }

    #[test]
    fn test_backoff_saturates_instead_of_overflowing() {
        let http = HttpConfig {
            retry_backoff_secs: u64::MAX,
            ..HttpConfig::default()
        };
        assert_eq!(http.backoff(5), Duration::from_secs(u64::MAX));
    }
}
