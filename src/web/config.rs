use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use strum_macros::Display;
use thiserror::Error;

use crate::bookings::{ApprovalMode, PricingConfig};
use crate::catalog::{SourceConfig, SourceLocation};
use crate::predict::visibility::{ElevationModel, DEFAULT_MAX_RANGE_RADII};
use crate::predict::PassPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid duration for {field}: {source}")]
    Duration {
        field: &'static str,
        source: humantime::DurationError,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub prediction: PredictionConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub approval: ApprovalConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub api_keys: Vec<ApiKey>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub sources: Vec<SourceConfig>,
    /// humantime string, e.g. "30m"
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: String,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: String,
    /// Cap on satellites shown by listings; passes are still predicted for all.
    #[serde(default)]
    pub max_display: Option<usize>,
}

fn default_refresh_interval() -> String {
    "30m".to_string()
}

fn default_fetch_timeout() -> String {
    "30s".to_string()
}

impl CatalogConfig {
    pub fn refresh_interval(&self) -> Result<Duration, ConfigError> {
        parse_duration("catalog.refresh_interval", &self.refresh_interval)
    }

    pub fn fetch_timeout(&self) -> Result<Duration, ConfigError> {
        parse_duration("catalog.fetch_timeout", &self.fetch_timeout)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictionConfig {
    #[serde(default = "default_step")]
    pub step: String,
    #[serde(default = "default_min_pass_duration")]
    pub min_pass_duration: String,
    #[serde(default = "default_min_elevation")]
    pub min_elevation_deg: f64,
    #[serde(default = "default_max_range")]
    pub max_range_radii: f64,
    #[serde(default)]
    pub elevation_model: ElevationModel,
    /// Longest horizon a single request may ask for.
    #[serde(default = "default_max_horizon")]
    pub max_horizon_hours: f64,
}

fn default_step() -> String {
    "60s".to_string()
}

fn default_min_pass_duration() -> String {
    "30s".to_string()
}

fn default_min_elevation() -> f64 {
    crate::predict::DEFAULT_MIN_ELEVATION_DEG
}

fn default_max_range() -> f64 {
    DEFAULT_MAX_RANGE_RADII
}

fn default_max_horizon() -> f64 {
    crate::predict::DEFAULT_MAX_HORIZON_HOURS
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            step: default_step(),
            min_pass_duration: default_min_pass_duration(),
            min_elevation_deg: default_min_elevation(),
            max_range_radii: default_max_range(),
            elevation_model: ElevationModel::default(),
            max_horizon_hours: default_max_horizon(),
        }
    }
}

impl PredictionConfig {
    pub fn policy(&self) -> Result<PassPolicy, ConfigError> {
        let step = parse_duration("prediction.step", &self.step)?;
        let min_pass_duration =
            parse_duration("prediction.min_pass_duration", &self.min_pass_duration)?;
        let step = chrono::Duration::from_std(step)
            .map_err(|e| ConfigError::Invalid(format!("prediction.step: {}", e)))?;
        let min_pass_duration = chrono::Duration::from_std(min_pass_duration)
            .map_err(|e| ConfigError::Invalid(format!("prediction.min_pass_duration: {}", e)))?;
        if self.max_horizon_hours.is_nan() || self.max_horizon_hours <= 0.0 {
            return Err(ConfigError::Invalid(
                "prediction.max_horizon_hours must be positive".into(),
            ));
        }

        Ok(PassPolicy {
            step,
            min_pass_duration,
            min_elevation_deg: self.min_elevation_deg,
            max_range_radii: self.max_range_radii,
            model: self.elevation_model,
            max_horizon_hours: self.max_horizon_hours,
            ..PassPolicy::default()
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub data_folder: PathBuf,
}

impl StorageConfig {
    pub fn stations_file(&self) -> PathBuf {
        self.data_folder.join("custom_stations.yaml")
    }

    pub fn bookings_folder(&self) -> PathBuf {
        self.data_folder.join("bookings")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApprovalConfig {
    #[serde(default)]
    pub mode: ApprovalMode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiKey {
    pub key: String,
    pub name: String,
    pub permissions: HashSet<Permission>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Permission {
    ViewPredictions,
    ManageStations,
    SubmitBooking,
    ListBookings,
    ApproveBooking,
}

fn parse_duration(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value.trim())
        .map_err(|source| ConfigError::Duration { field, source })
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses and checks every derived value up front so a bad duration fails at
    /// startup rather than on the first request.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        config.catalog.refresh_interval()?;
        config.catalog.fetch_timeout()?;
        config.prediction.policy()?;
        for source in &config.catalog.sources {
            if let SourceLocation::Url(url) = &source.location {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ConfigError::Invalid(format!(
                        "catalog source {} must be an http(s) URL, got {}",
                        source.category, url
                    )));
                }
            }
        }
        if config.pricing.rate_per_minute < 0.0 {
            return Err(ConfigError::Invalid(
                "pricing.rate_per_minute must not be negative".into(),
            ));
        }
        Ok(config)
    }

    pub fn find_api_key(&self, key: &str) -> Option<&ApiKey> {
        self.api_keys.iter().find(|k| k.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
web:
  bind: 127.0.0.1:9000
catalog:
  refresh_interval: 15m
  max_display: 200
  sources:
    - category: stations
      url: https://celestrak.org/NORAD/elements/gp.php?GROUP=stations&FORMAT=tle
    - category: local
      path: ./tle
      max_count: 50
prediction:
  step: 30s
  min_elevation_deg: 5
  elevation_model: topocentric
  max_horizon_hours: 72
storage:
  data_folder: ./data
approval:
  mode: manual
pricing:
  rate_per_minute: 4.5
api_keys:
  - key: secret
    name: ops
    permissions: [view_predictions, approve_booking]
"#;

    #[test]
    fn parses_full_config() {
        let config = Config::from_str(SAMPLE).unwrap();
        assert_eq!(config.web.bind, "127.0.0.1:9000");
        assert_eq!(
            config.catalog.refresh_interval().unwrap(),
            Duration::from_secs(900)
        );
        assert_eq!(config.catalog.max_display, Some(200));
        assert_eq!(config.catalog.sources.len(), 2);
        assert!(matches!(
            config.catalog.sources[1].location,
            SourceLocation::Path(_)
        ));

        let policy = config.prediction.policy().unwrap();
        assert_eq!(policy.step, chrono::Duration::seconds(30));
        assert_eq!(policy.min_pass_duration, chrono::Duration::seconds(30));
        assert_eq!(policy.min_elevation_deg, 5.0);
        assert_eq!(policy.model, ElevationModel::Topocentric);
        assert_eq!(policy.max_horizon_hours, 72.0);

        assert_eq!(config.approval.mode, ApprovalMode::Manual);
        assert_eq!(config.pricing.rate_per_minute, 4.5);
        assert_eq!(
            config.storage.stations_file(),
            PathBuf::from("./data/custom_stations.yaml")
        );

        let key = config.find_api_key("secret").unwrap();
        assert!(key.permissions.contains(&Permission::ApproveBooking));
        assert!(config.find_api_key("other").is_none());
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::from_str("catalog:\n  sources: []\nstorage:\n  data_folder: /tmp/x\n")
            .unwrap();
        assert_eq!(config.web.bind, "0.0.0.0:8080");
        assert_eq!(config.approval.mode, ApprovalMode::Auto);
        assert_eq!(config.prediction.policy().unwrap(), PassPolicy::default());
        assert!(config.api_keys.is_empty());
    }

    #[test]
    fn non_http_source_url_is_rejected() {
        let err = Config::from_str(
            "catalog:\n  sources:\n    - category: x\n      url: ftp://example.org/x.tle\nstorage:\n  data_folder: x\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("ftp://")));

        let err = Config::from_str(
            "catalog:\n  sources: []\nprediction:\n  max_horizon_hours: 0\nstorage:\n  data_folder: x\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn bad_duration_is_rejected() {
        let err = Config::from_str(
            "catalog:\n  sources: []\n  refresh_interval: soon\nstorage:\n  data_folder: x\n",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Duration {
                field: "catalog.refresh_interval",
                ..
            }
        ));
    }
}
