//! Configuration for sensord and sensorctl.
//!
//! Loads settings from /etc/sensorboard/config.toml or uses defaults.

use crate::error::{Result, SensorError};
use crate::pool::DEFAULT_POOL_WIDTH;
use crate::probe::DEFAULT_PROBE_TIMEOUT_SECS;
use crate::session::{DEFAULT_COOKIE_NAME, DEFAULT_TTL_DAYS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/sensorboard/config.toml";

/// Fallback config file path
pub const DEFAULT_CONFIG_PATH: &str = "/var/lib/sensorboard/config.toml";

/// Spreadsheet sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// CSV export of the sensor sheet (URL or local path)
    #[serde(default)]
    pub sensor_table_url: String,

    /// CSV export of the member sheet (URL or local path)
    #[serde(default)]
    pub user_db_url: String,

    /// Sign-up form shown to people without an account
    #[serde(default)]
    pub register_url: String,

    /// How long a loaded sensor table is reused before reloading
    #[serde(default = "default_table_cache")]
    pub table_cache_secs: u64,

    /// Timeout for fetching a sheet export
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

fn default_table_cache() -> u64 {
    60
}

fn default_fetch_timeout() -> u64 {
    10
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            sensor_table_url: String::new(),
            user_db_url: String::new(),
            register_url: String::new(),
            table_cache_secs: default_table_cache(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

/// Probe cycle settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Per-URL timeout in seconds
    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: u64,

    /// Simultaneous in-flight requests
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Column holding each sensor's API URL
    #[serde(default = "default_url_column")]
    pub url_column: String,

    /// Column the probe status is written to
    #[serde(default = "default_status_column")]
    pub status_column: String,

    /// Categorical columns offered as filters besides status
    #[serde(default = "default_filter_columns")]
    pub filter_columns: Vec<String>,
}

fn default_probe_timeout() -> u64 {
    DEFAULT_PROBE_TIMEOUT_SECS
}

fn default_workers() -> usize {
    DEFAULT_POOL_WIDTH
}

fn default_url_column() -> String {
    "apiUrl".to_string()
}

fn default_status_column() -> String {
    "getStatusAPI".to_string()
}

fn default_filter_columns() -> Vec<String> {
    vec!["Floor".to_string()]
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_probe_timeout(),
            workers: default_workers(),
            url_column: default_url_column(),
            status_column: default_status_column(),
            filter_columns: default_filter_columns(),
        }
    }
}

impl ProbeConfig {
    /// Status column first, then the categorical filters
    pub fn filterable_columns(&self) -> Vec<String> {
        let mut columns = vec![self.status_column.clone()];
        for c in &self.filter_columns {
            if !columns.contains(c) {
                columns.push(c.clone());
            }
        }
        columns
    }
}

/// Login cookie settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    #[serde(default = "default_ttl_days")]
    pub ttl_days: i64,
}

fn default_cookie_name() -> String {
    DEFAULT_COOKIE_NAME.to_string()
}

fn default_ttl_days() -> i64 {
    DEFAULT_TTL_DAYS
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            ttl_days: default_ttl_days(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8501".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: default_bind_addr() }
    }
}

/// Full configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load config from the system paths, or return defaults
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_PATH)
            .or_else(|_| Self::load_from_path(DEFAULT_CONFIG_PATH))
            .unwrap_or_else(|e| {
                warn!("Config not found, using defaults: {}", e);
                Config::default()
            })
    }

    /// Load config from a specific path
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.probe.timeout_secs == 0 {
            return Err(SensorError::Config("probe.timeout_secs must be > 0".to_string()));
        }
        if self.probe.workers == 0 {
            return Err(SensorError::Config("probe.workers must be > 0".to_string()));
        }
        if self.probe.url_column.trim().is_empty() || self.probe.status_column.trim().is_empty() {
            return Err(SensorError::Config(
                "probe.url_column and probe.status_column must be set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.probe.timeout_secs, 3);
        assert_eq!(config.probe.workers, 20);
        assert_eq!(config.probe.url_column, "apiUrl");
        assert_eq!(config.sources.table_cache_secs, 60);
        assert_eq!(config.session.cookie_name, "sensor_user");
        assert_eq!(config.session.ttl_days, 7);
        assert_eq!(
            config.probe.filterable_columns(),
            vec!["getStatusAPI".to_string(), "Floor".to_string()]
        );
    }

    #[test]
    fn test_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [sources]
            sensor_table_url = "https://docs.example.com/pub?output=csv"

            [probe]
            workers = 8
            filter_columns = ["Floor", "Zone"]
            "#,
        )
        .unwrap();

        assert_eq!(config.probe.workers, 8);
        assert_eq!(config.probe.timeout_secs, 3);
        assert_eq!(config.probe.filter_columns, vec!["Floor", "Zone"]);
        assert_eq!(config.server.bind_addr, "127.0.0.1:8501");
    }

    #[test]
    fn test_load_from_path_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[probe]\nworkers = 0\n").unwrap();
        assert!(matches!(Config::load_from_path(&path), Err(SensorError::Config(_))));

        std::fs::write(&path, "[probe]\nworkers = 4\n").unwrap();
        assert_eq!(Config::load_from_path(&path).unwrap().probe.workers, 4);
    }

    #[test]
    fn test_round_trip_default_file() {
        let config = Config::default();
        let parsed: Config = toml::from_str(&config.to_toml()).unwrap();
        assert_eq!(parsed, config);
    }
}
