//! Configuration for the activity sampler.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the session user name on this platform.
#[cfg(target_os = "windows")]
pub const DEFAULT_USER_ENV_VAR: &str = "USERNAME";

/// Environment variable holding the session user name on this platform.
#[cfg(not(target_os = "windows"))]
pub const DEFAULT_USER_ENV_VAR: &str = "USER";

/// Main configuration for the sampler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Collector URL snapshots are posted to
    pub endpoint_url: String,

    /// Cadence of the sampling loop and the first retry delay
    #[serde(with = "duration_serde")]
    pub base_interval: Duration,

    /// Ceiling for the retry delay
    #[serde(with = "duration_serde")]
    pub max_interval: Duration,

    /// Timeout for one upload request
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,

    /// Environment variable naming the session user
    pub user_env_var: String,

    /// Append-only diagnostic log file
    pub log_path: PathBuf,

    /// Path for storing sampler stats
    pub data_path: PathBuf,

    /// Register for start at logon on `run`
    pub autostart: bool,

    /// Whether sampling is currently paused
    pub paused: bool,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("activity-sampler");

        Self {
            endpoint_url: String::new(),
            base_interval: Duration::from_secs(60),
            max_interval: Duration::from_secs(30 * 60),
            request_timeout: Duration::from_secs(10),
            user_env_var: DEFAULT_USER_ENV_VAR.to_string(),
            log_path: data_dir.join("activity-sampler.log"),
            data_path: data_dir,
            autostart: true,
            paused: false,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist. Missing keys take their default values.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("activity-sampler")
            .join("config.json")
    }

    /// Path of the persisted sampler stats.
    pub fn stats_path(&self) -> PathBuf {
        self.data_path.join("activity_stats.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path)?;
        if let Some(parent) = self.log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Check that the sampler can run with this configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = self.endpoint_url.trim();
        if endpoint.is_empty() {
            return Err(ConfigError::Invalid(
                "endpoint_url is not set (use --endpoint or edit the config file)".to_string(),
            ));
        }
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "endpoint_url must be an http(s) URL, got '{endpoint}'"
            )));
        }
        if self.base_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "base_interval must be at least one second".to_string(),
            ));
        }
        if self.max_interval < self.base_interval {
            return Err(ConfigError::Invalid(format!(
                "max_interval ({}s) is shorter than base_interval ({}s)",
                self.max_interval.as_secs(),
                self.base_interval.as_secs()
            )));
        }
        Ok(())
    }

    /// Resolve the session user id from `user_env_var`.
    pub fn resolve_user_id(&self) -> Option<String> {
        std::env::var(&self.user_env_var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Serialize error: {0}")]
    Serialize(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Serde support for Duration.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            endpoint_url: "https://collector.example.com/api/activity".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.base_interval, Duration::from_secs(60));
        assert_eq!(config.max_interval, Duration::from_secs(1800));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.user_env_var, DEFAULT_USER_ENV_VAR);
        assert!(config.autostart);
        assert!(!config.paused);
        assert!(config.endpoint_url.is_empty());
    }

    #[test]
    fn test_validate() {
        assert!(valid().validate().is_ok());

        let missing = Config::default();
        assert!(matches!(missing.validate(), Err(ConfigError::Invalid(_))));

        let ftp = Config {
            endpoint_url: "ftp://example.com".to_string(),
            ..Config::default()
        };
        assert!(ftp.validate().is_err());

        let inverted = Config {
            max_interval: Duration::from_secs(30),
            ..valid()
        };
        assert!(inverted.validate().is_err());

        let zero = Config {
            base_interval: Duration::ZERO,
            ..valid()
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = valid();
        config.paused = true;
        config.base_interval = Duration::from_secs(15);
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.endpoint_url, config.endpoint_url);
        assert_eq!(loaded.base_interval, Duration::from_secs(15));
        assert!(loaded.paused);
    }

    #[test]
    fn test_durations_are_seconds_on_disk() {
        let json = serde_json::to_value(valid()).unwrap();
        assert_eq!(json["base_interval"], 60);
        assert_eq!(json["max_interval"], 1800);
    }

    #[test]
    fn test_missing_file_and_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert!(missing.endpoint_url.is_empty());

        let partial = dir.path().join("partial.json");
        std::fs::write(&partial, r#"{"endpoint_url": "http://10.0.0.5/ingest"}"#).unwrap();
        let loaded = Config::load_from(&partial).unwrap();
        assert_eq!(loaded.endpoint_url, "http://10.0.0.5/ingest");
        assert_eq!(loaded.max_interval, Duration::from_secs(1800));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}
