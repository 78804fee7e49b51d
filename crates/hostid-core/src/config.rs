//! Configuration for identifier persistence and its retry policy

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Default identity file name inside the data directory
pub const DEFAULT_FILE_NAME: &str = "host_uuid";

/// Default number of read-or-create attempts before giving up on contention
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default sleep between attempts that lost the lock race
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 10;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Value out of range or malformed
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Identity file location and retry tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostIdConfig {
    /// Identity file name, joined onto the data directory
    pub file_name: String,
    /// Attempts before reporting `LimitExceeded`; values below 1 act as 1
    pub max_attempts: u32,
    /// Sleep between attempts that found the lock busy, in milliseconds
    pub retry_backoff_ms: u64,
}

impl Default for HostIdConfig {
    fn default() -> Self {
        Self {
            file_name: DEFAULT_FILE_NAME.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
        }
    }
}

impl HostIdConfig {
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&content)
    }

    /// The file name must name a single entry inside the data directory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.file_name.is_empty() {
            return Err(ConfigError::Invalid("file_name must not be empty".to_string()));
        }
        if self.file_name.contains(['/', '\\']) || self.file_name == "." || self.file_name == ".."
        {
            return Err(ConfigError::Invalid(format!(
                "file_name must be a plain file name, got {:?}",
                self.file_name
            )));
        }
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(name) = std::env::var("HOSTID_FILE_NAME") {
            if !name.is_empty() {
                self.file_name = name;
            }
        }
        if let Some(n) = parse_env::<u32>("HOSTID_MAX_ATTEMPTS") {
            self.max_attempts = n;
        }
        if let Some(ms) = parse_env::<u64>("HOSTID_RETRY_BACKOFF_MS") {
            self.retry_backoff_ms = ms;
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    let value = std::env::var(key).ok()?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("Ignoring unparseable {key}={value:?}");
            None
        }
    }
}

/// Command-line overrides for configuration
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    /// Path to a TOML config file
    pub config_path: Option<PathBuf>,
    pub file_name: Option<String>,
    pub max_attempts: Option<u32>,
    pub retry_backoff_ms: Option<u64>,
}

/// Resolve configuration from all sources
///
/// Priority (highest to lowest):
/// 1. Command-line overrides
/// 2. Environment variables (`HOSTID_FILE_NAME`, `HOSTID_MAX_ATTEMPTS`,
///    `HOSTID_RETRY_BACKOFF_MS`)
/// 3. Config file, if one was given
/// 4. Defaults
pub fn resolve_config(overrides: &ConfigOverrides) -> Result<HostIdConfig, ConfigError> {
    let mut config = match &overrides.config_path {
        Some(path) => HostIdConfig::load(path)?,
        None => HostIdConfig::default(),
    };

    config.apply_env();

    if let Some(name) = &overrides.file_name {
        config.file_name = name.clone();
    }
    if let Some(n) = overrides.max_attempts {
        config.max_attempts = n;
    }
    if let Some(ms) = overrides.retry_backoff_ms {
        config.retry_backoff_ms = ms;
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::TempDir;

    fn clear_env() {
        unsafe {
            env::remove_var("HOSTID_FILE_NAME");
            env::remove_var("HOSTID_MAX_ATTEMPTS");
            env::remove_var("HOSTID_RETRY_BACKOFF_MS");
        }
    }

    #[test]
    fn test_defaults() {
        let config = HostIdConfig::default();
        assert_eq!(config.file_name, "host_uuid");
        assert_eq!(config.attempts(), 3);
        assert_eq!(config.retry_backoff(), Duration::from_millis(10));
    }

    #[test]
    fn test_attempts_clamped_to_one() {
        let config = HostIdConfig {
            max_attempts: 0,
            ..HostIdConfig::default()
        };
        assert_eq!(config.attempts(), 1);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = HostIdConfig::from_toml_str("max_attempts = 7\n").unwrap();
        assert_eq!(config.max_attempts, 7);
        assert_eq!(config.file_name, DEFAULT_FILE_NAME);
        assert_eq!(config.retry_backoff_ms, DEFAULT_RETRY_BACKOFF_MS);
    }

    #[test]
    fn test_invalid_file_name_rejected() {
        let err = HostIdConfig::from_toml_str("file_name = \"../escape\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = HostIdConfig::from_toml_str("file_name = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let err = HostIdConfig::from_toml_str("max_attempts = \"three\"").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }

    #[test]
    #[serial]
    fn test_resolve_priority() {
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hostid.toml");
        std::fs::write(
            &path,
            "file_name = \"node_id\"\nmax_attempts = 5\nretry_backoff_ms = 50\n",
        )
        .unwrap();

        unsafe {
            env::set_var("HOSTID_MAX_ATTEMPTS", "9");
        }

        let overrides = ConfigOverrides {
            config_path: Some(path),
            retry_backoff_ms: Some(1),
            ..ConfigOverrides::default()
        };
        let config = resolve_config(&overrides).unwrap();
        clear_env();

        assert_eq!(config.file_name, "node_id");
        assert_eq!(config.max_attempts, 9);
        assert_eq!(config.retry_backoff_ms, 1);
    }

    #[test]
    #[serial]
    fn test_unparseable_env_ignored() {
        clear_env();
        unsafe {
            env::set_var("HOSTID_RETRY_BACKOFF_MS", "soon");
        }

        let config = resolve_config(&ConfigOverrides::default()).unwrap();
        clear_env();

        assert_eq!(config.retry_backoff_ms, DEFAULT_RETRY_BACKOFF_MS);
    }

    #[test]
    #[serial]
    fn test_missing_config_file() {
        clear_env();
        let overrides = ConfigOverrides {
            config_path: Some(PathBuf::from("/nonexistent/hostid.toml")),
            ..ConfigOverrides::default()
        };
        let err = resolve_config(&overrides).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
