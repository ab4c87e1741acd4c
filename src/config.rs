//! Console configuration.
//!
//! Read from a JSON file. The path comes from `WARDEN_CONFIG`; without it,
//! `warden.json` in the working directory is used if it exists, and defaults
//! otherwise. Every field is optional in the file.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::error::ConfigError;

pub const CONFIG_ENV: &str = "WARDEN_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "warden.json";
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 500;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Default,
    HighContrast,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Rows requested per page by every list view.
    pub page_size: u32,
    /// Event poll interval of the UI loop, in milliseconds.
    pub tick_rate_ms: u64,
    pub log_dir: PathBuf,
    pub log_level: String,
    /// JSON fixture the in-memory directory is loaded from and saved to.
    pub directory: Option<PathBuf>,
    /// Simulated round trip of the in-memory directory, in milliseconds.
    pub latency_ms: u64,
    /// Number of directory calls that fail at startup, for trying error paths.
    pub fail_first_n: u32,
    pub theme: Theme,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            tick_rate_ms: 100,
            log_dir: env::temp_dir().join("warden"),
            log_level: "info".to_string(),
            directory: None,
            latency_ms: 120,
            fail_first_n: 0,
            theme: Theme::Default,
        }
    }
}

impl ConsoleConfig {
    /// Loads the configuration from the environment-selected file, if any.
    pub fn load() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(path);
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            return Self::from_file(local);
        }
        Ok(Self::default())
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()
    }

    /// Checks value ranges.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::PageSize {
                value: self.page_size,
                max: MAX_PAGE_SIZE,
            });
        }
        self.level_filter()?;
        Ok(self)
    }

    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| ConfigError::LogLevel(self.log_level.clone()))
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms.max(10))
    }

    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = ConsoleConfig::default();
        assert_eq!(config.page_size, 20);
        assert_eq!(config.theme, Theme::Default);
        assert_eq!(config.level_filter().unwrap(), LevelFilter::INFO);
        assert_eq!(config.tick_rate(), Duration::from_millis(100));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config(r#"{"page_size": 50, "theme": "high_contrast"}"#);
        let config = ConsoleConfig::from_file(file.path()).unwrap();
        assert_eq!(config.page_size, 50);
        assert_eq!(config.theme, Theme::HighContrast);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.directory, None);
        assert_eq!(config.fail_first_n, 0);
    }

    #[test]
    fn test_failure_injection_setting() {
        let file = write_config(r#"{"fail_first_n": 3, "latency_ms": 0}"#);
        let config = ConsoleConfig::from_file(file.path()).unwrap();
        assert_eq!(config.fail_first_n, 3);
        assert!(config.latency().is_zero());
    }

    #[test]
    fn test_rejects_page_size() {
        let file = write_config(r#"{"page_size": 0}"#);
        assert!(matches!(
            ConsoleConfig::from_file(file.path()),
            Err(ConfigError::PageSize { value: 0, .. })
        ));

        let file = write_config(r#"{"page_size": 501}"#);
        assert!(matches!(
            ConsoleConfig::from_file(file.path()),
            Err(ConfigError::PageSize { value: 501, max: 500 })
        ));
    }

    #[test]
    fn test_rejects_log_level() {
        let file = write_config(r#"{"log_level": "loud"}"#);
        assert!(matches!(
            ConsoleConfig::from_file(file.path()),
            Err(ConfigError::LogLevel(level)) if level == "loud"
        ));
    }

    #[test]
    fn test_malformed_file() {
        let file = write_config("{ page_size: ");
        assert!(matches!(
            ConsoleConfig::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ConsoleConfig::from_file(dir.path().join("nope.json")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_tick_rate_floor() {
        let config = ConsoleConfig {
            tick_rate_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.tick_rate(), Duration::from_millis(10));
    }
}
