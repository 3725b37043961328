//! Configuration for the rate agent.

use crate::core::DEFAULT_WINDOW_SIZE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Number of ticks the rate window spans
    pub window_size: usize,

    /// Tick loop frequency; one ring slot per tick
    pub tick_rate_hz: u32,

    /// How often the run loop reports the current rates
    #[serde(with = "duration_serde")]
    pub report_interval: Duration,

    /// Which input sources to capture
    pub sources: SourceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            tick_rate_hz: 60,
            report_interval: Duration::from_secs(1),
            sources: SourceConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("input-rate-agent")
            .join("config.json")
    }

    /// Apply every override that is set. Returns whether anything changed.
    pub fn apply(&mut self, overrides: &ConfigOverrides) -> bool {
        let before = self.clone();

        if let Some(size) = overrides.window_size {
            self.window_size = size;
        }
        if let Some(rate) = overrides.tick_rate_hz {
            self.tick_rate_hz = rate;
        }
        if let Some(secs) = overrides.report_interval_secs {
            self.report_interval = Duration::from_secs(secs);
        }
        if let Some(sources) = &overrides.sources {
            self.sources = SourceConfig::from_csv(sources);
        }

        *self != before
    }

    /// Time between ticks. A zero rate is treated as 1 Hz.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate_hz.max(1)
    }
}

/// Values given on the command line, layered over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub window_size: Option<usize>,
    pub tick_rate_hz: Option<u32>,
    pub report_interval_secs: Option<u64>,
    /// Comma-separated source list, as accepted by [`SourceConfig::from_csv`]
    pub sources: Option<String>,
}

impl ConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.window_size.is_none()
            && self.tick_rate_hz.is_none()
            && self.report_interval_secs.is_none()
            && self.sources.is_none()
    }
}

/// Configuration for which input sources to capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub keyboard: bool,
    pub pointer: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            keyboard: true,
            pointer: true,
        }
    }
}

impl SourceConfig {
    /// Parse source configuration from a comma-separated string.
    pub fn from_csv(s: &str) -> Self {
        let sources: Vec<String> = s.split(',').map(|s| s.trim().to_lowercase()).collect();

        Self {
            keyboard: sources.iter().any(|s| s == "keyboard" || s == "all"),
            pointer: sources
                .iter()
                .any(|s| s == "pointer" || s == "mouse" || s == "all"),
        }
    }

    /// Check if at least one source is enabled.
    pub fn any_enabled(&self) -> bool {
        self.keyboard || self.pointer
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

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

    #[test]
    fn test_source_config_parsing() {
        let config = SourceConfig::from_csv("keyboard,mouse");
        assert!(config.keyboard);
        assert!(config.pointer);

        let config = SourceConfig::from_csv("keyboard");
        assert!(config.keyboard);
        assert!(!config.pointer);

        let config = SourceConfig::from_csv("all");
        assert!(config.any_enabled());

        assert!(!SourceConfig::from_csv("joystick").any_enabled());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.window_size, DEFAULT_WINDOW_SIZE);
        assert_eq!(config.tick_rate_hz, 60);
        assert!(config.sources.keyboard);
        assert!(config.sources.pointer);
    }

    #[test]
    fn test_tick_interval() {
        let mut config = Config::default();
        config.tick_rate_hz = 50;
        assert_eq!(config.tick_interval(), Duration::from_millis(20));

        config.tick_rate_hz = 0;
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir()
            .join(format!("input-rate-config-{}", std::process::id()))
            .join("config.json");

        let mut config = Config::default();
        config.window_size = 120;
        config.report_interval = Duration::from_secs(5);
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.window_size, 120);
        assert_eq!(loaded.report_interval, Duration::from_secs(5));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_overrides_are_applied_and_persisted() {
        let path = std::env::temp_dir()
            .join(format!("input-rate-overrides-{}", std::process::id()))
            .join("config.json");

        let mut config = Config::default();
        let overrides = ConfigOverrides {
            window_size: Some(60),
            sources: Some("keyboard".to_string()),
            ..Default::default()
        };
        assert!(!overrides.is_empty());
        assert!(config.apply(&overrides));
        assert!(!config.apply(&overrides));
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.window_size, 60);
        assert_eq!(loaded.tick_rate_hz, 60);
        assert!(loaded.sources.keyboard);
        assert!(!loaded.sources.pointer);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_empty_overrides_change_nothing() {
        let mut config = Config::default();
        assert!(ConfigOverrides::default().is_empty());
        assert!(!config.apply(&ConfigOverrides::default()));
        assert_eq!(config.window_size, DEFAULT_WINDOW_SIZE);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("input-rate-agent-does-not-exist.json");
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.window_size, DEFAULT_WINDOW_SIZE);
    }
}
