//! Configuration types for Warden

use crate::dispatch::{LogLevel, SignalReceiver, SignalSender, signal_channel};
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration for Warden
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct WardenConfig {
    /// Child supervision configuration
    #[serde(default)]
    pub supervisor: SupervisorConfig,

    /// Signal dispatch configuration
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

/// Child supervision configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SupervisorConfig {
    /// How long a worker may take to acknowledge its init
    #[serde(with = "humantime_serde")]
    pub startup_timeout: Duration,

    /// How long a worker may take to stop before it is aborted
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            startup_timeout: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

/// Signal dispatch configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DispatchConfig {
    /// Upper bound on a synchronous delivery
    #[serde(with = "humantime_serde")]
    pub sync_timeout: Duration,

    /// Buffer size for direct signal channels
    pub channel_capacity: usize,

    /// Sinks that can be described in configuration
    pub sinks: Vec<SinkConfig>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            sync_timeout: Duration::from_secs(5),
            channel_capacity: 256,
            sinks: vec![SinkConfig::Logger {
                level: LogLevel::Debug,
            }],
        }
    }
}

impl DispatchConfig {
    /// Signal channel for a direct sink, sized by `channel_capacity`
    pub fn channel(&self) -> (SignalSender, SignalReceiver) {
        signal_channel(self.channel_capacity)
    }
}

/// A configured sink
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SinkConfig {
    /// Write signals to the tracing subscriber
    Logger {
        /// Level to log at
        #[serde(default)]
        level: LogLevel,
    },
    /// Discard signals
    Noop,
}

impl WardenConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Loads in this order:
    /// 1. Default configuration
    /// 2. Configuration file (warden.toml)
    /// 3. Environment variable overrides (`WARDEN_SUPERVISOR__STARTUP_TIMEOUT=3s`)
    /// 4. File named by `WARDEN_CONFIG_PATH`
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration source is invalid.
    pub fn load() -> Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format, Serialized, Toml},
        };

        let mut figment = Figment::from(Serialized::defaults(WardenConfig::default()))
            .merge(Toml::file("warden.toml"))
            .merge(
                Env::prefixed("WARDEN_")
                    .ignore(&["CONFIG_PATH"])
                    .split("__"),
            );

        if let Ok(path) = std::env::var("WARDEN_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        let config: WardenConfig = figment.extract().map_err(|e| {
            CoreError::Configuration(format!("Failed to load configuration: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path, on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        use figment::{
            Figment,
            providers::{Format, Serialized, Toml},
        };

        let path = path.as_ref();
        if !path.exists() {
            return Err(CoreError::Configuration(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let config: WardenConfig = Figment::from(Serialized::defaults(WardenConfig::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| {
                CoreError::Configuration(format!("Failed to load configuration file: {}", e))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.supervisor.startup_timeout.is_zero() {
            return Err(CoreError::Configuration(
                "supervisor.startup_timeout must be greater than zero".to_string(),
            ));
        }
        if self.supervisor.shutdown_timeout.is_zero() {
            return Err(CoreError::Configuration(
                "supervisor.shutdown_timeout must be greater than zero".to_string(),
            ));
        }
        if self.dispatch.sync_timeout.is_zero() {
            return Err(CoreError::Configuration(
                "dispatch.sync_timeout must be greater than zero".to_string(),
            ));
        }
        if self.dispatch.channel_capacity == 0 {
            return Err(CoreError::Configuration(
                "dispatch.channel_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = WardenConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.supervisor.startup_timeout, Duration::from_secs(10));
        assert_eq!(config.dispatch.channel_capacity, 256);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[supervisor]
startup_timeout = "2s"

[dispatch]
sync_timeout = "250ms"

[[dispatch.sinks]]
kind = "noop"

[[dispatch.sinks]]
kind = "logger"
level = "warn"
"#
        )
        .unwrap();

        let config = WardenConfig::from_file(file.path()).unwrap();
        assert_eq!(config.supervisor.startup_timeout, Duration::from_secs(2));
        // untouched keys keep their defaults
        assert_eq!(config.supervisor.shutdown_timeout, Duration::from_secs(5));
        assert_eq!(config.dispatch.sync_timeout, Duration::from_millis(250));
        assert_eq!(
            config.dispatch.sinks,
            vec![
                SinkConfig::Noop,
                SinkConfig::Logger {
                    level: LogLevel::Warn
                }
            ]
        );
    }

    #[test]
    fn test_missing_file() {
        let err = WardenConfig::from_file("/definitely/not/here/warden.toml").unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)));
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut config = WardenConfig::default();
        config.dispatch.channel_capacity = 0;
        assert!(config.validate().is_err());
    }
}
