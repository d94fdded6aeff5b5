//! Configuration for the echo demo.
//!
//! Every tunable lives in one [`Config`] value that is built once at startup
//! and handed to each unit of work. The defaults are the fixed constants the
//! demo runs with when no file is given; a JSON5 file may override them.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::types::Sentinel;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error reading or writing the config file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON5 parsing error.
    #[error("Parse error: {0}")]
    Parse(#[from] json5::Error),

    /// Config validation error.
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Runtime configuration shared by the coordinator, server and client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Name of the local channel both peers attach to.
    #[serde(default = "default_channel_name")]
    pub channel_name: String,

    /// Maximum concurrent server instances on the channel name.
    #[serde(default = "default_max_server_instances")]
    pub max_server_instances: u32,

    /// How long the client keeps trying to attach, in milliseconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Bounded wait for each unit of work at shutdown, in milliseconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_ms: u64,

    /// Delay between starting the server and starting the client, in milliseconds.
    #[serde(default = "default_warmup_delay")]
    pub warmup_delay_ms: u64,

    /// Message that ends the session (matched case-insensitively).
    #[serde(default = "default_sentinel")]
    pub sentinel: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channel_name: default_channel_name(),
            max_server_instances: default_max_server_instances(),
            connect_timeout_ms: default_connect_timeout(),
            shutdown_timeout_ms: default_shutdown_timeout(),
            warmup_delay_ms: default_warmup_delay(),
            sentinel: default_sentinel(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON5 file.
    ///
    /// Fields missing from the file keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = json5::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a path as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or file write fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] describing the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_name.is_empty() {
            return Err(ConfigError::Validation(
                "Channel name cannot be empty".to_string(),
            ));
        }

        if self
            .channel_name
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '\r' | '\n' | '\0'))
        {
            return Err(ConfigError::Validation(format!(
                "Channel name '{}' contains a path separator or control character",
                self.channel_name.escape_debug()
            )));
        }

        // The service is single-session: one listener, one peer.
        if self.max_server_instances != 1 {
            return Err(ConfigError::Validation(format!(
                "maxServerInstances must be 1, got {}",
                self.max_server_instances
            )));
        }

        for (name, value) in [
            ("connectTimeoutMs", self.connect_timeout_ms),
            ("shutdownTimeoutMs", self.shutdown_timeout_ms),
            ("warmupDelayMs", self.warmup_delay_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Validation(format!("{name} cannot be 0")));
            }
        }

        if self.sentinel.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Sentinel cannot be blank".to_string(),
            ));
        }

        if self.sentinel.contains(['\r', '\n']) {
            return Err(ConfigError::Validation(
                "Sentinel must be a single line".to_string(),
            ));
        }

        Ok(())
    }

    /// The sentinel as a matcher.
    #[must_use]
    pub fn sentinel(&self) -> Sentinel {
        Sentinel::new(self.sentinel.clone())
    }

    /// Client attach deadline.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Per-unit bounded wait at shutdown.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Head start given to the server before the client is started.
    #[must_use]
    pub const fn warmup_delay(&self) -> Duration {
        Duration::from_millis(self.warmup_delay_ms)
    }
}

fn default_channel_name() -> String {
    "NamedPipe".to_string()
}

const fn default_max_server_instances() -> u32 {
    1
}

const fn default_connect_timeout() -> u64 {
    2000
}

const fn default_shutdown_timeout() -> u64 {
    2000
}

const fn default_warmup_delay() -> u64 {
    1000
}

fn default_sentinel() -> String {
    "QUIT".to_string()
}
