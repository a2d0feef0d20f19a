//! Configuration management for posturescope.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default config directory name.
const CONFIG_DIR_NAME: &str = "posturescope";

/// Default measurement server base URL.
const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `POSTURESCOPE_`)
/// 2. TOML config file at `~/.config/posturescope/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Measurement server configuration.
    pub server: ServerConfig,
    /// Realtime connection configuration.
    pub connection: ConnectionConfig,
    /// History buffer configuration.
    pub history: HistoryConfig,
    /// Capture workflow configuration.
    pub capture: CaptureConfig,
}

/// Measurement server endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the measurement server's REST endpoints.
    pub base_url: String,
    /// Path of the realtime measurement socket on the server.
    pub socket_path: String,
}

/// Realtime connection behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Maximum number of connection attempts before giving up.
    pub max_attempts: u32,
    /// Delay before the first reconnection attempt, in milliseconds.
    pub reconnect_delay_ms: u64,
    /// Ceiling on the reconnection delay, in milliseconds.
    pub reconnect_delay_max_ms: u64,
    /// Timeout for a single connect attempt, in seconds.
    pub connect_timeout_secs: u64,
}

/// History buffer sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of measurements retained in memory.
    pub capacity: usize,
}

/// Capture workflow behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Countdown length before a snapshot is taken, in seconds.
    pub countdown_secs: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVER_URL.to_string(),
            socket_path: "/socket".to_string(),
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            reconnect_delay_ms: 1000,
            reconnect_delay_max_ms: 5000,
            connect_timeout_secs: 20,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self { countdown_secs: 5 }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `POSTURESCOPE_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed("POSTURESCOPE_").split("_"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        self.base_url()?;

        if self.history.capacity == 0 {
            return Err(Error::ConfigValidation {
                message: "history capacity must be greater than 0".to_string(),
            });
        }

        if self.connection.max_attempts == 0 {
            return Err(Error::ConfigValidation {
                message: "max_attempts must be greater than 0".to_string(),
            });
        }

        if self.connection.reconnect_delay_ms > self.connection.reconnect_delay_max_ms {
            return Err(Error::ConfigValidation {
                message: format!(
                    "reconnect_delay_ms ({}) cannot be greater than reconnect_delay_max_ms ({})",
                    self.connection.reconnect_delay_ms, self.connection.reconnect_delay_max_ms
                ),
            });
        }

        if self.capture.countdown_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "countdown_secs must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Parse the configured base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not a valid absolute URL.
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.server.base_url).map_err(|e| Error::InvalidUrl {
            url: self.server.base_url.clone(),
            message: e.to_string(),
        })
    }

    /// Build the realtime socket URL from the base URL and socket path.
    ///
    /// The `http`/`https` scheme of the base URL is rewritten to `ws`/`wss`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the scheme cannot be
    /// rewritten.
    pub fn socket_url(&self) -> Result<Url> {
        let mut url = self.base_url()?;
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(Error::InvalidUrl {
                    url: self.server.base_url.clone(),
                    message: format!("unsupported scheme '{other}'"),
                })
            }
        };
        url.set_scheme(scheme).map_err(|()| Error::InvalidUrl {
            url: self.server.base_url.clone(),
            message: "scheme rewrite failed".to_string(),
        })?;
        url.set_path(&self.server.socket_path);
        Ok(url)
    }

    /// Get the connect timeout as a Duration.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connection.connect_timeout_secs)
    }

    /// Get the initial reconnect delay as a Duration.
    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.connection.reconnect_delay_ms)
    }

    /// Get the reconnect delay ceiling as a Duration.
    #[must_use]
    pub fn reconnect_delay_max(&self) -> Duration {
        Duration::from_millis(self.connection.reconnect_delay_max_ms)
    }
}
