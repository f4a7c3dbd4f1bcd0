//! Client and service configuration.

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Environment variable overriding [`Config::store_url`].
pub const STORE_URL_ENV: &str = "PINK_SESAME_STORE_URL";

/// Settings shared by the CLI commands.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the room service. Online play is unavailable without it.
    #[serde(default)]
    store_url: Option<String>,

    /// Upper bound for each store request, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    request_timeout_ms: u64,

    /// How often a room is polled for changes, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    poll_interval_ms: u64,

    /// Address the room service binds to.
    #[serde(default = "default_bind_host")]
    bind_host: String,

    /// Port the room service binds to.
    #[serde(default = "default_bind_port")]
    bind_port: u16,
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_bind_host() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    3000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_url: None,
            request_timeout_ms: default_request_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            bind_host: default_bind_host(),
            bind_port: default_bind_port(),
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(store_url = ?config.store_url, "Config loaded successfully");
        Ok(config)
    }

    /// Loads `path` if it exists (defaults otherwise), then applies the
    /// [`STORE_URL_ENV`] override.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = if path.as_ref().exists() {
            Self::from_file(path)?
        } else {
            debug!("Config file not found, using defaults");
            Self::default()
        };

        if let Ok(url) = std::env::var(STORE_URL_ENV)
            && !url.trim().is_empty()
        {
            debug!(%url, "Store URL taken from environment");
            config.store_url = Some(url);
        }
        Ok(config)
    }

    /// Returns a copy with `store_url` replaced when `url` is given.
    pub fn with_store_url(mut self, url: Option<String>) -> Self {
        if url.is_some() {
            self.store_url = url;
        }
        self
    }

    /// [`Config::request_timeout_ms`] as a duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// [`Config::poll_interval_ms`] as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
