//! Configuration settings for dicecast.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable prefix for overrides, e.g. `DICECAST__FEED__HUB_NAME`.
pub const ENV_PREFIX: &str = "DICECAST";

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upstream feed configuration.
    pub feed: FeedConfig,
    /// History store configuration.
    pub store: StoreConfig,
    /// Query server configuration.
    pub server: ServerConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location, falling back to defaults.
    pub fn load_or_default() -> Result<Self> {
        Self::load(None)
    }

    /// Load configuration, layering an optional TOML file and `DICECAST__*`
    /// environment variables over the built-in defaults.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = path.unwrap_or_else(|| {
            super::config_dir()
                .map(|p| p.join("config.toml"))
                .unwrap_or_else(|_| PathBuf::from("config.toml"))
        });

        let config: Self = config::Config::builder()
            .add_source(
                config::File::from(config_path.as_path())
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML, e.g. to write a starter file.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.feed.validate()?;
        self.store.validate()?;
        Ok(())
    }
}

/// Upstream feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// SignalR base URL, e.g. `https://host/signalr`.
    pub base_url: String,
    /// WebSocket base URL. Derived from `base_url` when unset.
    pub ws_url: Option<String>,
    /// Hub to subscribe to.
    pub hub_name: String,
    /// SignalR client protocol version.
    pub client_protocol: String,
    /// Transport name passed to the connect endpoint.
    pub transport: String,
    /// Transport id parameter.
    pub tid: u32,
    /// Keepalive ping interval in seconds.
    pub keepalive_secs: u64,
    /// Negotiation request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Reconnect backoff.
    pub backoff: BackoffConfig,
}

impl FeedConfig {
    /// Keepalive interval as a duration.
    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }

    /// Negotiation timeout as a duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// WebSocket base URL, explicit or derived by swapping the HTTP scheme.
    pub fn websocket_base(&self) -> String {
        if let Some(url) = &self.ws_url {
            return url.clone();
        }
        if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        }
    }

    fn validate(&self) -> Result<()> {
        if self.hub_name.trim().is_empty() {
            return Err(Error::config("feed.hub_name must not be empty"));
        }
        if self.keepalive_secs == 0 {
            return Err(Error::config("feed.keepalive_secs must be positive"));
        }
        self.backoff.validate()
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://taixiu1.gsum01.com/signalr".to_string(),
            ws_url: None,
            hub_name: "luckydice1Hub".to_string(),
            client_protocol: "1.5".to_string(),
            transport: "webSockets".to_string(),
            tid: 5,
            keepalive_secs: 30,
            request_timeout_secs: 10,
            backoff: BackoffConfig::default(),
        }
    }
}

/// Reconnect backoff configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// First retry delay in milliseconds.
    pub initial_ms: u64,
    /// Upper bound for any retry delay in milliseconds.
    pub max_ms: u64,
    /// Growth factor between consecutive failures.
    pub multiplier: f64,
    /// Randomize the upper half of each delay.
    pub jitter: bool,
}

impl BackoffConfig {
    fn validate(&self) -> Result<()> {
        if self.initial_ms == 0 {
            return Err(Error::config("feed.backoff.initial_ms must be positive"));
        }
        if self.max_ms < self.initial_ms {
            return Err(Error::config(
                "feed.backoff.max_ms must not be below initial_ms",
            ));
        }
        if self.multiplier.is_nan() || self.multiplier < 1.0 {
            return Err(Error::config("feed.backoff.multiplier must be >= 1.0"));
        }
        Ok(())
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_ms: 5_000,
            max_ms: 60_000,
            multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Largest accepted `store.capacity`.
pub const MAX_CAPACITY: usize = 10_000;

/// History store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum number of rounds retained.
    pub capacity: usize,
    /// Number of trailing rounds published with each snapshot.
    pub window_size: usize,
}

impl StoreConfig {
    fn validate(&self) -> Result<()> {
        if self.capacity == 0 || self.capacity > MAX_CAPACITY {
            return Err(Error::config(format!(
                "store.capacity must be between 1 and {MAX_CAPACITY}"
            )));
        }
        if self.window_size == 0 || self.window_size > self.capacity {
            return Err(Error::config(format!(
                "store.window_size must be between 1 and capacity ({})",
                self.capacity
            )));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            window_size: 20,
        }
    }
}

/// Query server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP query surface binds to.
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    pub filter: String,
    /// Also write a daily-rolling log file under the data directory.
    pub file_logging: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "dicecast=info".to_string(),
            file_logging: false,
        }
    }
}
