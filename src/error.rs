//! Error types for dicecast.

use thiserror::Error;

/// The main error type for dicecast.
#[derive(Error, Debug)]
pub enum Error {
    /// IO errors (file operations, sockets, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP errors from the negotiation endpoint
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket transport errors
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A feed message could not be turned into an outcome
    #[error("Decode error: {0}")]
    Decode(String),

    /// A strategy failed to produce a vote
    #[error("Strategy '{name}' failed: {reason}")]
    Strategy { name: String, reason: String },

    /// Invalid input or state
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Network connectivity errors
    #[error("Network error: {0}")]
    Network(String),
}

/// Alias for Result with our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new strategy error.
    pub fn strategy(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Strategy {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a new invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new network error.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Check if this error is recoverable by reconnecting.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Http(_) | Self::WebSocket(_) | Self::Io(_)
        )
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::Config(format!("invalid URL: {err}"))
    }
}
