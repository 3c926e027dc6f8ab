//! Error types for the DDNS system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS system
#[derive(Error, Debug)]
pub enum Error {
    /// The local interface table could not be read
    #[error("Enumeration error: {0}")]
    Enumeration(String),

    /// The reachability capability failed to initialize
    #[error("Probe initialization failed: {0}")]
    ProbeInit(String),

    /// The reachability capability failed to answer
    #[error("Probe error: {0}")]
    Probe(String),

    /// Looking up the current record at the provider failed
    #[error("Record lookup failed: {0}")]
    Lookup(String),

    /// The provider did not report success for a write
    #[error("Publish failed: {0}")]
    Publish(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network-related errors
    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors (from provider APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an enumeration error
    pub fn enumeration(msg: impl Into<String>) -> Self {
        Self::Enumeration(msg.into())
    }

    /// Create a probe initialization error
    pub fn probe_init(msg: impl Into<String>) -> Self {
        Self::ProbeInit(msg.into())
    }

    /// Create a probe error
    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe(msg.into())
    }

    /// Create a lookup error
    pub fn lookup(msg: impl Into<String>) -> Self {
        Self::Lookup(msg.into())
    }

    /// Create a publish failure
    pub fn publish(msg: impl Into<String>) -> Self {
        Self::Publish(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
