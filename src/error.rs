//! Error types for the dashboard

use thiserror::Error;

/// Errors from the request/response calls against the pricing API
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network request failed
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Asset id unknown upstream
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// Invalid response body
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl FetchError {
    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(_) | FetchError::RateLimited => true,
            FetchError::Status { status, .. } => matches!(status, 502..=504),
            FetchError::NotFound(_) | FetchError::InvalidResponse(_) => false,
        }
    }
}

/// Errors from the streaming price feed
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// Could not establish the connection
    #[error("Connect failed: {0}")]
    Connect(String),

    /// Server closed the stream
    #[error("Stream closed")]
    Closed,

    /// Transport or framing failure while connected
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Errors from a [`KeyValueStore`](crate::favorites::KeyValueStore) write
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors while loading [`DashboardConfig`](crate::config::DashboardConfig)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

impl ConfigError {
    pub fn invalid(key: &str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.into(),
        }
    }
}
