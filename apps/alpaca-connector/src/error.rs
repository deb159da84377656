//! Error taxonomy for the connector.
//!
//! | Error | Raised by | Propagation |
//! |-------|-----------|-------------|
//! | [`ProviderError`] | REST client, remote payload mapping | Logged, returned to caller |
//! | [`ValidationError`] | Bar column checks | Logged, `fetch_bars` degrades to empty |
//! | [`ConfigError`] | Configuration construction | Returned to caller |
//! | [`StreamError`] | Live bar subscription | Returned from `subscribe`, logged in worker |

use thiserror::Error;

/// Errors from the remote Alpaca API or from malformed responses.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// HTTP request could not be built.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Network failure while talking to the API.
    #[error("Network error: {0}")]
    Network(String),

    /// API returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code or API error code.
        status: String,
        /// Error message from the API.
        message: String,
    },

    /// Credentials rejected (401/403).
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Rate limited and retries exhausted.
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Suggested retry delay in seconds.
        retry_after_secs: u64,
    },

    /// Resource not found (unknown symbol, endpoint).
    #[error("Not found: {0}")]
    NotFound(String),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonParse(String),

    /// Response parsed but carried an unusable value.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Caller supplied an unparseable argument.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Retry budget exhausted.
    #[error("Max retries exceeded after {attempts} attempts")]
    MaxRetriesExceeded {
        /// Number of attempts made before giving up.
        attempts: u32,
    },
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonParse(err.to_string())
    }
}

/// Bar rows that cannot be shaped into the output table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required column is absent from at least one row.
    #[error("missing required column: {column}")]
    MissingColumn {
        /// Column name.
        column: &'static str,
    },
}

/// Configuration error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Required value is empty.
    #[error("{0} cannot be empty")]
    EmptyValue(String),

    /// Value present but not usable.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// Setting name.
        key: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Errors from the live bar stream.
#[derive(Debug, Error)]
pub enum StreamError {
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    ConnectionFailed(String),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Authentication rejected by the stream.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(#[from] crate::infrastructure::alpaca::auth::AuthError),

    /// Message decoding failed.
    #[error("codec error: {0}")]
    Codec(#[from] crate::infrastructure::alpaca::codec::CodecError),

    /// Nothing to subscribe to.
    #[error("no symbols to subscribe")]
    NoSymbols,

    /// Maximum reconnection attempts exceeded.
    #[error("maximum reconnection attempts exceeded")]
    MaxReconnectAttemptsExceeded,

    /// Connection closed by the server.
    #[error("connection closed")]
    ConnectionClosed,

    /// The stream worker task panicked or was aborted.
    #[error("stream worker failed: {0}")]
    Worker(String),
}
