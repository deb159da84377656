//! Connector Configuration Settings
//!
//! `AlpacaConfig` is built explicitly with [`AlpacaConfig::new`] or read from
//! the environment with [`AlpacaConfig::from_env`]. The client never reads the
//! environment on its own.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default |
//! |----------|----------|---------|
//! | `ALPACA_API_KEY` | yes | |
//! | `ALPACA_API_SECRET` | yes | |
//! | `ALPACA_BASE_URL` | yes | |
//! | `ALPACA_DATA_URL` | no | `https://data.alpaca.markets` |
//! | `ALPACA_STREAM_URL` | no | `wss://stream.data.alpaca.markets/v2/{feed}` |
//! | `ALPACA_FEED` | no | `iex` |
//! | `ALPACA_TIMEOUT_SECS` | no | `30` |
//! | `ALPACA_MAX_ATTEMPTS` | no | `1` |
//! | `ALPACA_MAX_RECONNECT_ATTEMPTS` | no | `0` (unlimited) |

use std::time::Duration;

use crate::domain::environment::Environment;
use crate::error::ConfigError;

/// Default market data REST endpoint.
pub const DEFAULT_DATA_URL: &str = "https://data.alpaca.markets";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Feed
// =============================================================================

/// Market data feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataFeed {
    /// IEX (Investors Exchange) - free tier.
    #[default]
    Iex,
    /// SIP (Securities Information Processor) - consolidated tape.
    Sip,
}

impl DataFeed {
    /// Parse a feed name, case-insensitively.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_lowercase().as_str() {
            "iex" => Ok(Self::Iex),
            "sip" => Ok(Self::Sip),
            other => Err(ConfigError::InvalidValue {
                key: "ALPACA_FEED".to_string(),
                reason: format!("unknown feed '{other}', expected iex or sip"),
            }),
        }
    }

    /// Feed name as used in query strings and stream URLs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Iex => "iex",
            Self::Sip => "sip",
        }
    }
}

// =============================================================================
// Credentials
// =============================================================================

/// Alpaca API credentials.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl Credentials {
    /// Create credentials, rejecting empty values.
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Result<Self, ConfigError> {
        let api_key = api_key.into();
        let api_secret = api_secret.into();
        if api_key.trim().is_empty() {
            return Err(ConfigError::EmptyValue("api_key".to_string()));
        }
        if api_secret.trim().is_empty() {
            return Err(ConfigError::EmptyValue("api_secret".to_string()));
        }
        Ok(Self {
            api_key,
            api_secret,
        })
    }

    /// Get the API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Get the API secret.
    #[must_use]
    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

// =============================================================================
// Retry / Reconnect
// =============================================================================

/// REST retry policy.
///
/// The default makes a single attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts per request, including the first.
    pub max_attempts: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Retry up to `max_attempts` times with the default backoff curve.
    #[must_use]
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }
}

/// Live stream reconnection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct WebSocketSettings {
    /// Initial reconnection delay.
    pub reconnect_delay_initial: Duration,
    /// Maximum reconnection delay.
    pub reconnect_delay_max: Duration,
    /// Reconnection delay multiplier for exponential backoff.
    pub reconnect_delay_multiplier: f64,
    /// Maximum reconnection attempts before giving up (0 = unlimited).
    pub max_reconnect_attempts: u32,
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self {
            reconnect_delay_initial: Duration::from_millis(500),
            reconnect_delay_max: Duration::from_secs(30),
            reconnect_delay_multiplier: 2.0,
            max_reconnect_attempts: 0,
        }
    }
}

// =============================================================================
// AlpacaConfig
// =============================================================================

/// Complete connector configuration.
#[derive(Debug, Clone)]
pub struct AlpacaConfig {
    /// API credentials.
    pub credentials: Credentials,
    /// Trading API base URL (`https://paper-api.alpaca.markets`, ...).
    pub base_url: String,
    /// Market data REST base URL.
    pub data_url: String,
    /// Stream URL override; derived from the feed when unset.
    pub stream_url: Option<String>,
    /// Market data feed.
    pub feed: DataFeed,
    /// HTTP request timeout.
    pub timeout: Duration,
    /// REST retry policy.
    pub retry: RetryConfig,
    /// Stream reconnection settings.
    pub websocket: WebSocketSettings,
}

impl AlpacaConfig {
    /// Create a configuration with default data URL, feed and policies.
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let credentials = Credentials::new(api_key, api_secret)?;
        let base_url = validate_http_url("base_url", base_url.into())?;
        Ok(Self {
            credentials,
            base_url,
            data_url: DEFAULT_DATA_URL.to_string(),
            stream_url: None,
            feed: DataFeed::default(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryConfig::default(),
            websocket: WebSocketSettings::default(),
        })
    }

    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            let value = lookup(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))?;
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyValue(key.to_string()));
            }
            Ok(value)
        };

        let api_key = required("ALPACA_API_KEY")?;
        let api_secret = required("ALPACA_API_SECRET")?;
        let base_url = required("ALPACA_BASE_URL")?;

        let mut config = Self::new(api_key, api_secret, base_url)?;

        if let Some(data_url) = non_empty(lookup("ALPACA_DATA_URL")) {
            config = config.with_data_url(data_url)?;
        }
        if let Some(stream_url) = non_empty(lookup("ALPACA_STREAM_URL")) {
            config = config.with_stream_url(stream_url);
        }
        if let Some(feed) = non_empty(lookup("ALPACA_FEED")) {
            config.feed = DataFeed::parse(&feed)?;
        }

        config.timeout = parse_duration_secs(lookup("ALPACA_TIMEOUT_SECS"), DEFAULT_TIMEOUT);
        config.retry = RetryConfig::with_attempts(parse_u32(lookup("ALPACA_MAX_ATTEMPTS"), 1));
        config.websocket.max_reconnect_attempts = parse_u32(
            lookup("ALPACA_MAX_RECONNECT_ATTEMPTS"),
            config.websocket.max_reconnect_attempts,
        );

        Ok(config)
    }

    /// Override the market data REST URL.
    pub fn with_data_url(mut self, data_url: impl Into<String>) -> Result<Self, ConfigError> {
        self.data_url = validate_http_url("data_url", data_url.into())?;
        Ok(self)
    }

    /// Override the stream URL.
    #[must_use]
    pub fn with_stream_url(mut self, stream_url: impl Into<String>) -> Self {
        self.stream_url = Some(stream_url.into().trim_end_matches('/').to_string());
        self
    }

    /// Set the market data feed.
    #[must_use]
    pub const fn with_feed(mut self, feed: DataFeed) -> Self {
        self.feed = feed;
        self
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the stream reconnection settings.
    #[must_use]
    pub fn with_websocket(mut self, websocket: WebSocketSettings) -> Self {
        self.websocket = websocket;
        self
    }

    /// Paper or live, from the base URL.
    #[must_use]
    pub fn environment(&self) -> Environment {
        Environment::from_base_url(&self.base_url)
    }

    /// Market data WebSocket URL.
    ///
    /// Market data streams use the production host for both paper and live
    /// accounts; only the feed changes the path.
    #[must_use]
    pub fn stream_url(&self) -> String {
        self.stream_url.clone().unwrap_or_else(|| {
            format!("wss://stream.data.alpaca.markets/v2/{}", self.feed.as_str())
        })
    }
}

/// Prometheus exporter port from `ALPACA_CONNECTOR_METRICS_PORT`, if set.
#[must_use]
pub fn metrics_port_from_env() -> Option<u16> {
    std::env::var("ALPACA_CONNECTOR_METRICS_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|port| *port != 0)
}

fn validate_http_url(key: &str, url: String) -> Result<String, ConfigError> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyValue(key.to_string()));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("expected an http(s) URL, got '{trimmed}'"),
        });
    }
    Ok(trimmed.to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_u32(value: Option<String>, default: u32) -> u32 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn parse_duration_secs(value: Option<String>, default: Duration) -> Duration {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map_or(default, Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("ALPACA_API_KEY", "key123"),
        ("ALPACA_API_SECRET", "secret456"),
        ("ALPACA_BASE_URL", "https://paper-api.alpaca.markets/"),
    ];

    #[test]
    fn from_lookup_with_required_only() {
        let config = AlpacaConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.base_url, "https://paper-api.alpaca.markets");
        assert_eq!(config.data_url, DEFAULT_DATA_URL);
        assert_eq!(config.feed, DataFeed::Iex);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retry.max_attempts, 1);
        assert_eq!(config.environment(), Environment::Paper);
        assert_eq!(
            config.stream_url(),
            "wss://stream.data.alpaca.markets/v2/iex"
        );
    }

    #[test]
    fn missing_secret_is_reported() {
        let err = AlpacaConfig::from_lookup(lookup(&REQUIRED[..1])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingEnvVar("ALPACA_API_SECRET".to_string())
        );
    }

    #[test]
    fn empty_key_is_reported() {
        let err = AlpacaConfig::from_lookup(lookup(&[
            ("ALPACA_API_KEY", " "),
            ("ALPACA_API_SECRET", "s"),
            ("ALPACA_BASE_URL", "https://api.alpaca.markets"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::EmptyValue("ALPACA_API_KEY".to_string()));
    }

    #[test]
    fn optional_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("ALPACA_BASE_URL", "https://api.alpaca.markets"),
            ("ALPACA_DATA_URL", "http://localhost:9000"),
            ("ALPACA_STREAM_URL", "ws://localhost:9001/v2/test"),
            ("ALPACA_FEED", "SIP"),
            ("ALPACA_TIMEOUT_SECS", "5"),
            ("ALPACA_MAX_ATTEMPTS", "3"),
        ]);
        let config = AlpacaConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.environment(), Environment::Live);
        assert_eq!(config.data_url, "http://localhost:9000");
        assert_eq!(config.stream_url(), "ws://localhost:9001/v2/test");
        assert_eq!(config.feed, DataFeed::Sip);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn unknown_feed_is_invalid() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("ALPACA_FEED", "otc"));
        assert!(matches!(
            AlpacaConfig::from_lookup(lookup(&pairs)),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn non_http_base_url_is_invalid() {
        assert!(matches!(
            AlpacaConfig::new("k", "s", "paper-api.alpaca.markets"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn credentials_redacted_debug() {
        let config = AlpacaConfig::new("key123", "secret456", "https://api.alpaca.markets").unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("key123"));
        assert!(!debug.contains("secret456"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn retry_attempts_never_zero() {
        assert_eq!(RetryConfig::with_attempts(0).max_attempts, 1);
    }
}
