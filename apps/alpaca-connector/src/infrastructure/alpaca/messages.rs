//! Market Data Stream Message Types
//!
//! Wire format for the subset of the Alpaca stock stream this crate uses:
//! control messages and minute bars.
//!
//! # Control Messages
//! - `success`: connection / authentication acknowledgment
//! - `error`: error with numeric code
//! - `subscription`: active subscription echo
//!
//! # Data Messages
//! - `b`: minute bar
//!
//! Quotes, trades, statuses and the rest are decoded as [`AlpacaMessage::Ignored`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::market_data::{Bar, STREAM_SOURCE, Timeframe};

// =============================================================================
// Control Messages
// =============================================================================

/// Success message.
///
/// ```json
/// {"T": "success", "msg": "connected"}
/// {"T": "success", "msg": "authenticated"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessMessage {
    /// Message type (always "success")
    #[serde(rename = "T")]
    pub msg_type: String,

    /// "connected" or "authenticated"
    pub msg: SuccessKind,
}

/// Kind of success message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuccessKind {
    /// Socket accepted, auth expected next
    Connected,
    /// Credentials accepted
    Authenticated,
}

/// Error message.
///
/// ```json
/// {"T": "error", "code": 402, "msg": "auth failed"}
/// ```
///
/// Codes 401-404 are authentication errors, 405-407 are limits, 408 means the
/// account lacks the subscription for the requested feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// Message type (always "error")
    #[serde(rename = "T")]
    pub msg_type: String,

    /// Error code
    pub code: i32,

    /// Error message
    pub msg: String,
}

impl ErrorMessage {
    /// Check if this is an authentication error.
    #[must_use]
    pub const fn is_auth_error(&self) -> bool {
        matches!(self.code, 401..=404)
    }
}

/// Subscription echo.
///
/// ```json
/// {"T": "subscription", "trades": [], "quotes": [], "bars": ["AAPL"]}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionMessage {
    /// Message type (always "subscription")
    #[serde(rename = "T")]
    pub msg_type: String,

    /// Subscribed bar symbols
    #[serde(default)]
    pub bars: Vec<String>,
}

// =============================================================================
// Bars
// =============================================================================

/// Minute bar.
///
/// ```json
/// {
///   "T": "b", "S": "SPY",
///   "o": 388.985, "h": 389.13, "l": 388.975, "c": 389.12,
///   "v": 49378, "n": 461, "vw": 389.062639,
///   "t": "2021-02-22T19:15:00Z"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockBarMessage {
    /// Message type ("b")
    #[serde(rename = "T")]
    pub msg_type: String,

    /// Ticker symbol
    #[serde(rename = "S")]
    pub symbol: String,

    /// Open price
    #[serde(rename = "o")]
    pub open: Decimal,

    /// High price
    #[serde(rename = "h")]
    pub high: Decimal,

    /// Low price
    #[serde(rename = "l")]
    pub low: Decimal,

    /// Close price
    #[serde(rename = "c")]
    pub close: Decimal,

    /// Volume (shares)
    #[serde(rename = "v", default)]
    pub volume: Option<u64>,

    /// Number of trades
    #[serde(rename = "n", default)]
    pub trade_count: Option<u64>,

    /// VWAP
    #[serde(rename = "vw", default)]
    pub vwap: Option<Decimal>,

    /// Bar start time
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,
}

impl StockBarMessage {
    /// Shape into a streamed output row.
    #[must_use]
    pub fn into_bar(self, received_at: DateTime<Utc>) -> Bar {
        Bar {
            symbol: self.symbol,
            timestamp: self.timestamp,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            timeframe: Timeframe::MINUTE,
            source: STREAM_SOURCE.to_string(),
            fetched_at: received_at,
        }
    }
}

// =============================================================================
// Client Requests
// =============================================================================

/// Authentication request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthRequest {
    /// Action: "auth"
    pub action: &'static str,

    /// API key
    pub key: String,

    /// API secret
    pub secret: String,
}

impl AuthRequest {
    /// Create a new authentication request.
    #[must_use]
    pub const fn new(key: String, secret: String) -> Self {
        Self {
            action: "auth",
            key,
            secret,
        }
    }
}

/// Subscribe / unsubscribe request for minute bars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionRequest {
    /// Action: "subscribe" or "unsubscribe"
    pub action: &'static str,

    /// Bar symbols
    pub bars: Vec<String>,
}

impl SubscriptionRequest {
    /// Subscribe to bars for `symbols`.
    #[must_use]
    pub const fn subscribe_bars(symbols: Vec<String>) -> Self {
        Self {
            action: "subscribe",
            bars: symbols,
        }
    }

    /// Unsubscribe from bars for `symbols`.
    #[must_use]
    pub const fn unsubscribe_bars(symbols: Vec<String>) -> Self {
        Self {
            action: "unsubscribe",
            bars: symbols,
        }
    }
}

// =============================================================================
// Decoded Message
// =============================================================================

/// A decoded stream message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlpacaMessage {
    /// Connection/authentication success
    Success(SuccessMessage),
    /// Error message
    Error(ErrorMessage),
    /// Subscription echo
    Subscription(SubscriptionMessage),
    /// Minute bar
    Bar(StockBarMessage),
    /// Any other message type, by its `T` tag
    Ignored(String),
}
