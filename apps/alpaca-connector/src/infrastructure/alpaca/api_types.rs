//! Alpaca REST response types.
//!
//! These map directly to the API's JSON and are converted once into domain
//! values. Money fields arrive as decimal strings.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::market_data::{Account, Asset, CalendarDay, MarketClock, Quote, RawBar};
use crate::error::ProviderError;

// ============================================================================
// Trading API
// ============================================================================

/// `GET /v2/account`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountResponse {
    /// Account ID.
    pub id: String,
    /// Account status.
    pub status: String,
    /// Currency.
    #[serde(default)]
    pub currency: String,
    /// Equity (as string).
    pub equity: String,
    /// Cash (as string).
    pub cash: String,
    /// Buying power (as string).
    pub buying_power: String,
    /// Portfolio value (as string).
    #[serde(default)]
    pub portfolio_value: Option<String>,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl AccountResponse {
    /// Convert to the domain account.
    pub fn into_account(self) -> Result<Account, ProviderError> {
        let equity = parse_money("equity", &self.equity)?;
        Ok(Account {
            cash: parse_money("cash", &self.cash)?,
            buying_power: parse_money("buying_power", &self.buying_power)?,
            portfolio_value: self
                .portfolio_value
                .as_deref()
                .map_or(Ok(equity), |v| parse_money("portfolio_value", v))?,
            equity,
            id: self.id,
            status: self.status,
            currency: self.currency,
            created_at: self.created_at,
        })
    }
}

/// `GET /v2/clock`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClockResponse {
    /// Server time.
    pub timestamp: DateTime<Utc>,
    /// Whether the market is open.
    pub is_open: bool,
    /// Next open.
    pub next_open: DateTime<Utc>,
    /// Next close.
    pub next_close: DateTime<Utc>,
}

impl From<ClockResponse> for MarketClock {
    fn from(clock: ClockResponse) -> Self {
        Self {
            timestamp: clock.timestamp,
            is_open: clock.is_open,
            next_open: clock.next_open,
            next_close: clock.next_close,
        }
    }
}

/// Element of `GET /v2/assets`.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetResponse {
    /// Asset ID.
    pub id: String,
    /// Symbol.
    pub symbol: String,
    /// Name (may be null for some listings).
    #[serde(default)]
    pub name: Option<String>,
    /// Exchange.
    #[serde(default)]
    pub exchange: String,
    /// Asset class.
    #[serde(rename = "class", default)]
    pub asset_class: String,
    /// Status.
    #[serde(default)]
    pub status: String,
    /// Tradable flag.
    #[serde(default)]
    pub tradable: bool,
}

impl From<AssetResponse> for Asset {
    fn from(asset: AssetResponse) -> Self {
        Self {
            id: asset.id,
            symbol: asset.symbol,
            name: asset.name.unwrap_or_default(),
            exchange: asset.exchange,
            asset_class: asset.asset_class,
            status: asset.status,
            tradable: asset.tradable,
        }
    }
}

/// Element of `GET /v2/calendar`.
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarResponse {
    /// Session date (`YYYY-MM-DD`).
    pub date: String,
    /// Open time (`HH:MM`).
    pub open: String,
    /// Close time (`HH:MM`).
    pub close: String,
}

impl CalendarResponse {
    /// Convert to a domain calendar day.
    pub fn into_day(self) -> Result<CalendarDay, ProviderError> {
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").map_err(|e| {
            ProviderError::InvalidResponse(format!("calendar date '{}': {e}", self.date))
        })?;
        Ok(CalendarDay {
            date,
            open: parse_session_time(&self.open)?,
            close: parse_session_time(&self.close)?,
        })
    }
}

// ============================================================================
// Market Data API
// ============================================================================

/// `GET /v2/stocks/bars`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BarsResponse {
    /// Bars keyed by symbol (null when nothing matched).
    #[serde(default)]
    pub bars: Option<BTreeMap<String, Vec<BarEntry>>>,
    /// Token for the next page.
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// One bar as returned by the data API. Columns are optional so that missing
/// ones surface as validation failures rather than parse errors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BarEntry {
    /// Start time.
    #[serde(default)]
    pub t: Option<DateTime<Utc>>,
    /// Open.
    #[serde(default)]
    pub o: Option<Decimal>,
    /// High.
    #[serde(default)]
    pub h: Option<Decimal>,
    /// Low.
    #[serde(default)]
    pub l: Option<Decimal>,
    /// Close.
    #[serde(default)]
    pub c: Option<Decimal>,
    /// Volume.
    #[serde(default)]
    pub v: Option<u64>,
    /// Trade count.
    #[serde(default)]
    pub n: Option<u64>,
    /// VWAP.
    #[serde(default)]
    pub vw: Option<Decimal>,
}

impl BarEntry {
    /// Attach the symbol the entry was listed under.
    #[must_use]
    pub fn into_raw(self, symbol: &str) -> RawBar {
        RawBar {
            symbol: symbol.to_string(),
            timestamp: self.t,
            open: self.o,
            high: self.h,
            low: self.l,
            close: self.c,
            volume: self.v,
            trade_count: self.n,
            vwap: self.vw,
        }
    }
}

/// `GET /v2/stocks/{symbol}/quotes/latest`.
#[derive(Debug, Clone, Deserialize)]
pub struct LatestQuoteResponse {
    /// Symbol.
    pub symbol: String,
    /// Quote body.
    pub quote: QuoteEntry,
}

/// Quote body.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteEntry {
    /// Quote time.
    pub t: DateTime<Utc>,
    /// Ask price.
    pub ap: Decimal,
    /// Ask size.
    #[serde(rename = "as", default)]
    pub ask_size: u64,
    /// Bid price.
    pub bp: Decimal,
    /// Bid size.
    #[serde(default)]
    pub bs: u64,
}

impl From<LatestQuoteResponse> for Quote {
    fn from(response: LatestQuoteResponse) -> Self {
        let quote = response.quote;
        Self {
            symbol: response.symbol,
            bid_price: quote.bp,
            bid_size: quote.bs,
            ask_price: quote.ap,
            ask_size: quote.ask_size,
            timestamp: quote.t,
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Error body from the Alpaca API.
#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaErrorResponse {
    /// Error code (numeric on most endpoints).
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    /// Error message.
    pub message: String,
}

impl AlpacaErrorResponse {
    /// Error code as text.
    #[must_use]
    pub fn code_string(&self) -> Option<String> {
        self.code.as_ref().map(|code| match code {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn parse_money(field: &str, value: &str) -> Result<Decimal, ProviderError> {
    Decimal::from_str(value.trim())
        .map_err(|e| ProviderError::InvalidResponse(format!("{field} '{value}': {e}")))
}

fn parse_session_time(value: &str) -> Result<NaiveTime, ProviderError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|e| ProviderError::InvalidResponse(format!("session time '{value}': {e}")))
}
