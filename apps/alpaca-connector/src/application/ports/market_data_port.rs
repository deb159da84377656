//! Market Data Port (Driven Port)
//!
//! Interface for the request/response half of the Alpaca API.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::domain::market_data::{
    Account, Asset, CalendarDay, DateInput, MarketClock, Quote, QuoteBatch, RawBar, TimeInput,
    Timeframe,
};
use crate::error::ProviderError;

/// Lookback used when a bar request has no start.
const DEFAULT_BAR_LOOKBACK_HOURS: i64 = 24;

/// Order of bars within each symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Oldest first (provider default).
    #[default]
    Asc,
    /// Newest first.
    Desc,
}

impl SortOrder {
    /// Query-string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Historical bar query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarsRequest {
    /// Symbols to fetch.
    pub symbols: Vec<String>,
    /// Aggregation period.
    pub timeframe: Timeframe,
    /// Inclusive start (default: 24 hours before `end`).
    pub start: Option<TimeInput>,
    /// Inclusive end (default: now).
    pub end: Option<TimeInput>,
    /// Maximum number of rows across all symbols.
    pub limit: Option<u32>,
    /// Bar order; unset leaves the provider default (oldest first).
    pub sort: Option<SortOrder>,
}

impl BarsRequest {
    /// Minute bars for `symbols` over the default window.
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
            timeframe: Timeframe::default(),
            start: None,
            end: None,
            limit: None,
            sort: None,
        }
    }

    /// Set the timeframe.
    #[must_use]
    pub const fn with_timeframe(mut self, timeframe: Timeframe) -> Self {
        self.timeframe = timeframe;
        self
    }

    /// Set the start bound.
    #[must_use]
    pub fn with_start(mut self, start: impl Into<TimeInput>) -> Self {
        self.start = Some(start.into());
        self
    }

    /// Set the end bound.
    #[must_use]
    pub fn with_end(mut self, end: impl Into<TimeInput>) -> Self {
        self.end = Some(end.into());
        self
    }

    /// Set the row limit.
    #[must_use]
    pub const fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the bar order. With [`SortOrder::Desc`] and a limit, the most recent
    /// bars of the window are returned.
    #[must_use]
    pub const fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Resolve the bounds against `now`.
    ///
    /// A missing end is `now`; a missing start is `now` minus 24 hours.
    pub fn resolve_window(
        &self,
        now: DateTime<Utc>,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), ProviderError> {
        let end = self.end.as_ref().map_or(Ok(now), TimeInput::resolve)?;
        let start = match &self.start {
            Some(start) => start.resolve()?,
            None => now - Duration::hours(DEFAULT_BAR_LOOKBACK_HOURS),
        };
        Ok((start, end))
    }
}

/// Port for Alpaca REST access.
///
/// Every method makes one logical remote call (bar pagination aside) and
/// returns the error unchanged on failure.
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// Account balances.
    async fn get_account(&self) -> Result<Account, ProviderError>;

    /// Historical bars, grouped by symbol in alphabetical order.
    ///
    /// An empty result is `Ok(vec![])`.
    async fn get_bars(&self, request: &BarsRequest) -> Result<Vec<RawBar>, ProviderError>;

    /// Latest quote per symbol. The first failure aborts the call.
    async fn get_latest_quotes(
        &self,
        symbols: &[String],
    ) -> Result<BTreeMap<String, Quote>, ProviderError>;

    /// Latest quote per symbol, collecting failures instead of aborting.
    async fn get_latest_quotes_partial(&self, symbols: &[String]) -> QuoteBatch;

    /// Market clock.
    async fn get_clock(&self) -> Result<MarketClock, ProviderError>;

    /// Whether the regular session is open right now.
    async fn is_market_open(&self) -> Result<bool, ProviderError> {
        Ok(self.get_clock().await?.is_open)
    }

    /// Listed assets filtered by status and class.
    async fn get_assets(
        &self,
        status: &str,
        asset_class: &str,
    ) -> Result<Vec<Asset>, ProviderError>;

    /// Trading sessions between two dates (both default to today).
    async fn get_calendar(
        &self,
        start: Option<DateInput>,
        end: Option<DateInput>,
    ) -> Result<Vec<CalendarDay>, ProviderError>;
}
