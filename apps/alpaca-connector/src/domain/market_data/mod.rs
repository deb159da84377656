//! Market data value types.
//!
//! Every remote payload is mapped once into one of these types at the client
//! boundary. None of them outlives the call that produced it.
//!
//! - [`RawBar`]: a provider row, columns optional as delivered
//! - [`Bar`] / [`BarSeries`]: validated output rows (the bar "table")
//! - [`Quote`], [`Asset`], [`CalendarDay`], [`Account`], [`MarketClock`]: snapshots

mod time_input;
mod timeframe;

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub use time_input::{DateInput, TimeInput, parse_date, parse_instant};
pub use timeframe::{Timeframe, TimeframeError, TimeframeUnit};

/// Columns every provider row must carry before it can become a [`Bar`].
pub const REQUIRED_COLUMNS: [&str; 6] = ["symbol", "timestamp", "open", "high", "low", "close"];

/// `source` label for bars fetched over REST.
pub const REST_SOURCE: &str = "alpaca";

/// `source` label for bars received from the live stream.
pub const STREAM_SOURCE: &str = "alpaca_stream";

// =============================================================================
// Bars
// =============================================================================

/// Bar row as returned by the provider, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawBar {
    /// Ticker symbol (empty when the provider omitted it).
    pub symbol: String,
    /// Bar start time.
    pub timestamp: Option<DateTime<Utc>>,
    /// Open price.
    pub open: Option<Decimal>,
    /// High price.
    pub high: Option<Decimal>,
    /// Low price.
    pub low: Option<Decimal>,
    /// Close price.
    pub close: Option<Decimal>,
    /// Volume in shares.
    pub volume: Option<u64>,
    /// Number of trades.
    pub trade_count: Option<u64>,
    /// Volume-weighted average price.
    pub vwap: Option<Decimal>,
}

impl RawBar {
    /// First required column this row lacks, if any.
    #[must_use]
    pub fn missing_column(&self) -> Option<&'static str> {
        if self.symbol.is_empty() {
            Some("symbol")
        } else if self.timestamp.is_none() {
            Some("timestamp")
        } else if self.open.is_none() {
            Some("open")
        } else if self.high.is_none() {
            Some("high")
        } else if self.low.is_none() {
            Some("low")
        } else if self.close.is_none() {
            Some("close")
        } else {
            None
        }
    }

    /// Shape into an output row, tagging timeframe, source and fetch time.
    pub fn into_bar(
        self,
        timeframe: Timeframe,
        source: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<Bar, ValidationError> {
        let missing = |column| ValidationError::MissingColumn { column };
        Ok(Bar {
            timestamp: self.timestamp.ok_or_else(|| missing("timestamp"))?,
            open: self.open.ok_or_else(|| missing("open"))?,
            high: self.high.ok_or_else(|| missing("high"))?,
            low: self.low.ok_or_else(|| missing("low"))?,
            close: self.close.ok_or_else(|| missing("close"))?,
            volume: self.volume,
            symbol: if self.symbol.is_empty() {
                return Err(missing("symbol"));
            } else {
                self.symbol
            },
            timeframe,
            source: source.to_string(),
            fetched_at,
        })
    }
}

/// Check that every row carries every required column.
pub fn validate_columns(rows: &[RawBar]) -> Result<(), ValidationError> {
    for column in REQUIRED_COLUMNS {
        if rows.iter().any(|row| row.missing_column() == Some(column)) {
            return Err(ValidationError::MissingColumn { column });
        }
    }
    Ok(())
}

/// Validated OHLCV row with provenance columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    /// Ticker symbol.
    pub symbol: String,
    /// Bar start time.
    pub timestamp: DateTime<Utc>,
    /// Open price.
    pub open: Decimal,
    /// High price.
    pub high: Decimal,
    /// Low price.
    pub low: Decimal,
    /// Close price.
    pub close: Decimal,
    /// Volume in shares, when reported.
    pub volume: Option<u64>,
    /// Aggregation period label.
    pub timeframe: Timeframe,
    /// Where the row came from (`alpaca` or `alpaca_stream`).
    pub source: String,
    /// When the row was fetched or received.
    pub fetched_at: DateTime<Utc>,
}

/// Ordered bar table. Empty results are `BarSeries::empty()`, never absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BarSeries {
    rows: Vec<Bar>,
}

impl BarSeries {
    /// Table with no rows.
    #[must_use]
    pub const fn empty() -> Self {
        Self { rows: Vec::new() }
    }

    /// Wrap rows in their current order.
    #[must_use]
    pub const fn from_rows(rows: Vec<Bar>) -> Self {
        Self { rows }
    }

    /// Concatenate tables, keeping the order they are given in.
    #[must_use]
    pub fn concat(parts: impl IntoIterator<Item = Self>) -> Self {
        Self {
            rows: parts.into_iter().flat_map(|part| part.rows).collect(),
        }
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Borrow the rows.
    #[must_use]
    pub fn rows(&self) -> &[Bar] {
        &self.rows
    }

    /// Take ownership of the rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<Bar> {
        self.rows
    }

    /// Mean close price, `None` for an empty table.
    #[must_use]
    pub fn mean_close(&self) -> Option<Decimal> {
        mean(self.rows.iter().map(|bar| bar.close))
    }

    /// Mean volume over rows that report volume.
    #[must_use]
    pub fn mean_volume(&self) -> Option<Decimal> {
        mean(self.rows.iter().filter_map(|bar| bar.volume.map(Decimal::from)))
    }
}

impl IntoIterator for BarSeries {
    type Item = Bar;
    type IntoIter = std::vec::IntoIter<Bar>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

fn mean(values: impl Iterator<Item = Decimal>) -> Option<Decimal> {
    let (sum, count) = values.fold((Decimal::ZERO, 0u32), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / Decimal::from(count))
}

// =============================================================================
// Snapshots
// =============================================================================

/// Latest top-of-book quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Ticker symbol.
    pub symbol: String,
    /// Best bid price.
    pub bid_price: Decimal,
    /// Bid size (round lots).
    pub bid_size: u64,
    /// Best ask price.
    pub ask_price: Decimal,
    /// Ask size (round lots).
    pub ask_size: u64,
    /// Quote time.
    pub timestamp: DateTime<Utc>,
}

/// Quotes fetched with per-symbol failure isolation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteBatch {
    /// Quotes that were fetched, keyed by symbol.
    pub quotes: BTreeMap<String, Quote>,
    /// Symbols that failed, with the error message.
    pub failed: Vec<(String, String)>,
}

impl QuoteBatch {
    /// Whether every requested symbol was fetched.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Tradable instrument listed by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Asset ID.
    pub id: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Display name.
    pub name: String,
    /// Listing exchange.
    pub exchange: String,
    /// Asset class (`us_equity`, `crypto`, ...).
    pub asset_class: String,
    /// Listing status (`active`, `inactive`).
    pub status: String,
    /// Whether the broker accepts orders for it.
    pub tradable: bool,
}

/// One trading session in the market calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    /// Session date.
    pub date: NaiveDate,
    /// Regular session open (exchange local time).
    pub open: NaiveTime,
    /// Regular session close (exchange local time).
    pub close: NaiveTime,
}

/// Account balance snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account ID.
    pub id: String,
    /// Account status (`ACTIVE`, ...).
    pub status: String,
    /// Account currency.
    pub currency: String,
    /// Total equity.
    pub equity: Decimal,
    /// Cash balance.
    pub cash: Decimal,
    /// Buying power.
    pub buying_power: Decimal,
    /// Portfolio value.
    pub portfolio_value: Decimal,
    /// Account creation time.
    pub created_at: Option<DateTime<Utc>>,
}

/// Market clock snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketClock {
    /// Server time.
    pub timestamp: DateTime<Utc>,
    /// Whether the regular session is open.
    pub is_open: bool,
    /// Next session open.
    pub next_open: DateTime<Utc>,
    /// Next session close.
    pub next_close: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn raw(symbol: &str, close: i64, volume: Option<u64>) -> RawBar {
        RawBar {
            symbol: symbol.to_string(),
            timestamp: Some(Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap()),
            open: Some(Decimal::new(close, 0)),
            high: Some(Decimal::new(close + 1, 0)),
            low: Some(Decimal::new(close - 1, 0)),
            close: Some(Decimal::new(close, 0)),
            volume,
            trade_count: None,
            vwap: None,
        }
    }

    fn series(rows: Vec<RawBar>) -> BarSeries {
        BarSeries::from_rows(
            rows.into_iter()
                .map(|r| r.into_bar(Timeframe::MINUTE, REST_SOURCE, Utc::now()).unwrap())
                .collect(),
        )
    }

    #[test]
    fn complete_row_has_no_missing_column() {
        assert_eq!(raw("AAPL", 100, Some(10)).missing_column(), None);
    }

    #[test]
    fn missing_close_is_reported() {
        let mut row = raw("AAPL", 100, None);
        row.close = None;
        assert_eq!(row.missing_column(), Some("close"));
        assert_eq!(
            validate_columns(&[raw("MSFT", 1, None), row]),
            Err(ValidationError::MissingColumn { column: "close" })
        );
    }

    #[test]
    fn missing_symbol_is_reported_first() {
        let mut row = raw("", 100, None);
        row.timestamp = None;
        assert_eq!(row.missing_column(), Some("symbol"));
    }

    #[test]
    fn volume_is_optional() {
        let bar = raw("AAPL", 100, None)
            .into_bar(Timeframe::MINUTE, REST_SOURCE, Utc::now())
            .unwrap();
        assert_eq!(bar.volume, None);
        assert_eq!(bar.source, "alpaca");
    }

    #[test]
    fn means_over_rows() {
        let table = series(vec![raw("A", 4, Some(100)), raw("A", 6, Some(300))]);
        assert_eq!(table.mean_close(), Some(Decimal::new(5, 0)));
        assert_eq!(table.mean_volume(), Some(Decimal::new(200, 0)));
    }

    #[test]
    fn mean_volume_skips_unreported() {
        let table = series(vec![raw("A", 4, None), raw("A", 6, Some(300))]);
        assert_eq!(table.mean_volume(), Some(Decimal::new(300, 0)));
        assert_eq!(series(vec![raw("A", 4, None)]).mean_volume(), None);
    }

    #[test]
    fn empty_table_has_no_means() {
        let table = BarSeries::empty();
        assert!(table.is_empty());
        assert_eq!(table.mean_close(), None);
    }

    #[test]
    fn concat_preserves_order() {
        let first = series(vec![raw("A", 1, None)]);
        let second = series(vec![raw("B", 2, None), raw("C", 3, None)]);
        let joined = BarSeries::concat([first, BarSeries::empty(), second]);
        let symbols: Vec<_> = joined.rows().iter().map(|b| b.symbol.as_str()).collect();
        assert_eq!(symbols, ["A", "B", "C"]);
    }

    #[test]
    fn bar_serializes_with_table_column_names() {
        let bar = raw("AAPL", 100, Some(5))
            .into_bar(Timeframe::MINUTE, REST_SOURCE, Utc::now())
            .unwrap();
        let value = serde_json::to_value(&bar).unwrap();
        for column in [
            "symbol",
            "timestamp",
            "open",
            "high",
            "low",
            "close",
            "volume",
            "timeframe",
            "source",
            "fetched_at",
        ] {
            assert!(value.get(column).is_some(), "missing {column}");
        }
        assert_eq!(value["timeframe"], "1Min");
    }
}
