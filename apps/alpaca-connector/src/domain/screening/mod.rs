//! Tradable-symbol screen.
//!
//! Two stages: a static asset check (tradable, plain alphanumeric ticker) and a
//! liquidity check on recent bars (mean close and mean volume at or above the
//! thresholds).

use rust_decimal::Decimal;

use super::market_data::{Asset, BarSeries};

/// Default asset listing status.
pub const DEFAULT_STATUS: &str = "active";

/// Default asset class.
pub const DEFAULT_ASSET_CLASS: &str = "us_equity";

/// Bars sampled per candidate.
pub const SAMPLE_BARS: u32 = 5;

/// Screening thresholds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradableCriteria {
    /// Asset listing status to request.
    pub status: String,
    /// Asset class to request.
    pub asset_class: String,
    /// Minimum mean close price.
    pub min_price: Decimal,
    /// Minimum mean volume.
    pub min_volume: Decimal,
}

impl Default for TradableCriteria {
    fn default() -> Self {
        Self {
            status: DEFAULT_STATUS.to_string(),
            asset_class: DEFAULT_ASSET_CLASS.to_string(),
            min_price: Decimal::new(5, 0),
            min_volume: Decimal::new(500_000, 0),
        }
    }
}

impl TradableCriteria {
    /// Override the minimum mean close.
    #[must_use]
    pub const fn with_min_price(mut self, min_price: Decimal) -> Self {
        self.min_price = min_price;
        self
    }

    /// Override the minimum mean volume.
    #[must_use]
    pub const fn with_min_volume(mut self, min_volume: Decimal) -> Self {
        self.min_volume = min_volume;
        self
    }
}

/// Whether an asset is worth sampling: tradable with an alphanumeric ticker.
///
/// Class-share tickers like `BRK.B` are excluded.
#[must_use]
pub fn is_candidate(asset: &Asset) -> bool {
    asset.tradable
        && !asset.symbol.is_empty()
        && asset.symbol.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Whether a bar sample clears both liquidity thresholds.
///
/// An empty sample, or one with no reported volume, never passes.
#[must_use]
pub fn meets_liquidity(bars: &BarSeries, criteria: &TradableCriteria) -> bool {
    match (bars.mean_close(), bars.mean_volume()) {
        (Some(close), Some(volume)) => close >= criteria.min_price && volume >= criteria.min_volume,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market_data::{Bar, Timeframe};
    use chrono::Utc;
    use test_case::test_case;

    fn asset(symbol: &str, tradable: bool) -> Asset {
        Asset {
            id: format!("id-{symbol}"),
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            exchange: "NASDAQ".to_string(),
            asset_class: "us_equity".to_string(),
            status: "active".to_string(),
            tradable,
        }
    }

    fn bars(samples: &[(i64, u64)]) -> BarSeries {
        let now = Utc::now();
        BarSeries::from_rows(
            samples
                .iter()
                .map(|&(close, volume)| Bar {
                    symbol: "AAPL".to_string(),
                    timestamp: now,
                    open: Decimal::new(close, 0),
                    high: Decimal::new(close, 0),
                    low: Decimal::new(close, 0),
                    close: Decimal::new(close, 0),
                    volume: Some(volume),
                    timeframe: Timeframe::MINUTE,
                    source: "alpaca".to_string(),
                    fetched_at: now,
                })
                .collect(),
        )
    }

    #[test_case("AAPL", true, true ; "plain ticker")]
    #[test_case("BRK.B", true, false ; "dotted class share")]
    #[test_case("BF-B", true, false ; "dashed ticker")]
    #[test_case("MSFT", false, false ; "not tradable")]
    #[test_case("", true, false ; "empty symbol")]
    fn candidate_check(symbol: &str, tradable: bool, expected: bool) {
        assert_eq!(is_candidate(&asset(symbol, tradable)), expected);
    }

    #[test]
    fn thresholds_are_inclusive() {
        let criteria = TradableCriteria::default();
        assert!(meets_liquidity(&bars(&[(5, 500_000)]), &criteria));
    }

    #[test_case(&[(4, 1_000_000), (5, 1_000_000)] ; "mean close below")]
    #[test_case(&[(10, 499_999)] ; "mean volume below")]
    #[test_case(&[] ; "no bars")]
    fn below_threshold_fails(samples: &[(i64, u64)]) {
        assert!(!meets_liquidity(&bars(samples), &TradableCriteria::default()));
    }

    #[test]
    fn custom_thresholds() {
        let criteria = TradableCriteria::default()
            .with_min_price(Decimal::new(100, 0))
            .with_min_volume(Decimal::new(10, 0));
        assert!(!meets_liquidity(&bars(&[(50, 1_000)]), &criteria));
        assert!(meets_liquidity(&bars(&[(150, 1_000)]), &criteria));
    }
}
