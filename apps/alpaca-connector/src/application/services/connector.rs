//! Market Data Connector
//!
//! Ingestion-facing operations over the ports: validated bar fetches, weekly
//! backfill, live bar streaming and the tradable-symbol screen.
//!
//! Operations await their remote calls one after another.

use chrono::Utc;

use crate::application::ports::{
    BarHandler, BarStreamPort, BarsRequest, MarketDataPort, SortOrder, Subscription,
};
use crate::domain::backfill::{DEFAULT_BATCH_SIZE, default_range, plan_windows};
use crate::domain::market_data::{
    Bar, BarSeries, DateInput, REST_SOURCE, Timeframe, validate_columns,
};
use crate::domain::screening::{SAMPLE_BARS, TradableCriteria, is_candidate, meets_liquidity};
use crate::error::{ProviderError, StreamError, ValidationError};
use crate::infrastructure::metrics;

/// Connector over a REST provider `P` and a bar stream `S`.
#[derive(Debug)]
pub struct MarketDataConnector<P, S> {
    provider: P,
    stream: S,
}

impl<P, S> MarketDataConnector<P, S>
where
    P: MarketDataPort,
    S: BarStreamPort,
{
    /// Compose a connector from its adapters.
    pub const fn new(provider: P, stream: S) -> Self {
        Self { provider, stream }
    }

    /// The REST provider, for calls the connector does not wrap.
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Whether the regular session is open right now.
    pub async fn check_market_status(&self) -> Result<bool, ProviderError> {
        self.provider.is_market_open().await
    }

    /// Fetch bars as a validated table.
    ///
    /// No rows, or rows missing a required column, yield an empty table.
    /// Provider failures propagate.
    pub async fn fetch_bars(&self, request: &BarsRequest) -> Result<BarSeries, ProviderError> {
        let raw = self.provider.get_bars(request).await?;
        if raw.is_empty() {
            tracing::warn!(symbols = ?request.symbols, "No bar data returned");
            return Ok(BarSeries::empty());
        }

        let fetched_at = Utc::now();
        let timeframe = request.timeframe;
        let rows: Result<Vec<Bar>, ValidationError> = validate_columns(&raw).and_then(|()| {
            raw.into_iter()
                .map(|row| row.into_bar(timeframe, REST_SOURCE, fetched_at))
                .collect()
        });

        match rows {
            Ok(rows) => {
                metrics::record_bars_fetched(rows.len());
                tracing::info!(
                    symbols = ?request.symbols,
                    timeframe = %timeframe,
                    rows = rows.len(),
                    "Fetched bars"
                );
                Ok(BarSeries::from_rows(rows))
            }
            Err(e) => {
                tracing::error!(symbols = ?request.symbols, error = %e, "Invalid bar data");
                metrics::record_error("fetch_bars");
                Ok(BarSeries::empty())
            }
        }
    }

    /// Fetch `[start, end]` in windows of up to eight calendar days.
    ///
    /// `start` defaults to thirty days ago and `end` to today. Any window
    /// failure aborts the whole backfill.
    pub async fn backfill(
        &self,
        symbols: &[String],
        timeframe: Timeframe,
        start: Option<DateInput>,
        end: Option<DateInput>,
        batch_size: Option<u32>,
    ) -> Result<BarSeries, ProviderError> {
        let (default_start, default_end) = default_range(Utc::now().date_naive());
        let start_date = start.map_or(Ok(default_start), |d| d.resolve())?;
        let end_date = end.map_or(Ok(default_end), |d| d.resolve())?;
        let batch_size = batch_size.unwrap_or(DEFAULT_BATCH_SIZE);

        let windows = plan_windows(start_date, end_date);
        tracing::info!(
            symbols = ?symbols,
            start = %start_date,
            end = %end_date,
            batches = windows.len(),
            "Starting backfill"
        );

        let mut parts = Vec::with_capacity(windows.len());
        for window in &windows {
            let request = BarsRequest::new(symbols.iter().cloned())
                .with_timeframe(timeframe)
                .with_start(window.start())
                .with_end(window.end())
                .with_limit(batch_size);

            let bars = self.fetch_bars(&request).await.inspect_err(|e| {
                tracing::error!(
                    start = %window.start_date,
                    end = %window.end_date,
                    error = %e,
                    "Backfill batch failed"
                );
                metrics::record_error("backfill");
            })?;
            metrics::record_backfill_batch();
            tracing::debug!(
                start = %window.start_date,
                end = %window.end_date,
                rows = bars.len(),
                "Backfill batch"
            );

            if !bars.is_empty() {
                parts.push(bars);
            }
        }

        let series = BarSeries::concat(parts);
        tracing::info!(rows = series.len(), "Backfill complete");
        Ok(series)
    }

    /// Stream live minute bars for `symbols` into `handler`.
    pub fn setup_streaming(
        &self,
        symbols: Vec<String>,
        handler: BarHandler,
    ) -> Result<Subscription, StreamError> {
        let subscription = self.stream.subscribe(symbols, handler)?;
        tracing::info!(
            environment = %subscription.environment(),
            symbols = ?subscription.symbols(),
            "Streaming bars"
        );
        Ok(subscription)
    }

    /// Symbols that pass the asset check and the liquidity thresholds.
    ///
    /// Each candidate is sampled with its most recent minute bars.
    ///
    /// A failed bar sample skips that symbol; a failed asset listing fails
    /// the call.
    pub async fn get_tradable_symbols(
        &self,
        criteria: &TradableCriteria,
    ) -> Result<Vec<String>, ProviderError> {
        let assets = self
            .provider
            .get_assets(&criteria.status, &criteria.asset_class)
            .await?;

        let mut tradable = Vec::new();
        for asset in assets.iter().filter(|a| is_candidate(a)) {
            let request = BarsRequest::new([asset.symbol.as_str()])
                .with_limit(SAMPLE_BARS)
                .with_sort(SortOrder::Desc);
            match self.fetch_bars(&request).await {
                Ok(bars) if bars.is_empty() => {
                    tracing::debug!(symbol = %asset.symbol, "No recent bars");
                }
                Ok(bars) => {
                    if meets_liquidity(&bars, criteria) {
                        tradable.push(asset.symbol.clone());
                    }
                }
                Err(e) => {
                    tracing::warn!(symbol = %asset.symbol, error = %e, "Skipping symbol");
                }
            }
        }

        tracing::info!(
            assets = assets.len(),
            tradable = tradable.len(),
            "Screened tradable symbols"
        );
        Ok(tradable)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone};
    use mockall::mock;
    use rust_decimal::Decimal;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::domain::environment::Environment;
    use crate::domain::market_data::{
        Account, Asset, CalendarDay, MarketClock, Quote, QuoteBatch, RawBar, STREAM_SOURCE,
    };

    mock! {
        Provider {}

        #[async_trait]
        impl MarketDataPort for Provider {
            async fn get_account(&self) -> Result<Account, ProviderError>;
            async fn get_bars(&self, request: &BarsRequest) -> Result<Vec<RawBar>, ProviderError>;
            async fn get_latest_quotes(
                &self,
                symbols: &[String],
            ) -> Result<BTreeMap<String, Quote>, ProviderError>;
            async fn get_latest_quotes_partial(&self, symbols: &[String]) -> QuoteBatch;
            async fn get_clock(&self) -> Result<MarketClock, ProviderError>;
            async fn get_assets(
                &self,
                status: &str,
                asset_class: &str,
            ) -> Result<Vec<Asset>, ProviderError>;
            async fn get_calendar(
                &self,
                start: Option<DateInput>,
                end: Option<DateInput>,
            ) -> Result<Vec<CalendarDay>, ProviderError>;
        }
    }

    mock! {
        Stream {}

        impl BarStreamPort for Stream {
            fn subscribe(
                &self,
                symbols: Vec<String>,
                handler: BarHandler,
            ) -> Result<Subscription, StreamError>;
        }
    }

    fn raw(symbol: &str, close: i64, volume: u64) -> RawBar {
        let price = Some(Decimal::new(close, 0));
        RawBar {
            symbol: symbol.to_string(),
            timestamp: Some(Utc.with_ymd_and_hms(2024, 1, 2, 15, 30, 0).unwrap()),
            open: price,
            high: price,
            low: price,
            close: price,
            volume: Some(volume),
            trade_count: None,
            vwap: None,
        }
    }

    fn asset(symbol: &str, tradable: bool) -> Asset {
        Asset {
            id: symbol.to_lowercase(),
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            exchange: "NYSE".to_string(),
            asset_class: "us_equity".to_string(),
            status: "active".to_string(),
            tradable,
        }
    }

    fn connector(provider: MockProvider) -> MarketDataConnector<MockProvider, MockStream> {
        MarketDataConnector::new(provider, MockStream::new())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn fetch_bars_tags_rows() {
        let mut provider = MockProvider::new();
        provider
            .expect_get_bars()
            .returning(|_| Ok(vec![raw("AAPL", 185, 100), raw("AAPL", 186, 200)]));

        let request = BarsRequest::new(["AAPL"]).with_timeframe(Timeframe::HOUR);
        let bars = connector(provider).fetch_bars(&request).await.unwrap();

        assert_eq!(bars.len(), 2);
        let first = &bars.rows()[0];
        assert_eq!(first.timeframe, Timeframe::HOUR);
        assert_eq!(first.source, REST_SOURCE);
        assert_eq!(first.fetched_at, bars.rows()[1].fetched_at);
    }

    #[tokio::test]
    async fn fetch_bars_with_missing_column_is_empty() {
        let mut provider = MockProvider::new();
        provider.expect_get_bars().returning(|_| {
            let mut partial = raw("AAPL", 185, 100);
            partial.close = None;
            Ok(vec![raw("AAPL", 184, 100), partial])
        });

        let bars = connector(provider)
            .fetch_bars(&BarsRequest::new(["AAPL"]))
            .await
            .unwrap();
        assert!(bars.is_empty());
    }

    #[tokio::test]
    async fn fetch_bars_propagates_provider_error() {
        let mut provider = MockProvider::new();
        provider
            .expect_get_bars()
            .returning(|_| Err(ProviderError::AuthenticationFailed));

        let result = connector(provider).fetch_bars(&BarsRequest::new(["AAPL"])).await;
        assert_eq!(result, Err(ProviderError::AuthenticationFailed));
    }

    #[tokio::test]
    async fn market_status_reads_clock() {
        let mut provider = MockProvider::new();
        provider.expect_get_clock().returning(|| {
            let now = Utc::now();
            Ok(MarketClock {
                timestamp: now,
                is_open: true,
                next_open: now,
                next_close: now,
            })
        });

        assert_eq!(connector(provider).check_market_status().await, Ok(true));
    }

    #[tokio::test]
    async fn backfill_requests_one_call_per_window() {
        let mut provider = MockProvider::new();
        let mut seq = mockall::Sequence::new();
        provider
            .expect_get_bars()
            .withf(|req| {
                req.limit == Some(1000)
                    && req.start == Some(date(2024, 1, 1).and_hms_opt(0, 0, 0).unwrap().and_utc().into())
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![raw("AAPL", 185, 100)]));
        provider
            .expect_get_bars()
            .withf(|req| {
                req.start == Some(date(2024, 1, 9).and_hms_opt(0, 0, 0).unwrap().and_utc().into())
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![raw("AAPL", 190, 100)]));

        let bars = connector(provider)
            .backfill(
                &["AAPL".to_string()],
                Timeframe::MINUTE,
                Some("2024-01-01".into()),
                Some("2024-01-10".into()),
                None,
            )
            .await
            .unwrap();

        let closes: Vec<_> = bars.rows().iter().map(|b| b.close).collect();
        assert_eq!(closes, [Decimal::new(185, 0), Decimal::new(190, 0)]);
    }

    #[tokio::test]
    async fn backfill_aborts_on_batch_failure() {
        let mut provider = MockProvider::new();
        let mut calls = 0;
        provider.expect_get_bars().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(vec![raw("AAPL", 185, 100)])
            } else {
                Err(ProviderError::Network("reset".to_string()))
            }
        });

        let result = connector(provider)
            .backfill(
                &["AAPL".to_string()],
                Timeframe::MINUTE,
                Some(date(2024, 1, 1).into()),
                Some(date(2024, 1, 20).into()),
                Some(500),
            )
            .await;
        assert!(matches!(result, Err(ProviderError::Network(_))));
    }

    #[tokio::test]
    async fn backfill_with_inverted_range_makes_no_calls() {
        let mut provider = MockProvider::new();
        provider.expect_get_bars().never();

        let bars = connector(provider)
            .backfill(
                &["AAPL".to_string()],
                Timeframe::DAY,
                Some("2024-02-01".into()),
                Some("2024-01-01".into()),
                None,
            )
            .await
            .unwrap();
        assert!(bars.is_empty());
    }

    #[tokio::test]
    async fn backfill_rejects_bad_date() {
        let provider = MockProvider::new();
        let result = connector(provider)
            .backfill(
                &["AAPL".to_string()],
                Timeframe::DAY,
                Some("yesterday".into()),
                None,
                None,
            )
            .await;
        assert!(matches!(result, Err(ProviderError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn tradable_symbols_screen_assets_and_liquidity() {
        let mut provider = MockProvider::new();
        provider
            .expect_get_assets()
            .withf(|status, class| status == "active" && class == "us_equity")
            .returning(|_, _| {
                Ok(vec![
                    asset("AAPL", true),
                    asset("BRK.B", true),
                    asset("PENNY", true),
                    asset("HALT", false),
                    asset("EMPTY", true),
                    asset("FAIL", true),
                ])
            });
        provider
            .expect_get_bars()
            .withf(|req| req.sort == Some(SortOrder::Desc) && req.limit == Some(SAMPLE_BARS))
            .returning(|req| match req.symbols[0].as_str() {
                "AAPL" => Ok(vec![raw("AAPL", 185, 1_000_000)]),
                "PENNY" => Ok(vec![raw("PENNY", 2, 9_000_000)]),
                "EMPTY" => Ok(vec![]),
                other => Err(ProviderError::NotFound(other.to_string())),
            });

        let symbols = connector(provider)
            .get_tradable_symbols(&TradableCriteria::default())
            .await
            .unwrap();
        assert_eq!(symbols, ["AAPL"]);
    }

    #[tokio::test]
    async fn tradable_symbols_propagate_asset_failure() {
        let mut provider = MockProvider::new();
        provider
            .expect_get_assets()
            .returning(|_, _| Err(ProviderError::AuthenticationFailed));

        let result = connector(provider)
            .get_tradable_symbols(&TradableCriteria::default())
            .await;
        assert_eq!(result, Err(ProviderError::AuthenticationFailed));
    }

    #[tokio::test]
    async fn setup_streaming_delegates_to_stream() {
        let mut stream = MockStream::new();
        stream
            .expect_subscribe()
            .withf(|symbols, _| symbols == &["AAPL".to_string()])
            .returning(|symbols, _| {
                let worker = tokio::spawn(async { Ok(()) });
                Ok(Subscription::new(
                    Environment::Paper,
                    symbols,
                    CancellationToken::new(),
                    worker,
                ))
            });
        let connector = MarketDataConnector::new(MockProvider::new(), stream);

        let handler: BarHandler = Arc::new(|bars: BarSeries| {
            assert!(bars.rows().iter().all(|b| b.source == STREAM_SOURCE));
        });
        let subscription = connector
            .setup_streaming(vec!["AAPL".to_string()], handler)
            .unwrap();
        assert_eq!(subscription.environment(), Environment::Paper);
        assert!(subscription.close().await.is_ok());
    }
}
