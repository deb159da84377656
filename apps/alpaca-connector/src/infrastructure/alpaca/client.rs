//! Alpaca REST client.
//!
//! Implements [`MarketDataPort`] over [`AlpacaHttpClient`]. Each method makes
//! one logical remote call; bar queries follow `next_page_token` until the
//! provider is exhausted or the requested limit is reached.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::api_types::{
    AccountResponse, AssetResponse, BarsResponse, CalendarResponse, ClockResponse,
    LatestQuoteResponse,
};
use super::http::AlpacaHttpClient;
use crate::application::ports::{BarsRequest, MarketDataPort};
use crate::domain::environment::Environment;
use crate::domain::market_data::{
    Account, Asset, CalendarDay, DateInput, MarketClock, Quote, QuoteBatch, RawBar,
};
use crate::error::ProviderError;
use crate::infrastructure::config::{AlpacaConfig, DataFeed};
use crate::infrastructure::metrics;

/// Largest page the bars endpoint serves.
pub const MAX_PAGE_SIZE: u32 = 10_000;

const RFC3339_SECONDS: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Authenticated Alpaca REST client.
#[derive(Debug, Clone)]
pub struct AlpacaClient {
    http: AlpacaHttpClient,
    feed: DataFeed,
    environment: Environment,
}

impl AlpacaClient {
    /// Create a client from validated configuration.
    pub fn new(config: &AlpacaConfig) -> Result<Self, ProviderError> {
        let http = AlpacaHttpClient::new(config)?;
        let environment = config.environment();
        tracing::info!(
            base_url = %config.base_url,
            data_url = %config.data_url,
            environment = %environment,
            "Alpaca client initialized"
        );
        Ok(Self {
            http,
            feed: config.feed,
            environment,
        })
    }

    /// Environment inferred from the base URL.
    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.environment
    }

    async fn fetch_latest_quote(&self, symbol: &str) -> Result<Quote, ProviderError> {
        let response: LatestQuoteResponse = self
            .http
            .data_get_segments(
                &["v2", "stocks", symbol, "quotes", "latest"],
                &[("feed", self.feed.as_str().to_string())],
            )
            .await?;
        Ok(response.into())
    }
}

#[async_trait]
impl MarketDataPort for AlpacaClient {
    async fn get_account(&self) -> Result<Account, ProviderError> {
        let result = async {
            let response: AccountResponse = self.http.get("/v2/account", &[]).await?;
            response.into_account()
        }
        .await;
        log_failure("get_account", result)
    }

    async fn get_bars(&self, request: &BarsRequest) -> Result<Vec<RawBar>, ProviderError> {
        let result = self.fetch_bars_pages(request).await;
        log_failure("get_bars", result)
    }

    async fn get_latest_quotes(
        &self,
        symbols: &[String],
    ) -> Result<BTreeMap<String, Quote>, ProviderError> {
        let mut quotes = BTreeMap::new();
        for symbol in symbols {
            let quote = log_failure("get_latest_quotes", self.fetch_latest_quote(symbol).await)?;
            quotes.insert(symbol.clone(), quote);
        }
        Ok(quotes)
    }

    async fn get_latest_quotes_partial(&self, symbols: &[String]) -> QuoteBatch {
        let mut batch = QuoteBatch::default();
        for symbol in symbols {
            match self.fetch_latest_quote(symbol).await {
                Ok(quote) => {
                    batch.quotes.insert(symbol.clone(), quote);
                }
                Err(e) => {
                    tracing::warn!(symbol = %symbol, error = %e, "Quote fetch failed");
                    metrics::record_error("get_latest_quotes_partial");
                    batch.failed.push((symbol.clone(), e.to_string()));
                }
            }
        }
        batch
    }

    async fn get_clock(&self) -> Result<MarketClock, ProviderError> {
        let result = self
            .http
            .get::<ClockResponse>("/v2/clock", &[])
            .await
            .map(MarketClock::from);
        log_failure("get_clock", result)
    }

    async fn get_assets(
        &self,
        status: &str,
        asset_class: &str,
    ) -> Result<Vec<Asset>, ProviderError> {
        let query = [
            ("status", status.to_string()),
            ("asset_class", asset_class.to_string()),
        ];
        let result = self
            .http
            .get::<Vec<AssetResponse>>("/v2/assets", &query)
            .await
            .map(|assets| assets.into_iter().map(Asset::from).collect());
        log_failure("get_assets", result)
    }

    async fn get_calendar(
        &self,
        start: Option<DateInput>,
        end: Option<DateInput>,
    ) -> Result<Vec<CalendarDay>, ProviderError> {
        let result = async {
            let today = Utc::now().date_naive();
            let start = start.map_or(Ok(today), |s| s.resolve())?;
            let end = end.map_or(Ok(today), |e| e.resolve())?;
            let query = [
                ("start", start.format("%Y-%m-%d").to_string()),
                ("end", end.format("%Y-%m-%d").to_string()),
            ];
            let days: Vec<CalendarResponse> = self.http.get("/v2/calendar", &query).await?;
            days.into_iter().map(CalendarResponse::into_day).collect()
        }
        .await;
        log_failure("get_calendar", result)
    }
}

impl AlpacaClient {
    async fn fetch_bars_pages(&self, request: &BarsRequest) -> Result<Vec<RawBar>, ProviderError> {
        if request.symbols.is_empty() {
            return Err(ProviderError::InvalidInput("no symbols requested".to_string()));
        }

        let (start, end) = request.resolve_window(Utc::now())?;
        let symbols = request.symbols.join(",");

        tracing::info!(
            timeframe = %request.timeframe,
            symbols = %symbols,
            start = %format_instant(start),
            end = %format_instant(end),
            "Fetching bars"
        );

        let mut by_symbol: BTreeMap<String, Vec<RawBar>> = BTreeMap::new();
        let mut collected: u32 = 0;
        let mut page_token: Option<String> = None;

        loop {
            let remaining = request.limit.map(|limit| limit.saturating_sub(collected));
            if remaining == Some(0) {
                break;
            }
            let page_size = remaining.map_or(MAX_PAGE_SIZE, |r| r.min(MAX_PAGE_SIZE));

            let mut query = vec![
                ("symbols", symbols.clone()),
                ("timeframe", request.timeframe.to_string()),
                ("start", format_instant(start)),
                ("end", format_instant(end)),
                ("limit", page_size.to_string()),
                ("feed", self.feed.as_str().to_string()),
            ];
            if let Some(sort) = request.sort {
                query.push(("sort", sort.as_str().to_string()));
            }
            if let Some(token) = &page_token {
                query.push(("page_token", token.clone()));
            }

            let page: BarsResponse = self.http.data_get("/v2/stocks/bars", &query).await?;

            for (symbol, entries) in page.bars.unwrap_or_default() {
                let rows = by_symbol.entry(symbol.clone()).or_default();
                for entry in entries {
                    rows.push(entry.into_raw(&symbol));
                    collected = collected.saturating_add(1);
                }
            }

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        let rows: Vec<RawBar> = by_symbol.into_values().flatten().collect();
        if rows.is_empty() {
            tracing::warn!(
                symbols = %symbols,
                start = %format_instant(start),
                end = %format_instant(end),
                "No bar data returned"
            );
        }
        Ok(rows)
    }
}

fn format_instant(at: DateTime<Utc>) -> String {
    at.format(RFC3339_SECONDS).to_string()
}

fn log_failure<T>(operation: &'static str, result: Result<T, ProviderError>) -> Result<T, ProviderError> {
    if let Err(e) = &result {
        tracing::error!(operation, error = %e, "Alpaca request failed");
        metrics::record_error(operation);
    }
    result
}
