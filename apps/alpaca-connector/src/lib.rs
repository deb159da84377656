#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Alpaca Connector - Market Data Ingestion
//!
//! Typed access to Alpaca's trading and market data APIs, shaped for
//! ingestion: validated bar tables, weekly-batched historical backfill, live
//! minute-bar streaming and a tradable-symbol screen.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Pure data types and planning logic
//!   - `market_data`: bars, quotes, assets, calendar, account, time inputs
//!   - `backfill`: window planning
//!   - `screening`: tradable-symbol rules
//!
//! - **Application**: Ports and the connector service
//!   - `ports`: `MarketDataPort`, `BarStreamPort`
//!   - `services`: `MarketDataConnector`
//!
//! - **Infrastructure**: Adapters and ambient concerns
//!   - `alpaca`: REST client and bar stream
//!   - `config`: explicit configuration with an env constructor
//!   - `metrics`, `telemetry`
//!
//! # Data Flow
//!
//! ```text
//! Alpaca REST ──► AlpacaClient ──► get_bars ──► fetch_bars ──► BarSeries
//!                                                  ▲
//!                              backfill ───────────┘ (one call per window)
//!
//! Alpaca WS ──► AlpacaBarStream ──► handler(BarSeries of one row)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Domain layer - Market data types with no I/O.
pub mod domain;

/// Application layer - Ports and the connector service.
pub mod application;

/// Infrastructure layer - Alpaca adapters, config, metrics and telemetry.
pub mod infrastructure;

/// Error types.
pub mod error;

// =============================================================================
// Re-exports
// =============================================================================

pub use application::ports::{
    BarHandler, BarStreamPort, BarsRequest, MarketDataPort, SortOrder, Subscription,
};
pub use application::services::MarketDataConnector;

pub use domain::backfill::{BackfillWindow, plan_windows};
pub use domain::environment::Environment;
pub use domain::market_data::{
    Account, Asset, Bar, BarSeries, CalendarDay, DateInput, MarketClock, Quote, QuoteBatch,
    RawBar, TimeInput, Timeframe,
};
pub use domain::screening::TradableCriteria;

pub use error::{ConfigError, ProviderError, StreamError, ValidationError};

pub use infrastructure::alpaca::{AlpacaBarStream, AlpacaClient, AlpacaConnector, connect};
pub use infrastructure::config::{AlpacaConfig, Credentials, DataFeed, RetryConfig};
pub use infrastructure::metrics::init_metrics;
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
