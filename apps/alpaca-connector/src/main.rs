//! Alpaca Connector Binary
//!
//! Smoke run against the configured account: market status, account balances,
//! recent bars for a few large caps and a five-day backfill.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin alpaca-connector
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `ALPACA_API_KEY`: Alpaca API key
//! - `ALPACA_API_SECRET`: Alpaca API secret
//! - `ALPACA_BASE_URL`: Trading API base URL (a `paper` URL selects paper trading)
//!
//! ## Optional
//! - `ALPACA_DATA_URL`, `ALPACA_STREAM_URL`, `ALPACA_FEED` (iex | sip)
//! - `ALPACA_TIMEOUT_SECS`, `ALPACA_MAX_ATTEMPTS`, `ALPACA_MAX_RECONNECT_ATTEMPTS`
//! - `ALPACA_CONNECTOR_METRICS_PORT`: Serve Prometheus metrics on this port
//! - `OTEL_ENABLED`: Export spans over OTLP (default: false)
//! - `RUST_LOG`: Log filter

use alpaca_connector::infrastructure::config::metrics_port_from_env;
use alpaca_connector::{
    AlpacaConfig, BarsRequest, MarketDataPort, Timeframe, connect, init_metrics, init_telemetry,
};
use anyhow::Context;
use chrono::{Days, Utc};

const SAMPLE_SYMBOLS: [&str; 3] = ["AAPL", "MSFT", "GOOGL"];

const BACKFILL_DAYS: u64 = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    load_dotenv();

    let _telemetry_guard = init_telemetry().context("failed to initialize telemetry")?;

    let metrics_port = metrics_port_from_env();
    if metrics_port.is_some() {
        init_metrics(metrics_port).context("failed to initialize metrics")?;
    }

    let config = AlpacaConfig::from_env()?;
    tracing::info!(
        environment = %config.environment(),
        feed = config.feed.as_str(),
        "Configuration loaded"
    );

    let connector = connect(&config)?;

    let open = connector.check_market_status().await?;
    println!("Market open: {open}");

    let account = connector.provider().get_account().await?;
    println!(
        "Account {}: equity {} cash {} buying power {}",
        account.id, account.equity, account.cash, account.buying_power
    );

    let request = BarsRequest::new(SAMPLE_SYMBOLS)
        .with_timeframe(Timeframe::MINUTE)
        .with_limit(5);
    let bars = connector.fetch_bars(&request).await?;
    println!("Latest bars ({} rows):", bars.len());
    for bar in bars.rows() {
        println!(
            "  {} {} o={} h={} l={} c={} v={}",
            bar.symbol,
            bar.timestamp,
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume.map_or_else(|| "-".to_string(), |v| v.to_string())
        );
    }

    let today = Utc::now().date_naive();
    let start = today.checked_sub_days(Days::new(BACKFILL_DAYS)).unwrap_or(today);
    let history = connector
        .backfill(
            &["AAPL".to_string()],
            Timeframe::MINUTE,
            Some(start.into()),
            Some(today.into()),
            None,
        )
        .await?;
    println!("Backfilled {} AAPL rows since {start}", history.len());

    Ok(())
}

/// Load .env from the current directory or the nearest ancestor that has one.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}
