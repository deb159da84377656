//! Prometheus Metrics Module
//!
//! # Metrics
//!
//! - **Requests**: REST calls by API (`trading`, `data`)
//! - **Errors**: failed operations by name
//! - **Bars**: rows returned by `fetch_bars`, backfill windows, streamed bars
//! - **Stream**: stream errors by kind and reconnect attempts
//!
//! Recording is a no-op until [`init_metrics`] installs the recorder.

use std::sync::OnceLock;

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Recorder installation failure.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Exporter could not be built.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Another global recorder is already installed.
    #[error("failed to install metrics recorder: {0}")]
    Install(String),
}

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder.
///
/// With a port, a scrape endpoint is served on `0.0.0.0:{port}`. Repeated calls
/// return the handle installed by the first successful call.
///
/// Must be called from within a Tokio runtime when a port is given.
pub fn init_metrics(port: Option<u16>) -> Result<PrometheusHandle, MetricsError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = match port {
        Some(port) => {
            let (recorder, exporter) = PrometheusBuilder::new()
                .with_http_listener(([0, 0, 0, 0], port))
                .build()?;
            let handle = recorder.handle();
            metrics::set_global_recorder(recorder)
                .map_err(|e| MetricsError::Install(e.to_string()))?;
            tokio::spawn(async move {
                if exporter.await.is_err() {
                    tracing::warn!("Metrics exporter stopped");
                }
            });
            handle
        }
        None => PrometheusBuilder::new().install_recorder()?,
    };

    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

fn register_metrics() {
    describe_counter!(
        "alpaca_connector_requests_total",
        "Total REST requests sent to Alpaca"
    );
    describe_counter!(
        "alpaca_connector_errors_total",
        "Total failed connector operations"
    );
    describe_counter!(
        "alpaca_connector_bars_fetched_total",
        "Total validated bar rows returned by fetch_bars"
    );
    describe_counter!(
        "alpaca_connector_backfill_batches_total",
        "Total backfill windows requested"
    );
    describe_counter!(
        "alpaca_connector_stream_bars_total",
        "Total bars received from the stream"
    );
    describe_counter!(
        "alpaca_connector_stream_errors_total",
        "Total stream errors by kind"
    );
    describe_counter!(
        "alpaca_connector_stream_reconnects_total",
        "Total stream reconnection attempts"
    );
}

/// Record a REST request.
pub fn record_request(api: &'static str) {
    counter!("alpaca_connector_requests_total", "api" => api).increment(1);
}

/// Record a failed operation.
pub fn record_error(operation: &'static str) {
    counter!("alpaca_connector_errors_total", "operation" => operation).increment(1);
}

/// Record validated bar rows.
pub fn record_bars_fetched(count: usize) {
    counter!("alpaca_connector_bars_fetched_total").increment(count as u64);
}

/// Record one backfill window request.
pub fn record_backfill_batch() {
    counter!("alpaca_connector_backfill_batches_total").increment(1);
}

/// Record one streamed bar.
pub fn record_stream_bar() {
    counter!("alpaca_connector_stream_bars_total").increment(1);
}

/// Record a stream error.
pub fn record_stream_error(kind: &'static str) {
    counter!("alpaca_connector_stream_errors_total", "kind" => kind).increment(1);
}

/// Record a stream reconnection attempt.
pub fn record_stream_reconnect() {
    counter!("alpaca_connector_stream_reconnects_total").increment(1);
}
