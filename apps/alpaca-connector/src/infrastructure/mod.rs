//! Infrastructure Layer - Adapters and external integrations.
//!
//! Concrete implementations of the ports defined in the application layer.

/// Alpaca REST and stream adapters.
pub mod alpaca;

/// Configuration.
pub mod config;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Logging and OpenTelemetry tracing.
pub mod telemetry;
