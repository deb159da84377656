//! Domain Layer - Market data types and pure planning logic.
//!
//! Nothing here performs I/O. Remote payloads are mapped into these types by
//! the infrastructure layer; the connector combines them.

/// Bars, quotes, assets, calendar, account and time inputs.
pub mod market_data;

/// Weekly backfill window planning.
pub mod backfill;

/// Tradable-symbol screening rules.
pub mod screening;

/// Paper vs live trading environment.
pub mod environment;
