//! Application Services
//!
//! Use cases composed over the market data and bar stream ports.

mod connector;

pub use connector::MarketDataConnector;
