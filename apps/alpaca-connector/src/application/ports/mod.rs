//! Port Interfaces
//!
//! Driven (outbound) ports the connector depends on. The Alpaca adapters in
//! the infrastructure layer implement them.
//!
//! - `MarketDataPort`: REST access to account, bars, quotes, clock, assets, calendar
//! - `BarStreamPort`: live minute-bar subscriptions

mod bar_stream_port;
mod market_data_port;

pub use bar_stream_port::{BarHandler, BarStreamPort, Subscription};
pub use market_data_port::{BarsRequest, MarketDataPort, SortOrder};
