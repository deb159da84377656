//! Alpaca Adapters
//!
//! - **REST**: trading API (account, clock, assets, calendar) and market data
//!   API (bars, latest quotes) behind [`AlpacaClient`]
//! - **Stream**: minute-bar WebSocket feed behind [`AlpacaBarStream`]

pub mod api_types;
pub mod auth;
pub mod client;
pub mod codec;
pub mod http;
pub mod messages;
pub mod reconnect;
pub mod stream;

pub use auth::{AuthError, AuthHandler, AuthState};
pub use client::{AlpacaClient, MAX_PAGE_SIZE};
pub use codec::{CodecError, JsonCodec};
pub use http::{AlpacaHttpClient, Api};
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
pub use stream::AlpacaBarStream;

use crate::application::services::MarketDataConnector;
use crate::error::ProviderError;
use crate::infrastructure::config::AlpacaConfig;

/// Connector wired to the Alpaca REST client and bar stream.
pub type AlpacaConnector = MarketDataConnector<AlpacaClient, AlpacaBarStream>;

/// Build a connector for `config`.
pub fn connect(config: &AlpacaConfig) -> Result<AlpacaConnector, ProviderError> {
    Ok(MarketDataConnector::new(
        AlpacaClient::new(config)?,
        AlpacaBarStream::new(config),
    ))
}
