//! Live Bar Stream
//!
//! One authenticated WebSocket per subscription, subscribed to minute bars.
//! Each bar is forwarded to the handler as a single-row [`BarSeries`].
//!
//! # Stream URL
//!
//! `wss://stream.data.alpaca.markets/v2/{feed}` for both paper and live
//! accounts. A `paper` base URL does not change the stream host; it only sets
//! the environment reported on the [`Subscription`]. `ALPACA_STREAM_URL`
//! replaces the host entirely.
//!
//! # Lifecycle
//!
//! connect → `success/connected` → auth → `success/authenticated` → subscribe
//! → bars... On any recoverable failure the worker reconnects with backoff and
//! repeats the handshake, re-subscribing the same symbols. Closing an
//! authenticated stream sends `unsubscribe` before the close frame.

use std::sync::Arc;

use chrono::Utc;
use futures_util::{Sink, SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;

use super::auth::{AUTH_TIMEOUT, AuthError, AuthHandler, AuthStep};
use super::codec::JsonCodec;
use super::messages::{AlpacaMessage, SubscriptionRequest};
use super::reconnect::{ReconnectConfig, ReconnectPolicy};
use crate::application::ports::{BarHandler, BarStreamPort, Subscription};
use crate::domain::environment::Environment;
use crate::domain::market_data::BarSeries;
use crate::error::StreamError;
use crate::infrastructure::config::{AlpacaConfig, Credentials};
use crate::infrastructure::metrics;

/// Bar stream adapter.
#[derive(Debug, Clone)]
pub struct AlpacaBarStream {
    url: String,
    credentials: Credentials,
    reconnect: ReconnectConfig,
    environment: Environment,
}

impl AlpacaBarStream {
    /// Create the adapter from configuration.
    #[must_use]
    pub fn new(config: &AlpacaConfig) -> Self {
        Self {
            url: config.stream_url(),
            credentials: config.credentials.clone(),
            reconnect: ReconnectConfig::from(&config.websocket),
            environment: config.environment(),
        }
    }

    /// Stream endpoint.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl BarStreamPort for AlpacaBarStream {
    fn subscribe(
        &self,
        symbols: Vec<String>,
        handler: BarHandler,
    ) -> Result<Subscription, StreamError> {
        let symbols = normalize_symbols(symbols);
        if symbols.is_empty() {
            return Err(StreamError::NoSymbols);
        }

        let cancel = CancellationToken::new();
        let worker = Arc::new(BarStreamWorker {
            url: self.url.clone(),
            credentials: self.credentials.clone(),
            reconnect: self.reconnect.clone(),
            symbols: symbols.clone(),
            handler,
            cancel: cancel.clone(),
            codec: JsonCodec::new(),
        });

        tracing::info!(
            url = %self.url,
            environment = %self.environment,
            symbols = ?symbols,
            "Starting bar stream"
        );
        let handle = tokio::spawn(worker.run());

        Ok(Subscription::new(self.environment, symbols, cancel, handle))
    }
}

/// Trim, drop blanks and de-duplicate, keeping first occurrence order.
fn normalize_symbols(symbols: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let symbol = symbol.trim().to_string();
        if !symbol.is_empty() && !seen.contains(&symbol) {
            seen.push(symbol);
        }
    }
    seen
}

// =============================================================================
// Worker
// =============================================================================

struct BarStreamWorker {
    url: String,
    credentials: Credentials,
    reconnect: ReconnectConfig,
    symbols: Vec<String>,
    handler: BarHandler,
    cancel: CancellationToken,
    codec: JsonCodec,
}

impl BarStreamWorker {
    async fn run(self: Arc<Self>) -> Result<(), StreamError> {
        let mut policy = ReconnectPolicy::new(self.reconnect.clone());

        loop {
            if self.cancel.is_cancelled() {
                return Ok(());
            }

            let err = match self.connect_and_run(&mut policy).await {
                Ok(()) => {
                    tracing::info!("Bar stream stopped");
                    return Ok(());
                }
                Err(e) => e,
            };

            if let StreamError::AuthenticationFailed(auth) = &err
                && !auth.is_retryable()
            {
                tracing::error!(error = %err, "Bar stream authentication rejected");
                metrics::record_stream_error("auth");
                return Err(err);
            }

            tracing::warn!(error = %err, "Bar stream connection error");
            metrics::record_stream_error("connection");

            let Some(delay) = policy.next_delay() else {
                return Err(StreamError::MaxReconnectAttemptsExceeded);
            };
            tracing::info!(
                attempt = policy.attempt_count(),
                delay_ms = delay.as_millis(),
                "Reconnecting to bar stream"
            );
            metrics::record_stream_reconnect();

            tokio::select! {
                () = self.cancel.cancelled() => return Ok(()),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn connect_and_run(&self, policy: &mut ReconnectPolicy) -> Result<(), StreamError> {
        tracing::debug!(url = %self.url, "Connecting to bar stream");

        let connected = tokio::select! {
            () = self.cancel.cancelled() => return Ok(()),
            result = tokio_tungstenite::connect_async(self.url.as_str()) => result,
        };
        let (ws_stream, _response) =
            connected.map_err(|e| StreamError::ConnectionFailed(e.to_string()))?;
        let (mut write, mut read) = ws_stream.split();

        let mut auth = AuthHandler::new(self.credentials.clone());
        let auth_deadline = tokio::time::sleep(AUTH_TIMEOUT);
        tokio::pin!(auth_deadline);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    if auth.is_authenticated() {
                        let request = SubscriptionRequest::unsubscribe_bars(self.symbols.clone());
                        let json = self.codec.encode(&request)?;
                        let _ = write.send(Message::Text(json.into())).await;
                    }
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }
                () = &mut auth_deadline, if !auth.is_authenticated() => {
                    return Err(AuthError::Timeout.into());
                }
                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        self.handle_text(text.as_str(), &mut auth, &mut write, policy).await?;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        write.send(Message::Pong(data)).await?;
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("Server sent close frame");
                        return Err(StreamError::ConnectionClosed);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => return Err(StreamError::ConnectionClosed),
                },
            }
        }
    }

    async fn handle_text<W>(
        &self,
        text: &str,
        auth: &mut AuthHandler,
        write: &mut W,
        policy: &mut ReconnectPolicy,
    ) -> Result<(), StreamError>
    where
        W: Sink<Message, Error = tungstenite::Error> + Unpin,
    {
        for msg in self.codec.decode(text)? {
            match msg {
                AlpacaMessage::Success(success) => match auth.on_success(&success) {
                    AuthStep::SendAuth(request) => {
                        let json = self.codec.encode(&request)?;
                        write.send(Message::Text(json.into())).await?;
                    }
                    AuthStep::Authenticated => {
                        tracing::info!("Bar stream authenticated");
                        policy.reset();
                        let request = SubscriptionRequest::subscribe_bars(self.symbols.clone());
                        let json = self.codec.encode(&request)?;
                        write.send(Message::Text(json.into())).await?;
                    }
                    AuthStep::Idle => {}
                },
                AlpacaMessage::Error(error) => {
                    if !auth.is_authenticated() {
                        return Err(auth.on_error(&error).into());
                    }
                    tracing::error!(code = error.code, msg = %error.msg, "Bar stream error");
                    metrics::record_stream_error("server");
                }
                AlpacaMessage::Subscription(sub) => {
                    tracing::debug!(bars = ?sub.bars, "Subscription confirmed");
                }
                AlpacaMessage::Bar(bar) => {
                    metrics::record_stream_bar();
                    let row = bar.into_bar(Utc::now());
                    (self.handler)(BarSeries::from_rows(vec![row]));
                }
                AlpacaMessage::Ignored(kind) => {
                    tracing::trace!(kind = %kind, "Ignoring stream message");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_are_trimmed_and_deduplicated() {
        let symbols = normalize_symbols(vec![
            " AAPL".to_string(),
            "MSFT".to_string(),
            "AAPL".to_string(),
            String::new(),
        ]);
        assert_eq!(symbols, ["AAPL", "MSFT"]);
    }

    #[tokio::test]
    async fn empty_symbol_list_is_rejected() {
        let config = AlpacaConfig::new("k", "s", "https://paper-api.alpaca.markets").unwrap();
        let stream = AlpacaBarStream::new(&config);
        let handler: BarHandler = Arc::new(|_| {});
        assert!(matches!(
            stream.subscribe(vec![" ".to_string()], handler),
            Err(StreamError::NoSymbols)
        ));
    }

    #[test]
    fn default_url_uses_feed() {
        let config = AlpacaConfig::new("k", "s", "https://paper-api.alpaca.markets").unwrap();
        assert_eq!(
            AlpacaBarStream::new(&config).url(),
            "wss://stream.data.alpaca.markets/v2/iex"
        );
    }
}
