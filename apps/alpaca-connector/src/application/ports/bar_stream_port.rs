//! Bar Stream Port (Driven Port)
//!
//! Live minute-bar subscriptions. A subscription owns one background worker;
//! closing or dropping it cancels the worker.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::domain::environment::Environment;
use crate::domain::market_data::BarSeries;
use crate::error::StreamError;

/// Callback invoked with a single-row table per live bar.
pub type BarHandler = Arc<dyn Fn(BarSeries) + Send + Sync>;

/// Port for live bar streaming.
pub trait BarStreamPort: Send + Sync {
    /// Start streaming minute bars for `symbols` into `handler`.
    ///
    /// Must be called from within a tokio runtime.
    fn subscribe(
        &self,
        symbols: Vec<String>,
        handler: BarHandler,
    ) -> Result<Subscription, StreamError>;
}

/// Handle to a running bar stream.
#[derive(Debug)]
pub struct Subscription {
    environment: Environment,
    symbols: Vec<String>,
    cancel: CancellationToken,
    worker: Option<JoinHandle<Result<(), StreamError>>>,
}

impl Subscription {
    /// Wrap a spawned worker and the token that stops it.
    #[must_use]
    pub const fn new(
        environment: Environment,
        symbols: Vec<String>,
        cancel: CancellationToken,
        worker: JoinHandle<Result<(), StreamError>>,
    ) -> Self {
        Self {
            environment,
            symbols,
            cancel,
            worker: Some(worker),
        }
    }

    /// Environment the stream was opened for.
    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.environment
    }

    /// Subscribed symbols.
    #[must_use]
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Whether the worker has been cancelled or has stopped on its own.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
            || self
                .worker
                .as_ref()
                .is_none_or(JoinHandle::is_finished)
    }

    /// Cancel the stream and wait for the worker to exit.
    ///
    /// Returns the error the worker stopped with, if it failed before being
    /// cancelled.
    pub async fn close(mut self) -> Result<(), StreamError> {
        self.cancel.cancel();
        match self.worker.take() {
            Some(worker) => worker
                .await
                .map_err(|e| StreamError::Worker(e.to_string()))?,
            None => Ok(()),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn close_cancels_worker() {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let worker = tokio::spawn(async move {
            token.cancelled().await;
            Ok(())
        });
        let subscription = Subscription::new(
            Environment::Paper,
            vec!["AAPL".to_string()],
            cancel.clone(),
            worker,
        );
        assert!(!subscription.is_closed());
        assert_eq!(subscription.symbols(), ["AAPL"]);
        tokio_test::assert_ok!(subscription.close().await);
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn drop_cancels_worker() {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let worker = tokio::spawn(async move {
            token.cancelled().await;
            Ok(())
        });
        drop(Subscription::new(Environment::Live, vec![], cancel.clone(), worker));
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn close_reports_worker_failure() {
        let worker = tokio::spawn(async { Err(StreamError::ConnectionClosed) });
        let subscription =
            Subscription::new(Environment::Paper, vec![], CancellationToken::new(), worker);
        assert!(matches!(
            subscription.close().await,
            Err(StreamError::ConnectionClosed)
        ));
    }
}
