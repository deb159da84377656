//! HTTP transport with retry logic.
//!
//! Adds the Alpaca auth headers, decodes JSON bodies and maps failing
//! statuses onto [`ProviderError`]. With the default [`RetryConfig`] every
//! request is attempted once.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;

use super::api_types::AlpacaErrorResponse;
use crate::error::ProviderError;
use crate::infrastructure::config::{AlpacaConfig, Credentials, RetryConfig};
use crate::infrastructure::metrics;

/// Which Alpaca host a request goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Api {
    /// Trading API (`base_url`).
    Trading,
    /// Market data API (`data_url`).
    Data,
}

/// HTTP client for the Alpaca REST APIs.
#[derive(Debug, Clone)]
pub struct AlpacaHttpClient {
    client: Client,
    credentials: Credentials,
    trading_base_url: String,
    data_base_url: String,
    retry_config: RetryConfig,
}

impl AlpacaHttpClient {
    /// Create a new HTTP client from config.
    pub fn new(config: &AlpacaConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        Ok(Self {
            client,
            credentials: config.credentials.clone(),
            trading_base_url: config.base_url.clone(),
            data_base_url: config.data_url.clone(),
            retry_config: config.retry.clone(),
        })
    }

    /// GET `path` on the trading API.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}{path}", self.trading_base_url);
        self.request(Api::Trading, &url, path, query).await
    }

    /// GET `path` on the market data API.
    pub async fn data_get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}{path}", self.data_base_url);
        self.request(Api::Data, &url, path, query).await
    }

    /// GET on the market data API with the path built from `segments`.
    ///
    /// Each segment is percent-encoded, so caller-supplied values such as
    /// symbols cannot change the request target.
    pub async fn data_get_segments<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = join_segments(&self.data_base_url, segments)?;
        self.request(Api::Data, url.as_str(), url.path(), query).await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        api: Api,
        url: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let mut backoff = ExponentialBackoff::new(&self.retry_config);

        loop {
            metrics::record_request(api_label(api));

            let sent = self
                .client
                .get(url)
                .header("APCA-API-KEY-ID", self.credentials.api_key())
                .header("APCA-API-SECRET-KEY", self.credentials.api_secret())
                .query(query)
                .send()
                .await;

            let response = match sent {
                Ok(resp) => resp,
                Err(e) => {
                    if let Some(delay) = backoff.next_backoff() {
                        tracing::warn!(
                            error = %e,
                            delay_ms = delay.as_millis(),
                            attempt = backoff.attempt,
                            "Network error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(backoff.exhausted(ProviderError::Network(e.to_string())));
                }
            };

            let status = response.status();

            if status.is_success() {
                let text = response.text().await?;
                return serde_json::from_str(&text).map_err(ProviderError::from);
            }

            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());

            let error_body = response.text().await.unwrap_or_default();

            let (error_code, error_message) =
                match serde_json::from_str::<AlpacaErrorResponse>(&error_body) {
                    Ok(err) => (
                        err.code_string()
                            .unwrap_or_else(|| status.as_u16().to_string()),
                        err.message,
                    ),
                    Err(_) => (status.as_u16().to_string(), error_body),
                };

            match categorize_status(status) {
                ErrorCategory::RateLimited => {
                    if let Some(delay) = backoff.next_backoff() {
                        let delay = retry_after.map_or(delay, Duration::from_secs);
                        tracing::warn!(
                            code = %error_code,
                            delay_ms = delay.as_millis(),
                            "Rate limited, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(ProviderError::RateLimited {
                        retry_after_secs: retry_after.unwrap_or(60),
                    });
                }
                ErrorCategory::Retryable => {
                    if let Some(delay) = backoff.next_backoff() {
                        tracing::warn!(
                            code = %error_code,
                            message = %error_message,
                            delay_ms = delay.as_millis(),
                            "Retryable error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(backoff.exhausted(ProviderError::Api {
                        status: error_code,
                        message: error_message,
                    }));
                }
                ErrorCategory::NonRetryable => {
                    return Err(match status {
                        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                            ProviderError::AuthenticationFailed
                        }
                        StatusCode::NOT_FOUND => ProviderError::NotFound(path.to_string()),
                        _ => ProviderError::Api {
                            status: error_code,
                            message: error_message,
                        },
                    });
                }
            }
        }
    }
}

fn join_segments(base_url: &str, segments: &[&str]) -> Result<Url, ProviderError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| ProviderError::InvalidInput(format!("invalid base URL {base_url}: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| ProviderError::InvalidInput(format!("base URL cannot hold a path: {base_url}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

const fn api_label(api: Api) -> &'static str {
    match api {
        Api::Trading => "trading",
        Api::Data => "data",
    }
}

/// Error category for determining retry behavior.
#[derive(Debug, PartialEq, Eq)]
enum ErrorCategory {
    RateLimited,
    Retryable,
    NonRetryable,
}

/// Categorize HTTP status code for retry handling.
const fn categorize_status(status: StatusCode) -> ErrorCategory {
    match status.as_u16() {
        429 => ErrorCategory::RateLimited,
        408 | 500 | 502 | 503 | 504 => ErrorCategory::Retryable,
        _ => ErrorCategory::NonRetryable,
    }
}

/// Exponential backoff calculator.
struct ExponentialBackoff {
    attempt: u32,
    max_attempts: u32,
    current_backoff: Duration,
    max_backoff: Duration,
    multiplier: f64,
}

impl ExponentialBackoff {
    const fn new(config: &RetryConfig) -> Self {
        Self {
            attempt: 0,
            max_attempts: config.max_attempts,
            current_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
            multiplier: config.multiplier,
        }
    }

    /// Record a failed attempt; the delay before the next one, if any remain.
    fn next_backoff(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.attempt >= self.max_attempts {
            return None;
        }

        let backoff = self.current_backoff;
        self.current_backoff = Duration::from_secs_f64(
            (self.current_backoff.as_secs_f64() * self.multiplier)
                .min(self.max_backoff.as_secs_f64()),
        );

        Some(backoff)
    }

    /// Final error once the budget is spent. A single-attempt policy reports
    /// the underlying failure unchanged.
    fn exhausted(&self, last: ProviderError) -> ProviderError {
        if self.max_attempts <= 1 {
            last
        } else {
            ProviderError::MaxRetriesExceeded {
                attempts: self.attempt,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(StatusCode::TOO_MANY_REQUESTS, ErrorCategory::RateLimited ; "429")]
    #[test_case(StatusCode::INTERNAL_SERVER_ERROR, ErrorCategory::Retryable ; "500")]
    #[test_case(StatusCode::BAD_GATEWAY, ErrorCategory::Retryable ; "502")]
    #[test_case(StatusCode::SERVICE_UNAVAILABLE, ErrorCategory::Retryable ; "503")]
    #[test_case(StatusCode::REQUEST_TIMEOUT, ErrorCategory::Retryable ; "408")]
    #[test_case(StatusCode::BAD_REQUEST, ErrorCategory::NonRetryable ; "400")]
    #[test_case(StatusCode::NOT_FOUND, ErrorCategory::NonRetryable ; "404")]
    #[test_case(StatusCode::UNAUTHORIZED, ErrorCategory::NonRetryable ; "401")]
    fn categorizes_status(status: StatusCode, expected: ErrorCategory) {
        assert_eq!(categorize_status(status), expected);
    }

    #[test]
    fn segments_are_percent_encoded() {
        let url = join_segments(
            "https://data.alpaca.markets",
            &["v2", "stocks", "BRK/B?x=1", "quotes", "latest"],
        )
        .unwrap();
        assert_eq!(url.path(), "/v2/stocks/BRK%2FB%3Fx=1/quotes/latest");
        assert_eq!(url.query(), None);
    }

    #[test]
    fn single_attempt_never_backs_off() {
        let mut backoff = ExponentialBackoff::new(&RetryConfig::default());
        assert_eq!(backoff.next_backoff(), None);
        assert_eq!(
            backoff.exhausted(ProviderError::Network("reset".into())),
            ProviderError::Network("reset".into())
        );
    }

    #[test]
    fn exponential_backoff_increments() {
        let config = RetryConfig {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(300),
            multiplier: 2.0,
        };
        let mut backoff = ExponentialBackoff::new(&config);
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(200)));
        assert!(backoff.next_backoff().is_some());
        assert_eq!(backoff.next_backoff(), None);
        assert_eq!(
            backoff.exhausted(ProviderError::Network("reset".into())),
            ProviderError::MaxRetriesExceeded { attempts: 4 }
        );
    }
}
