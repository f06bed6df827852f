//! HTTP transport with retry and exponential backoff
//!
//! 429 responses and network faults are retried on one shared budget; every
//! other non-success status fails on the spot.

use reqwest::{Client, Response, StatusCode};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{PubMedError, Result};
use crate::retry::{Backoff, RetryConfig, jittered};

/// What caused a retry, for diagnostics
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RetryCause {
    RateLimited,
    NetworkError,
}

impl RetryCause {
    fn describe(self) -> &'static str {
        match self {
            RetryCause::RateLimited => "Rate limited",
            RetryCause::NetworkError => "Network error",
        }
    }
}

/// GET-only HTTP transport used by the retriever
#[derive(Clone, Debug)]
pub struct Transport {
    client: Client,
    retry_config: RetryConfig,
}

impl Transport {
    pub fn new(client: Client, retry_config: RetryConfig) -> Self {
        Self {
            client,
            retry_config,
        }
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry_config
    }

    /// Issue a GET request, retrying rate limiting and network faults
    ///
    /// `context` only labels diagnostics and error messages.
    ///
    /// # Errors
    ///
    /// * `PubMedError::RateLimitExceeded` - still rate limited after `max_retry` retries
    /// * `PubMedError::HttpError` - any other non-success status, on the first occurrence
    /// * `PubMedError::RequestError` - network fault that outlived the retry budget
    pub async fn fetch_with_retry(&self, url: &str, context: Option<&str>) -> Result<Response> {
        let mut backoff = Backoff::new(&self.retry_config);

        loop {
            debug!("Making API request to: {}", url);

            let (cause, nominal) = match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    if status != StatusCode::TOO_MANY_REQUESTS {
                        warn!("API request failed with status: {}", status);
                        return Err(PubMedError::HttpError {
                            status: status.as_u16(),
                            status_text: status
                                .canonical_reason()
                                .unwrap_or("Unknown error")
                                .to_string(),
                            context: context.map(str::to_string),
                        });
                    }

                    match backoff.next_delay() {
                        Some(nominal) => (RetryCause::RateLimited, nominal),
                        None => {
                            return Err(PubMedError::RateLimitExceeded {
                                context: context.map(str::to_string),
                                retries: backoff.max_retry(),
                            });
                        }
                    }
                }
                Err(err) => {
                    let err = PubMedError::from(err);
                    if !err.is_retryable() {
                        return Err(err);
                    }
                    match backoff.next_delay() {
                        Some(nominal) => (RetryCause::NetworkError, nominal),
                        None => return Err(err),
                    }
                }
            };

            let delay = jittered(nominal);
            debug!(
                nominal_ms = u64::try_from(nominal.as_millis()).unwrap_or(u64::MAX),
                actual_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Backoff scheduled"
            );

            match context {
                Some(label) => warn!(
                    "{} ({}), retrying in {:.2}s (attempt {}/{})",
                    cause.describe(),
                    label,
                    delay.as_secs_f64(),
                    backoff.attempt(),
                    backoff.max_retry()
                ),
                None => warn!(
                    "{}, retrying in {:.2}s (attempt {}/{})",
                    cause.describe(),
                    delay.as_secs_f64(),
                    backoff.attempt(),
                    backoff.max_retry()
                ),
            }

            sleep(delay).await;
        }
    }
}
