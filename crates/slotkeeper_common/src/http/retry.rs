//! Resilient outbound transport.
//!
//! [`RetryTransport`] decorates any [`HttpTransport`] with bounded retries on
//! transient failures (connection errors, 429 and 5xx gateway statuses), using
//! exponential backoff with jitter. The backoff wait races the caller's
//! [`CancellationToken`], so a disconnected client or an expired deadline
//! stops retrying immediately.
//!
//! URLs may carry credentials in their path (Telegram puts the bot token
//! there). Logs only ever show [`log_target`], and transport errors leave
//! this module with their URL stripped.

use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, Request, Response, StatusCode, Url};
use slotkeeper_config::TransportConfig;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::TransportError;

const JITTER_MIN: f64 = 0.8;
const JITTER_MAX: f64 = 1.2;

/// A single outbound call primitive.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<Response, TransportError>;
}

#[async_trait]
impl HttpTransport for Client {
    async fn send(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<Response, TransportError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
            result = self.execute(request) => {
                result.map_err(|e| TransportError::Request(e.without_url()))
            }
        }
    }
}

/// Host and last path segment of `url`, safe to log.
pub fn log_target(url: &Url) -> String {
    let host = url.host_str().unwrap_or("-");
    let segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.collect())
        .unwrap_or_default();
    match segments.as_slice() {
        [] => host.to_string(),
        [only] => format!("{}/{}", host, only),
        [.., last] => format!("{}/.../{}", host, last),
    }
}

fn without_url(outcome: Result<Response, TransportError>) -> Result<Response, TransportError> {
    outcome.map_err(|err| match err {
        TransportError::Request(e) => TransportError::Request(e.without_url()),
        other => other,
    })
}

/// Statuses worth another attempt.
pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}

/// Network-level failures worth another attempt.
pub fn is_transient_error(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout() || err.is_request() || err.is_body()
}

fn is_retryable(outcome: &Result<Response, TransportError>) -> bool {
    match outcome {
        Ok(response) => is_retryable_status(response.status()),
        Err(TransportError::Request(e)) => is_transient_error(e),
        Err(TransportError::Cancelled) => false,
    }
}

/// Retry budget and backoff shape.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `0` disables retrying.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&TransportConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &TransportConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// `min(max_delay, base_delay * 2^attempt * jitter)` with jitter drawn from `[0.8, 1.2]`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let jitter = rand::rng().random_range(JITTER_MIN..=JITTER_MAX);
        self.backoff_with_jitter(attempt, jitter)
    }

    pub(crate) fn backoff_with_jitter(&self, attempt: u32, jitter: f64) -> Duration {
        let factor = 2f64.powi(attempt.min(62) as i32);
        let secs = (self.base_delay.as_secs_f64() * factor * jitter)
            .min(self.max_delay.as_secs_f64())
            .max(0.0);
        Duration::from_secs_f64(secs)
    }
}

/// Decorator adding bounded retries to an inner transport.
#[derive(Debug, Clone)]
pub struct RetryTransport<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: HttpTransport> RetryTransport<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<T: HttpTransport> HttpTransport for RetryTransport<T> {
    async fn send(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<Response, TransportError> {
        let endpoint = log_target(request.url());
        let mut attempt: u32 = 0;
        loop {
            let Some(this_try) = request.try_clone() else {
                debug!(endpoint = %endpoint, "request body is not cloneable, sending once");
                return without_url(self.inner.send(request, cancel).await);
            };

            let outcome = without_url(self.inner.send(this_try, cancel).await);
            if attempt >= self.policy.max_retries || !is_retryable(&outcome) {
                return outcome;
            }

            let delay = self.policy.backoff(attempt);
            match &outcome {
                Ok(response) => warn!(
                    endpoint = %endpoint,
                    attempt = attempt + 1,
                    status = response.status().as_u16(),
                    delay_ms = delay.as_millis() as u64,
                    "transient upstream status, retrying"
                ),
                Err(e) => warn!(
                    endpoint = %endpoint,
                    attempt = attempt + 1,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "transient upstream failure, retrying"
                ),
            }
            // Discard the failed response before waiting.
            drop(outcome);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransportError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}
