// src/utils/retry.rs

//! Bounded-retry request execution.
//!
//! - HTTP 429: exponential backoff (`base`, `2 * base`, `4 * base`, ...), then
//!   [`AppError::RateLimited`].
//! - Timeouts, connection failures and 5xx: linear backoff (`base * n`), then
//!   [`AppError::TransportFailure`] with the last cause.
//! - Any other non-2xx status fails at once with [`AppError::UpstreamStatus`],
//!   keeping the first [`BODY_EXCERPT_CHARS`] characters of the body.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::HttpConfig;
use crate::utils::http::{HttpRequest, HttpResponse, HttpTransport};

const TOO_MANY_REQUESTS: u16 = 429;

/// Body characters kept on a non-retryable status.
pub const BODY_EXCERPT_CHARS: usize = 1024;

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_CHARS).collect()
}

/// Something that can wait.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Attempt ceiling and backoff schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries, the first one included
    pub max_attempts: u32,
    pub rate_limit_base_delay: Duration,
    pub transient_base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&HttpConfig::default())
    }
}

impl From<&HttpConfig> for RetryPolicy {
    fn from(config: &HttpConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            rate_limit_base_delay: Duration::from_millis(config.rate_limit_base_delay_ms),
            transient_base_delay: Duration::from_millis(config.transient_base_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Wait before retry number `retry` (1-based) after a 429.
    pub fn rate_limit_delay(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.rate_limit_base_delay.saturating_mul(factor)
    }

    /// Wait before retry number `retry` (1-based) after a transient failure.
    pub fn transient_delay(&self, retry: u32) -> Duration {
        self.transient_base_delay.saturating_mul(retry)
    }
}

/// Executes requests with the retry policy; shared by crawlers and the rating client.
#[derive(Clone)]
pub struct RetryingHttpClient {
    transport: Arc<dyn HttpTransport>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
}

impl RetryingHttpClient {
    pub fn new(transport: Arc<dyn HttpTransport>, policy: RetryPolicy) -> Self {
        Self::with_sleeper(transport, policy, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(
        transport: Arc<dyn HttpTransport>,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            transport,
            sleeper,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The sleeper backoff waits go through.
    pub fn sleeper(&self) -> &dyn Sleeper {
        self.sleeper.as_ref()
    }

    /// Send `request`, replaying it per the retry policy.
    pub async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let target = request.describe();
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let (delay, failure) = match self.transport.send(request).await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) if response.status == TOO_MANY_REQUESTS => {
                    if attempt >= max_attempts {
                        log::warn!("Rate limited by {} on every attempt ({})", target, attempt);
                        return Err(AppError::RateLimited {
                            url: target,
                            attempts: attempt,
                        });
                    }
                    (self.policy.rate_limit_delay(attempt), "HTTP 429".to_string())
                }
                Ok(response) if response.status >= 500 => {
                    let cause = format!("HTTP {}", response.status);
                    if attempt >= max_attempts {
                        return Err(AppError::TransportFailure {
                            url: target,
                            attempts: attempt,
                            message: cause,
                        });
                    }
                    (self.policy.transient_delay(attempt), cause)
                }
                Ok(response) => {
                    return Err(AppError::UpstreamStatus {
                        url: target,
                        status: response.status,
                        body: excerpt(&response.body),
                    });
                }
                Err(e) if !e.is_transient() => {
                    return Err(AppError::TransportFailure {
                        url: target,
                        attempts: attempt,
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    if attempt >= max_attempts {
                        return Err(AppError::TransportFailure {
                            url: target,
                            attempts: attempt,
                            message: e.to_string(),
                        });
                    }
                    (self.policy.transient_delay(attempt), e.to_string())
                }
            };

            log::warn!(
                "{} from {} (attempt {}/{}), retrying in {:.1}s",
                failure,
                target,
                attempt,
                max_attempts,
                delay.as_secs_f64()
            );
            self.sleeper.sleep(delay).await;
            attempt += 1;
        }
    }
}
