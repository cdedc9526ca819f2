use rand::Rng;
use std::future::Future;
use tokio::time::Duration;

use crate::core::error::ApiError;

/// Bounded exponential back-off for vendor calls.
///
/// Rate-limit responses (HTTP 429) wait `base * 2^attempt` plus up to
/// `max_jitter` of random delay; network failures wait `base * 2^attempt`
/// without jitter. Every other error is returned immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_jitter: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts. Handy for tests against local servers.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt + 1` (attempt is 0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    fn jitter(&self) -> Duration {
        let max_us = self.max_jitter.as_micros() as u64;
        if max_us == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(rand::thread_rng().gen_range(0..max_us))
    }
}

pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut call: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 0;
    loop {
        let err = match call().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if attempt >= policy.max_retries {
            if err.is_rate_limit() {
                log::error!("{} rate limit exceeded after {} retries", label, policy.max_retries);
                return Err(ApiError::RateLimited { attempts: attempt + 1 });
            }
            return Err(err);
        }

        let delay = if err.is_rate_limit() {
            policy.delay(attempt) + policy.jitter()
        } else if err.is_transient() {
            policy.delay(attempt)
        } else {
            return Err(err);
        };

        log::warn!(
            "{} call failed ({}), retrying in {:?} (attempt {}/{})",
            label,
            err,
            delay,
            attempt + 1,
            policy.max_retries
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
