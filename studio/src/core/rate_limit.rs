use std::future::Future;
use std::sync::{Mutex, PoisonError};
use tokio::time::{Duration, Instant};

/// Minimum-interval gate shared by every outbound vendor call.
///
/// Best effort: it spaces calls out, it does not enforce a quota.
pub struct RateLimiter {
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(1000);

    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Reserves the next call slot and sleeps until it opens.
    pub async fn wait(&self) {
        let wait = {
            let mut next_slot = self.next_slot.lock().unwrap_or_else(PoisonError::into_inner);
            let now = Instant::now();
            let slot = match *next_slot {
                Some(slot) if slot > now => slot,
                _ => now,
            };
            *next_slot = Some(slot + self.min_interval);
            slot - now
        };

        if !wait.is_zero() {
            log::debug!("Rate limiter holding call for {:?}", wait);
            tokio::time::sleep(wait).await;
        }
    }

    pub async fn run<F, Fut, T>(&self, call: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.wait().await;
        call().await
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIN_INTERVAL)
    }
}
