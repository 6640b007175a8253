//! Minimum spacing between outbound chat API calls.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Shared by every generation attempt in a run. Callers waiting in
/// [`RateLimiter::acquire`] are released in FIFO order, each at least
/// `interval` after the previous one.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_release: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn per_minute(limit: u32) -> Self {
        let interval = if limit == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(60) / limit
        };
        Self::with_interval(interval)
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            last_release: Mutex::new(None),
        }
    }

    /// A limiter that never waits.
    pub fn unlimited() -> Self {
        Self::with_interval(Duration::ZERO)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn acquire(&self) {
        // tokio's Mutex is fair, so waiters queue in arrival order
        let mut last = self.last_release.lock().await;
        if let Some(previous) = *last {
            sleep_until(previous + self.interval).await;
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_per_minute_interval() {
        assert_eq!(
            RateLimiter::per_minute(15).interval(),
            Duration::from_secs(4)
        );
        assert_eq!(
            RateLimiter::per_minute(120).interval(),
            Duration::from_millis(500)
        );
        assert_eq!(RateLimiter::per_minute(0).interval(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_acquire_does_not_wait() {
        let limiter = RateLimiter::per_minute(15);
        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(Instant::now(), start);
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_acquires_are_spaced() {
        let limiter = RateLimiter::per_minute(15);
        let mut releases = Vec::new();
        for _ in 0..4 {
            limiter.acquire().await;
            releases.push(Instant::now());
        }
        for pair in releases.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(4));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_time_counts_toward_interval() {
        let limiter = RateLimiter::per_minute(15);
        limiter.acquire().await;
        tokio::time::advance(Duration::from_secs(10)).await;
        let before = Instant::now();
        limiter.acquire().await;
        assert_eq!(Instant::now(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_spacing() {
        let limiter = Arc::new(RateLimiter::with_interval(Duration::from_millis(500)));
        let mut handles = Vec::new();
        for _ in 0..3 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                Instant::now()
            }));
        }
        let mut releases = Vec::new();
        for handle in handles {
            releases.push(handle.await.unwrap());
        }
        releases.sort();
        for pair in releases.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(500));
        }
    }

    #[tokio::test]
    async fn test_unlimited_never_waits() {
        let limiter = RateLimiter::unlimited();
        let start = std::time::Instant::now();
        for _ in 0..100 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
