//! Bounded, rate-limited retries around one fallible attempt.

use std::fmt::Display;
use std::future::Future;
use tracing::{error, warn};

use crate::limiter::RateLimiter;

/// Run `attempt` up to `max_attempts` times, acquiring `limiter` before each
/// try. Failures are logged and swallowed; `None` means every try failed.
pub async fn with_retry<T, E, F, Fut>(
    limiter: &RateLimiter,
    max_attempts: usize,
    label: &str,
    mut attempt: F,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    for n in 1..=max_attempts {
        limiter.acquire().await;
        match attempt().await {
            Ok(value) => return Some(value),
            Err(e) => warn!("{}: attempt {}/{} failed: {}", label, n, max_attempts, e),
        }
    }

    error!("{}: giving up after {} attempts", label, max_attempts);
    None
}
