//! Utility functions and helpers.

pub mod text;
pub mod url;

use std::time::Duration;

use rand::Rng;

/// Random duration within `[min_ms, max_ms]`; zero when the range is empty.
pub fn jitter(min_ms: u64, max_ms: u64) -> Duration {
    if max_ms == 0 || max_ms < min_ms {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
}

/// Sleep for a random duration within `[min_ms, max_ms]`.
pub async fn pause(min_ms: u64, max_ms: u64) {
    let delay = jitter(min_ms, max_ms);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
