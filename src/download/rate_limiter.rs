//! Courtesy rate limiting between download starts.
//!
//! The catalog host asks bulk clients to pace themselves, so downloads are
//! spaced by a minimum interval measured from one download *start* to the
//! next. Measuring start-to-start (rather than end-to-start) keeps the
//! cadence independent of how long each transfer takes.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Enforces a minimum interval between consecutive download starts.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_start: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter with the given start-to-start interval.
    ///
    /// A zero interval disables pacing entirely.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_start: Mutex::new(None),
        }
    }

    /// Creates a limiter that never waits.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Whether pacing is active.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.interval.is_zero()
    }

    /// The configured start-to-start interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until the next download may start, then records the start time.
    ///
    /// The first call never waits. Subsequent calls sleep for whatever
    /// remains of the interval since the previous recorded start.
    pub async fn wait_turn(&self) {
        if !self.is_enabled() {
            return;
        }

        let mut last_start = self.last_start.lock().await;

        if let Some(previous) = *last_start {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                let remaining = self.interval - elapsed;
                debug!(wait_ms = remaining.as_millis() as u64, "Pacing next download");
                tokio::time::sleep(remaining).await;
            } else {
                trace!("Interval already elapsed, no wait needed");
            }
        }

        *last_start = Some(Instant::now());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_turn_is_immediate() {
                let limiter = RateLimiter::new(Duration::from_secs(2));

        let before = Instant::now();
        limiter.wait_turn().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_turn_waits_full_interval() {
                let limiter = RateLimiter::new(Duration::from_millis(1500));

        limiter.wait_turn().await;
        let before = Instant::now();
        limiter.wait_turn().await;

        assert_eq!(before.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_measured_from_previous_start() {
                let limiter = RateLimiter::new(Duration::from_secs(2));

        limiter.wait_turn().await;
        // Simulate a download that itself took part of the interval.
        tokio::time::advance(Duration::from_millis(1200)).await;

        let before = Instant::now();
        limiter.wait_turn().await;
        assert_eq!(before.elapsed(), Duration::from_millis(800));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_when_interval_already_elapsed() {
                let limiter = RateLimiter::new(Duration::from_secs(1));

        limiter.wait_turn().await;
        tokio::time::advance(Duration::from_secs(5)).await;

        let before = Instant::now();
        limiter.wait_turn().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_limiter_never_waits() {
                let limiter = RateLimiter::disabled();
        assert!(!limiter.is_enabled());

        let before = Instant::now();
        for _ in 0..5 {
            limiter.wait_turn().await;
        }
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cadence_over_several_turns() {
                let limiter = RateLimiter::new(Duration::from_secs(1));

        let start = Instant::now();
        for _ in 0..4 {
            limiter.wait_turn().await;
        }
        // Four starts at t=0, 1, 2, 3.
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }
}
