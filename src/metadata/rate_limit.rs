//! Minimum-spacing rate limiter for outbound catalog calls.
//!
//! Pacing is a `governor` GCRA limiter with a burst of one, so permits leave
//! at least `min_interval` apart. Concurrent callers that are refused sleep
//! until the instant governor reports and then try again.
//!
//! Time comes from a [`Clock`], which lets tests drive the limiter without
//! real sleeps.

use async_trait::async_trait;
use governor::middleware::NoOpMiddleware;
use governor::nanos::Nanos;
use governor::state::{InMemoryState, NotKeyed};
use governor::Quota;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Source of time for the limiter.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}

/// Clock backed by the tokio timer.
///
/// Under `#[tokio::test(start_paused = true)]` this clock auto-advances, so
/// it doubles as a controllable clock in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Presents a [`Clock`] to governor as nanoseconds since the limiter was built.
#[derive(Clone)]
struct PacingClock {
    inner: Arc<dyn Clock>,
    origin: Instant,
}

impl governor::clock::Clock for PacingClock {
    type Instant = Nanos;

    fn now(&self) -> Nanos {
        Nanos::from(self.inner.now().saturating_duration_since(self.origin))
    }
}

type DirectLimiter =
    governor::RateLimiter<NotKeyed, InMemoryState, PacingClock, NoOpMiddleware<Nanos>>;

/// Enforces a minimum spacing between permits.
pub struct RateLimiter {
    clock: PacingClock,
    limiter: DirectLimiter,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self::with_clock(min_interval, Arc::new(TokioClock))
    }

    pub fn with_clock(min_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        let quota = Quota::with_period(min_interval)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MAX));
        let clock = PacingClock {
            origin: clock.now(),
            inner: clock,
        };
        let limiter = governor::RateLimiter::direct_with_clock(quota, &clock);
        Self { clock, limiter }
    }

    /// Sleep on the limiter's clock.
    pub async fn sleep(&self, duration: Duration) {
        self.clock.inner.sleep(duration).await;
    }

    /// Wait until a call is allowed.
    pub async fn acquire(&self) {
        while let Err(not_until) = self.limiter.check() {
            let wait = not_until.wait_time_from(governor::clock::Clock::now(&self.clock));
            tracing::trace!(wait_ms = wait.as_millis() as u64, "Rate limiter waiting");
            self.clock.inner.sleep(wait).await;
        }
    }
}

/// Manually advanced clock for tests.
///
/// `sleep` advances the clock by the requested duration instead of waiting,
/// and every call is recorded.
#[cfg(test)]
pub(crate) struct ManualClock {
    now: parking_lot::Mutex<Instant>,
    pub(crate) sleeps: parking_lot::Mutex<Vec<Duration>>,
}

#[cfg(test)]
impl ManualClock {
    pub(crate) fn new() -> Self {
        Self {
            now: parking_lot::Mutex::new(Instant::now()),
            sleeps: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    pub(crate) fn total_slept(&self) -> Duration {
        self.sleeps.lock().iter().sum()
    }
}

#[cfg(test)]
#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_call_does_not_wait() {
        let clock = Arc::new(ManualClock::new());
        let limiter = RateLimiter::with_clock(Duration::from_millis(200), clock.clone());

        limiter.acquire().await;
        assert_eq!(clock.total_slept(), Duration::ZERO);
    }

    #[tokio::test]
    async fn sequential_calls_are_spaced() {
        let clock = Arc::new(ManualClock::new());
        let limiter = RateLimiter::with_clock(Duration::from_millis(200), clock.clone());
        let start = clock.now();

        for _ in 0..5 {
            limiter.acquire().await;
        }

        assert!(clock.now() - start >= Duration::from_millis(4 * 200));
        assert_eq!(clock.sleeps.lock().len(), 4);
    }

    #[tokio::test]
    async fn elapsed_time_counts_toward_interval() {
        let clock = Arc::new(ManualClock::new());
        let limiter = RateLimiter::with_clock(Duration::from_millis(200), clock.clone());

        limiter.acquire().await;
        clock.advance(Duration::from_millis(150));
        limiter.acquire().await;
        assert_eq!(clock.total_slept(), Duration::from_millis(50));

        // Idle time does not bank extra permits.
        clock.advance(Duration::from_secs(1));
        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(clock.total_slept(), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_are_serialized() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(200)));
        let start = Instant::now();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    limiter.acquire().await;
                    Instant::now()
                })
            })
            .collect();

        let mut times = Vec::new();
        for handle in handles {
            times.push(handle.await.unwrap());
        }
        times.sort();

        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(200));
        }
        assert!(times[3] - start >= Duration::from_millis(600));
    }
}
