use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tracing::debug;

/// A source of the current time in milliseconds since the Unix epoch.
///
/// Injected so the timing-sensitive paths (rate limiting, cache freshness)
/// stay deterministic under test.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// The wall clock used outside of tests.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        chrono::Utc::now().timestamp_millis() as u64
    }
}

/// An injectable asynchronous sleep. Production uses [`tokio_sleep`]; tests
/// substitute a recording no-op so no wall-clock time passes.
pub type SleepFn = Arc<dyn Fn(Duration) -> BoxFuture<'static, ()> + Send + Sync>;

/// The default sleeper, backed by the tokio timer.
pub fn tokio_sleep() -> SleepFn {
    Arc::new(|duration| Box::pin(tokio::time::sleep(duration)))
}

/// Enforces a minimum spacing between outbound fetches.
///
/// The last-request timestamp is stamped after every physical request, on
/// success and failure alike, so a failed fetch still consumes rate budget.
pub struct RateLimiter {
    min_spacing: Duration,
    last_request: Mutex<Option<u64>>,
    clock: Arc<dyn Clock>,
    sleep: SleepFn,
}

impl RateLimiter {
    pub fn new(min_spacing: Duration, clock: Arc<dyn Clock>, sleep: SleepFn) -> Self {
        Self {
            min_spacing,
            last_request: Mutex::new(None),
            clock,
            sleep,
        }
    }

    /// Suspends the caller until the minimum spacing since the last recorded
    /// request has elapsed. Returns immediately when no request was recorded
    /// yet or the spacing has already passed.
    pub async fn acquire(&self) {
        let wait = {
            let last = self.last_request.lock().await;
            last.and_then(|stamp| {
                let elapsed = self.clock.now_millis().saturating_sub(stamp);
                let min = self.min_spacing.as_millis() as u64;
                (elapsed < min).then(|| Duration::from_millis(min - elapsed))
            })
        };

        if let Some(wait) = wait {
            debug!(wait_ms = wait.as_millis() as u64, "spacing out requests");
            (self.sleep)(wait).await;
        }
    }

    /// Stamps the last-request timestamp with the current time.
    pub async fn record(&self) {
        *self.last_request.lock().await = Some(self.clock.now_millis());
    }

    /// Milliseconds since the last recorded request, if any.
    pub async fn millis_since_last(&self) -> Option<u64> {
        self.last_request
            .lock()
            .await
            .map(|stamp| self.clock.now_millis().saturating_sub(stamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex as StdMutex;

    struct TestClock(AtomicU64);

    impl TestClock {
        fn advance(&self, millis: u64) {
            self.0.fetch_add(millis, Ordering::SeqCst);
        }
    }

    impl Clock for TestClock {
        fn now_millis(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn recording_sleep(slept: Arc<StdMutex<Vec<u64>>>) -> SleepFn {
        Arc::new(move |duration| {
            slept.lock().unwrap().push(duration.as_millis() as u64);
            Box::pin(async {})
        })
    }

    #[tokio::test]
    async fn first_acquire_does_not_sleep() {
        let slept = Arc::new(StdMutex::new(Vec::new()));
        let limiter = RateLimiter::new(
            Duration::from_millis(10_000),
            Arc::new(TestClock(AtomicU64::new(50_000))),
            recording_sleep(slept.clone()),
        );

        limiter.acquire().await;

        assert!(slept.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn acquire_sleeps_for_the_remaining_spacing() {
        let slept = Arc::new(StdMutex::new(Vec::new()));
        let clock = Arc::new(TestClock(AtomicU64::new(0)));
        let limiter = RateLimiter::new(
            Duration::from_millis(10_000),
            clock.clone(),
            recording_sleep(slept.clone()),
        );

        limiter.record().await;
        clock.advance(3_000);
        limiter.acquire().await;

        assert_eq!(*slept.lock().unwrap(), vec![7_000]);
    }

    #[tokio::test]
    async fn acquire_is_free_once_spacing_has_passed() {
        let slept = Arc::new(StdMutex::new(Vec::new()));
        let clock = Arc::new(TestClock(AtomicU64::new(0)));
        let limiter = RateLimiter::new(
            Duration::from_millis(10_000),
            clock.clone(),
            recording_sleep(slept.clone()),
        );

        limiter.record().await;
        clock.advance(10_000);
        limiter.acquire().await;

        assert!(slept.lock().unwrap().is_empty());
        assert_eq!(limiter.millis_since_last().await, Some(10_000));
    }
}
