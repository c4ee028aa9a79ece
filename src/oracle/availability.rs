use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Time source for the availability cache.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Last probe result, reused until `ttl` has elapsed.
pub struct AvailabilityCache {
    ttl: Duration,
    clock: Box<dyn Clock>,
    state: Mutex<Option<(Instant, bool)>>,
}

impl AvailabilityCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }

    pub fn with_clock(ttl: Duration, clock: impl Clock + 'static) -> Self {
        Self {
            ttl,
            clock: Box::new(clock),
            state: Mutex::new(None),
        }
    }

    /// Cached availability, running `probe` when nothing fresh is cached.
    ///
    /// The lock is not held while probing, so concurrent callers may probe
    /// twice; the last result stored wins.
    pub fn check(&self, probe: impl FnOnce() -> bool) -> bool {
        let now = self.clock.now();
        if let Some((checked_at, available)) = *self.lock() {
            if now.saturating_duration_since(checked_at) < self.ttl {
                return available;
            }
        }
        let available = probe();
        tracing::debug!(available, "availability probed");
        *self.lock() = Some((now, available));
        available
    }

    fn lock(&self) -> MutexGuard<'_, Option<(Instant, bool)>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
