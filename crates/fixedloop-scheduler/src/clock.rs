//! Monotonic clock abstraction.
//!
//! The driver reads time and waits only through [`Clock`], so the same loop
//! runs against the OS clock in production and against [`ManualClock`] in
//! deterministic tests and simulations.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Source of monotonic time plus the two primitive ways of waiting on it.
pub trait Clock {
    /// Current monotonic instant
    fn now(&self) -> Instant;

    /// Block the calling thread until `deadline`
    ///
    /// Must return immediately when `deadline` is not in the future.
    fn sleep_until(&self, deadline: Instant);

    /// Give up the rest of the current time slice
    fn yield_now(&self);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep_until(&self, deadline: Instant) {
        (**self).sleep_until(deadline);
    }

    fn yield_now(&self) {
        (**self).yield_now();
    }
}

/// The operating system's monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep_until(&self, deadline: Instant) {
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline.duration_since(now));
        }
    }

    #[inline]
    fn yield_now(&self) {
        std::thread::yield_now();
    }
}

/// Default amount a [`ManualClock`] advances per `yield_now`.
pub const DEFAULT_YIELD_STEP: Duration = Duration::from_micros(1);

/// Hand-driven clock for tests and simulations.
///
/// Time only moves when told to: [`advance`](ManualClock::advance) moves it
/// explicitly, `sleep_until` jumps straight to the deadline, and `yield_now`
/// steps forward by a fixed amount so busy-waits terminate. Clones share one
/// timeline, so a callback can hold a clone and simulate its own cost.
///
/// ```
/// use fixedloop_scheduler::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// let t0 = clock.now();
/// clock.advance(Duration::from_millis(5));
/// assert_eq!(clock.now() - t0, Duration::from_millis(5));
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset_ns: Arc<AtomicU64>,
    yield_step: Duration,
    sleeps: Arc<AtomicU64>,
    yields: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock anchored at the current instant
    pub fn new() -> Self {
        Self::with_yield_step(DEFAULT_YIELD_STEP)
    }

    /// Create a clock whose `yield_now` advances by `yield_step`
    ///
    /// A zero step is bumped to one nanosecond so busy-waits always finish.
    pub fn with_yield_step(yield_step: Duration) -> Self {
        Self {
            origin: Instant::now(),
            offset_ns: Arc::new(AtomicU64::new(0)),
            yield_step: yield_step.max(Duration::from_nanos(1)),
            sleeps: Arc::new(AtomicU64::new(0)),
            yields: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        let by_ns = duration_to_ns(by);
        // Saturating add; the closure never returns None so the update cannot fail.
        let _previous = self
            .offset_ns
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_add(by_ns))
            });
    }

    /// Time elapsed since the clock was created
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.offset_ns.load(Ordering::Acquire))
    }

    /// Number of `sleep_until` calls that actually moved time
    pub fn sleep_count(&self) -> u64 {
        self.sleeps.load(Ordering::Relaxed)
    }

    /// Number of `yield_now` calls
    pub fn yield_count(&self) -> u64 {
        self.yields.load(Ordering::Relaxed)
    }

    fn offset_of(&self, instant: Instant) -> u64 {
        duration_to_ns(instant.saturating_duration_since(self.origin))
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin
            .checked_add(self.elapsed())
            .unwrap_or(self.origin)
    }

    fn sleep_until(&self, deadline: Instant) {
        let target = self.offset_of(deadline);
        let previous = self.offset_ns.fetch_max(target, Ordering::AcqRel);
        if target > previous {
            self.sleeps.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn yield_now(&self) {
        self.yields.fetch_add(1, Ordering::Relaxed);
        self.advance(self.yield_step);
    }
}

fn duration_to_ns(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}
