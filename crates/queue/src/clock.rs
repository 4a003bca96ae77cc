//! Time abstraction used by the time-ordered queues.
//!
//! Every decision that depends on "now" (whether a head item is due, where
//! `schedule_asap` starts its scan) goes through a [`Clock`], so that tests
//! can pin the current time with a [`MockClock`].
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use airtime_queue::clock::{Clock, MockClock, SystemClock};
//!
//! // Use system clock in production
//! let clock = SystemClock;
//! let _now = clock.system_time();
//!
//! // Use mock clock in tests
//! let mock = MockClock::new();
//! let start = mock.system_time();
//! mock.advance(Duration::from_secs(5));
//! assert_eq!(mock.system_time().duration_since(start).unwrap(), Duration::from_secs(5));
//! ```

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Trait for time operations to enable testing
pub trait Clock: Send + Sync + 'static {
    /// Get current instant (monotonic time)
    ///
    /// The queues never read it; due checks and `schedule_asap` use
    /// [`Clock::system_time`] only. Kept for callers timing their own work.
    fn now(&self) -> Instant;

    /// Get current system time (wall clock)
    ///
    /// Item times are wall-clock values, so this is what the queues compare
    /// against.
    fn system_time(&self) -> SystemTime;

    /// Get nanoseconds since UNIX epoch
    fn nanos_since_epoch(&self) -> i128 {
        unix_nanos(self.system_time())
    }
}

/// Real system clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

impl<T: Clock> Clock for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn system_time(&self) -> SystemTime {
        (**self).system_time()
    }
}

/// Mock clock for deterministic testing
///
/// The clock starts at the current real time and only moves when advanced.
/// Clones share the same elapsed time.
///
/// Queues still block for real: a waiter sleeps for the distance between an
/// item's time and this clock's reading. Use it for decisions that must be
/// exact (conflict queries, `schedule_asap`, due items), not for waits.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    elapsed: Arc<Mutex<Duration>>,
    base_system_time: SystemTime,
}

impl MockClock {
    /// Create a new mock clock anchored at the current real time
    pub fn new() -> Self {
        Self::starting_at(SystemTime::now())
    }

    /// Create a mock clock whose wall-clock reading starts at `base`
    pub fn starting_at(base: SystemTime) -> Self {
        Self {
            start: Instant::now(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
            base_system_time: base,
        }
    }

    /// Advance the mock clock by a duration
    pub fn advance(&self, duration: Duration) {
        *self.lock() += duration;
    }

    /// Set the mock clock to a specific elapsed time
    pub fn set_elapsed(&self, duration: Duration) {
        *self.lock() = duration;
    }

    /// Get the current elapsed time
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, Duration> {
        match self.elapsed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        saturating_add(self.base_system_time, self.elapsed())
    }
}

/// Adds `duration` to `time`, clamping at the latest representable instant.
///
/// A window too long to end before that limit is treated as never ending.
#[must_use]
pub(crate) fn saturating_add(time: SystemTime, duration: Duration) -> SystemTime {
    if let Some(end) = time.checked_add(duration) {
        return end;
    }
    let mut end = time;
    let mut step = duration;
    while !step.is_zero() {
        match end.checked_add(step) {
            Some(next) => end = next,
            None => step /= 2,
        }
    }
    end
}

/// Converts a wall-clock time to signed nanoseconds since the UNIX epoch.
///
/// Times before the epoch map to negative values.
#[must_use]
pub fn unix_nanos(time: SystemTime) -> i128 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(since) => since.as_nanos() as i128,
        Err(err) => -(err.duration().as_nanos() as i128),
    }
}
