//! Helpers for tests exercising the queues.
//!
//! Available with the `test-utils` feature.

// Assertions panic on failure by design of a test helper
#![allow(clippy::missing_panics_doc)]

use std::fmt::Debug;
use std::time::{Duration, SystemTime};

use tracing_subscriber::EnvFilter;

use crate::Queue;

/// Installs a test-writer subscriber once per test binary.
///
/// Honors `RUST_LOG`, defaulting to `warn`. Later calls are no-ops.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
}

/// Assert that a duration is within an acceptable range
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use airtime_queue::testing::assert_duration_in_range;
///
/// let actual = Duration::from_millis(105);
/// assert_duration_in_range(actual, Duration::from_millis(100), Duration::from_millis(10));
/// ```
pub fn assert_duration_in_range(actual: Duration, expected: Duration, tolerance: Duration) {
    let min = expected.saturating_sub(tolerance);
    let max = expected + tolerance;

    assert!(
        actual >= min && actual <= max,
        "Duration {:?} not in range [{:?}, {:?}]",
        actual,
        min,
        max
    );
}

/// Assert that two wall-clock times differ by at most `tolerance`
pub fn assert_time_near(actual: SystemTime, expected: SystemTime, tolerance: Duration) {
    let diff = match actual.duration_since(expected) {
        Ok(after) => after,
        Err(before) => before.duration(),
    };
    assert!(
        diff <= tolerance,
        "Time {:?} is {:?} away from {:?} (tolerance {:?})",
        actual,
        diff,
        expected,
        tolerance
    );
}

/// Assert that a collection is sorted
pub fn assert_sorted<T>(items: &[T])
where
    T: PartialOrd + Debug,
{
    for window in items.windows(2) {
        assert!(window[0] <= window[1], "Items not sorted: {:?} > {:?}", window[0], window[1]);
    }
}

/// Calls [`Queue::next`] `count` times, stopping early at `None`
pub fn drain<Q: Queue>(queue: &Q, count: usize) -> Vec<Q::Item> {
    (0..count).map_while(|_| queue.next()).collect()
}
