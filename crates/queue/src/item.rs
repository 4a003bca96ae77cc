//! Items carried by the time-ordered queues.
//!
//! A [`JitItem`] pairs a payload with the wall-clock instant from which it may
//! be delivered. A [`ScheduleItem`] additionally occupies an exclusive
//! [`Window`] of `duration` starting at that instant, optionally anchored to a
//! hardware `timestamp` counter.
//!
//! # Interval arithmetic
//!
//! Windows are compared in signed nanoseconds. When *both* windows carry a
//! timestamp, the timestamps are the start points; otherwise the wall-clock
//! times are. Two half-open windows `[s1, e1)` and `[s2, e2)` conflict iff
//! `!(e1 <= s2) && !(e2 <= s1)`, so back-to-back windows do not conflict.

use std::time::{Duration, SystemTime};

use crate::clock::{saturating_add, unix_nanos};

/// A payload scheduled for delivery at `time`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JitItem<T> {
    payload: T,
    time: SystemTime,
}

impl<T> JitItem<T> {
    /// Wraps `payload` for delivery at `time`.
    pub fn new(payload: T, time: SystemTime) -> Self {
        Self { payload, time }
    }

    /// The instant from which the item may be delivered.
    #[must_use]
    pub fn time(&self) -> SystemTime {
        self.time
    }

    /// Borrows the payload.
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Unwraps the payload.
    pub fn into_payload(self) -> T {
        self.payload
    }
}

/// An exclusive-use interval `[start, start + duration)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Window {
    /// Wall-clock start
    pub time: SystemTime,
    /// Length of the exclusive use
    pub duration: Duration,
    /// Hardware counter start in nanoseconds, preferred over `time` when the
    /// other side of a comparison has one too
    pub timestamp: Option<i64>,
}

impl Window {
    /// A window anchored to wall-clock time only.
    #[must_use]
    pub fn new(time: SystemTime, duration: Duration) -> Self {
        Self { time, duration, timestamp: None }
    }

    /// A window that also carries a hardware timestamp.
    #[must_use]
    pub fn with_timestamp(time: SystemTime, timestamp: i64, duration: Duration) -> Self {
        Self { time, duration, timestamp: Some(timestamp) }
    }

    /// Wall-clock end of the window, clamped to the latest representable
    /// instant.
    #[must_use]
    pub fn end_time(&self) -> SystemTime {
        saturating_add(self.time, self.duration)
    }

    /// Returns `true` when the two windows overlap.
    #[must_use]
    pub fn conflicts_with(&self, other: &Self) -> bool {
        let ((s1, e1), (s2, e2)) = self.bounds_against(other);
        !(e1 <= s2) && !(e2 <= s1)
    }

    /// Returns `true` when this window starts before `other` has ended.
    #[must_use]
    pub fn starts_before_end_of(&self, other: &Self) -> bool {
        let ((s1, _), (_, e2)) = self.bounds_against(other);
        s1 < e2
    }

    /// Returns `true` when this window ends after `other` does.
    #[must_use]
    pub fn ends_after(&self, other: &Self) -> bool {
        let ((_, e1), (_, e2)) = self.bounds_against(other);
        e1 > e2
    }

    /// Nanosecond bounds of both windows on a common axis.
    fn bounds_against(&self, other: &Self) -> ((i128, i128), (i128, i128)) {
        let (start1, start2) = match (self.timestamp, other.timestamp) {
            (Some(t1), Some(t2)) => (i128::from(t1), i128::from(t2)),
            _ => (unix_nanos(self.time), unix_nanos(other.time)),
        };
        (
            (start1, start1 + self.duration.as_nanos() as i128),
            (start2, start2 + other.duration.as_nanos() as i128),
        )
    }
}

/// A window that overlaps a probed or newly scheduled window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Conflict {
    /// The overlapping window
    pub window: Window,
    /// `true` when the window belongs to the most recently delivered item
    /// rather than a pending one
    pub delivered: bool,
}

/// A payload with an exclusive window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleItem<T> {
    payload: T,
    window: Window,
}

impl<T> ScheduleItem<T> {
    /// Schedules `payload` at `time` for `duration`.
    pub fn new(payload: T, time: SystemTime, duration: Duration) -> Self {
        Self { payload, window: Window::new(time, duration) }
    }

    /// Attaches a hardware timestamp used for conflict comparison.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.window.timestamp = Some(timestamp);
        self
    }

    /// Delivery instant.
    #[must_use]
    pub fn time(&self) -> SystemTime {
        self.window.time
    }

    /// Length of the exclusive use.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.window.duration
    }

    /// Hardware timestamp, if any.
    #[must_use]
    pub fn timestamp(&self) -> Option<i64> {
        self.window.timestamp
    }

    /// The exclusive window.
    #[must_use]
    pub fn window(&self) -> Window {
        self.window
    }

    /// Borrows the payload.
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Unwraps the payload.
    pub fn into_payload(self) -> T {
        self.payload
    }
}
