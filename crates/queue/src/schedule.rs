//! Schedule queue: a just-in-time queue of exclusive windows.
//!
//! Every [`ScheduleItem`] occupies `[time, time + duration)`. The queue
//! reports which pending windows, and which recently delivered window, a new
//! or probed window overlaps, and it can place an item at the earliest
//! conflict-free start with [`ScheduleQueue::schedule_asap`].
//!
//! **Last finished**
//! - Delivering an item records its window when that window ends later than
//!   the one already recorded. A window that starts before the recorded end
//!   conflicts with it, because that transmission may still be in progress.
//!
//! **ASAP scan**
//! - The candidate starts at `max(now, last finished end)` and walks pending
//!   windows in time order. A conflict moves the candidate to the conflicting
//!   window's end plus `asap_guard`; the scan stops at the first window that
//!   starts at or after the candidate's end. Search and insert share one
//!   critical section.
//! - The scan is greedy: it returns the first gap that fits, which is not
//!   necessarily the gap that fragments the schedule least.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::clock::{saturating_add, Clock, SystemClock};
use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::item::{Conflict, ScheduleItem, Window};
use crate::metrics::QueueMetricsSnapshot;
use crate::timeline::{State, Timeline};
use crate::Queue;

type ScheduleState<T> = State<ScheduleItem<T>, Option<Window>>;

/// JIT queue with conflict detection and as-soon-as-possible placement.
///
/// ```
/// use std::time::{Duration, SystemTime};
///
/// use airtime_queue::ScheduleQueue;
///
/// let queue = ScheduleQueue::new();
/// let start = SystemTime::now() + Duration::from_millis(10);
///
/// assert!(queue.schedule("a", start, Duration::from_millis(10)).unwrap().is_empty());
/// let overlapping = start + Duration::from_millis(5);
/// let conflicts = queue.schedule("b", overlapping, Duration::from_millis(10)).unwrap();
/// assert_eq!(conflicts.len(), 1);
/// assert_eq!(conflicts[0].window.time, start);
/// ```
pub struct ScheduleQueue<T, C: Clock = SystemClock> {
    timeline: Timeline<ScheduleItem<T>, Option<Window>, C>,
}

impl<T, C: Clock> Clone for ScheduleQueue<T, C> {
    fn clone(&self) -> Self {
        Self { timeline: self.timeline.clone() }
    }
}

impl<T> ScheduleQueue<T> {
    /// Creates an empty queue reading the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(QueueConfig::default())
    }

    /// Creates an empty queue with the given configuration.
    #[must_use]
    pub fn with_config(config: QueueConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<T> Default for ScheduleQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C: Clock> ScheduleQueue<T, C> {
    /// Creates an empty queue that reads "now" from `clock`.
    pub fn with_clock(config: QueueConfig, clock: C) -> Self {
        Self { timeline: Timeline::new(config, clock) }
    }

    /// Queues `item` and returns the windows it overlaps at insertion time.
    ///
    /// The item is queued even when it conflicts; the caller decides what to
    /// do with the report.
    ///
    /// # Errors
    /// Returns [`QueueError::Destroyed`] with the item when the queue has been
    /// destroyed.
    pub fn add(
        &self,
        item: ScheduleItem<T>,
    ) -> Result<Vec<Conflict>, QueueError<ScheduleItem<T>>> {
        let window = item.window();
        let outcome = self.timeline.update(|state| {
            if state.is_destroyed() {
                return Err(item);
            }
            let conflicts = collect_conflicts(state, &window, false);
            state.push(item);
            Ok((conflicts, state.len()))
        });

        match outcome {
            Ok((conflicts, pending)) => {
                self.timeline.record_insert(pending, window.time);
                self.report_conflicts(&window, &conflicts);
                Ok(conflicts)
            }
            Err(item) => Err(self.timeline.reject(item, "schedule")),
        }
    }

    /// Queues `payload` in `[time, time + duration)`.
    ///
    /// # Errors
    /// Returns [`QueueError::Destroyed`] with the payload when the queue has
    /// been destroyed.
    pub fn schedule(
        &self,
        payload: T,
        time: SystemTime,
        duration: Duration,
    ) -> Result<Vec<Conflict>, QueueError<T>> {
        self.add(ScheduleItem::new(payload, time, duration))
            .map_err(|err| err.map(ScheduleItem::into_payload))
    }

    /// Queues `payload` for delivery at `time`, comparing its window by
    /// `timestamp` against other timestamped windows.
    ///
    /// # Errors
    /// Returns [`QueueError::Destroyed`] with the payload when the queue has
    /// been destroyed.
    pub fn schedule_with_timestamp(
        &self,
        payload: T,
        time: SystemTime,
        timestamp: i64,
        duration: Duration,
    ) -> Result<Vec<Conflict>, QueueError<T>> {
        self.add(ScheduleItem::new(payload, time, duration).with_timestamp(timestamp))
            .map_err(|err| err.map(ScheduleItem::into_payload))
    }

    /// Windows that `[time, time + duration)` would overlap. Inserts nothing.
    ///
    /// Returns an empty list on a destroyed queue.
    #[must_use]
    pub fn conflicts(&self, time: SystemTime, duration: Duration) -> Vec<Conflict> {
        let probe = Window::new(time, duration);
        self.timeline.read(|state| {
            if state.is_destroyed() {
                return Vec::new();
            }
            collect_conflicts(state, &probe, false)
        })
    }

    /// Timestamped windows that `[timestamp, timestamp + duration)` would
    /// overlap. Windows without a timestamp are not comparable and are
    /// skipped. Inserts nothing.
    ///
    /// Returns an empty list on a destroyed queue.
    #[must_use]
    pub fn conflicts_for_timestamp(&self, timestamp: i64, duration: Duration) -> Vec<Conflict> {
        let probe = Window::with_timestamp(UNIX_EPOCH, timestamp, duration);
        self.timeline.read(|state| {
            if state.is_destroyed() {
                return Vec::new();
            }
            collect_conflicts(state, &probe, true)
        })
    }

    /// Queues `payload` at the earliest conflict-free start at or after now
    /// and returns that start.
    ///
    /// # Errors
    /// Returns [`QueueError::Destroyed`] with the payload when the queue has
    /// been destroyed.
    pub fn schedule_asap(
        &self,
        payload: T,
        duration: Duration,
    ) -> Result<SystemTime, QueueError<T>> {
        let guard = self.timeline.config().asap_guard;
        let outcome = self.timeline.update(|state| {
            if state.is_destroyed() {
                return Err(payload);
            }
            let now = self.timeline.clock().system_time();
            let start = earliest_start(state, now, duration, guard);
            state.push(ScheduleItem::new(payload, start, duration));
            Ok((now, start, state.len()))
        });

        match outcome {
            Ok((now, start, pending)) => {
                self.timeline.record_insert(pending, start);
                self.timeline.metrics().record_asap();
                let delay = start.duration_since(now).unwrap_or_default();
                tracing::debug!(
                    queue = %self.timeline.config().name,
                    delay_us = delay.as_micros() as u64,
                    duration_us = duration.as_micros() as u64,
                    "scheduled as soon as possible"
                );
                Ok(start)
            }
            Err(payload) => Err(self.timeline.reject(payload, "schedule_asap")),
        }
    }

    /// Window of the delivered item that ends last, if any.
    #[must_use]
    pub fn last_finished(&self) -> Option<Window> {
        self.timeline.read(|state| if state.is_destroyed() { None } else { *state.marker() })
    }

    /// Blocks until the earliest item is due and returns it, recording its
    /// window as last finished.
    ///
    /// Returns `None` once the queue is destroyed.
    pub fn next(&self) -> Option<T> {
        self.timeline.pop(advance_marker).map(ScheduleItem::into_payload)
    }

    /// Returns the earliest item if it is already due, without blocking.
    pub fn try_next(&self) -> Option<T> {
        self.timeline.try_pop(advance_marker).map(ScheduleItem::into_payload)
    }

    /// Time of the earliest pending item.
    #[must_use]
    pub fn peek_time(&self) -> Option<SystemTime> {
        self.timeline.peek_time()
    }

    /// Returns the number of pending items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timeline.len()
    }

    /// Returns `true` when no item is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empties the queue and releases every blocked `next` with `None`.
    pub fn destroy(&self) {
        self.timeline.destroy();
    }

    /// Alias for [`ScheduleQueue::destroy`].
    pub fn clean(&self) {
        self.destroy();
    }

    /// Returns `true` once the queue has been destroyed.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.timeline.is_destroyed()
    }

    /// Current counters.
    #[must_use]
    pub fn metrics(&self) -> QueueMetricsSnapshot {
        self.timeline.metrics().snapshot()
    }

    /// The configuration the queue was built with.
    #[must_use]
    pub fn config(&self) -> &QueueConfig {
        self.timeline.config()
    }

    /// The clock the queue reads "now" from.
    #[must_use]
    pub fn clock(&self) -> &C {
        self.timeline.clock()
    }

    fn report_conflicts(&self, window: &Window, conflicts: &[Conflict]) {
        if conflicts.is_empty() {
            return;
        }
        self.timeline.metrics().record_conflicts(conflicts.len());

        let config = self.timeline.config();
        let count = conflicts.len();
        let delivered = conflicts.iter().any(|c| c.delivered);
        if config.warn_on_conflict {
            tracing::warn!(
                queue = %config.name,
                count,
                delivered,
                time = ?window.time,
                "scheduled window conflicts"
            );
        } else {
            tracing::debug!(
                queue = %config.name,
                count,
                delivered,
                time = ?window.time,
                "scheduled window conflicts"
            );
        }
    }
}

impl<T, C: Clock> Queue for ScheduleQueue<T, C> {
    type Item = T;

    fn next(&self) -> Option<T> {
        ScheduleQueue::next(self)
    }

    fn is_empty(&self) -> bool {
        ScheduleQueue::is_empty(self)
    }

    fn len(&self) -> usize {
        ScheduleQueue::len(self)
    }

    fn destroy(&self) {
        ScheduleQueue::destroy(self);
    }

    fn is_destroyed(&self) -> bool {
        ScheduleQueue::is_destroyed(self)
    }
}

/// Last-finished window first, then pending windows in time order.
fn collect_conflicts<T>(
    state: &ScheduleState<T>,
    probe: &Window,
    timestamped_only: bool,
) -> Vec<Conflict> {
    let comparable = |other: &Window| !timestamped_only || other.timestamp.is_some();
    let mut conflicts = Vec::new();

    if let Some(last) = state.marker() {
        if comparable(last) && probe.starts_before_end_of(last) {
            conflicts.push(Conflict { window: *last, delivered: true });
        }
    }

    conflicts.extend(
        state
            .iter()
            .map(ScheduleItem::window)
            .filter(|window| comparable(window) && probe.conflicts_with(window))
            .map(|window| Conflict { window, delivered: false }),
    );
    conflicts
}

fn earliest_start<T>(
    state: &ScheduleState<T>,
    now: SystemTime,
    duration: Duration,
    guard: Duration,
) -> SystemTime {
    let mut start = match state.marker() {
        Some(last) if last.end_time() > now => last.end_time(),
        _ => now,
    };

    for booked in state.iter().map(ScheduleItem::window) {
        let candidate = Window::new(start, duration);
        if candidate.end_time() <= booked.time {
            break;
        }
        if candidate.conflicts_with(&booked) {
            start = saturating_add(booked.end_time(), guard);
        }
    }
    start
}

fn advance_marker<T>(marker: &mut Option<Window>, item: &ScheduleItem<T>) {
    let window = item.window();
    match marker {
        Some(last) if !window.ends_after(last) => {}
        _ => *marker = Some(window),
    }
}
