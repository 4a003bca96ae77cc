//! Just-in-time queue.
//!
//! [`JitQueue`] holds each item until its scheduled wall-clock time and then
//! releases it through [`JitQueue::next`]. Items are delivered in time order,
//! equal times in insertion order.
//!
//! **Complexity**
//! - `add`/`schedule` and delivery are `O(log n)`.
//! - `destroy` is `O(n)`.
//!
//! **Waking**
//! - Inserting an item wakes a blocked `next`, which re-reads the head. An
//!   item earlier than the one being waited for is therefore delivered on
//!   time.

use std::time::SystemTime;

use crate::clock::{Clock, SystemClock};
use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::item::JitItem;
use crate::metrics::QueueMetricsSnapshot;
use crate::timeline::Timeline;
use crate::Queue;

/// Blocking queue that releases items at their scheduled time.
///
/// ```
/// use std::time::{Duration, SystemTime};
///
/// use airtime_queue::JitQueue;
///
/// let queue = JitQueue::new();
/// let now = SystemTime::now();
/// queue.schedule("late", now + Duration::from_millis(20)).unwrap();
/// queue.schedule("early", now).unwrap();
///
/// assert_eq!(queue.next(), Some("early"));
/// assert_eq!(queue.next(), Some("late"));
/// ```
pub struct JitQueue<T, C: Clock = SystemClock> {
    timeline: Timeline<JitItem<T>, (), C>,
}

impl<T, C: Clock> Clone for JitQueue<T, C> {
    fn clone(&self) -> Self {
        Self { timeline: self.timeline.clone() }
    }
}

impl<T> JitQueue<T> {
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

impl<T> Default for JitQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C: Clock> JitQueue<T, C> {
    /// Creates an empty queue that reads "now" from `clock`.
    pub fn with_clock(config: QueueConfig, clock: C) -> Self {
        Self { timeline: Timeline::new(config, clock) }
    }

    /// Queues `item` for delivery at `item.time()`.
    ///
    /// # Errors
    /// Returns [`QueueError::Destroyed`] with the item when the queue has been
    /// destroyed.
    pub fn add(&self, item: JitItem<T>) -> Result<(), QueueError<JitItem<T>>> {
        self.timeline.insert(item)
    }

    /// Queues `payload` for delivery at `time`.
    ///
    /// # Errors
    /// Returns [`QueueError::Destroyed`] with the payload when the queue has
    /// been destroyed.
    pub fn schedule(&self, payload: T, time: SystemTime) -> Result<(), QueueError<T>> {
        self.add(JitItem::new(payload, time)).map_err(|err| err.map(JitItem::into_payload))
    }

    /// Blocks until the earliest item is due and returns it.
    ///
    /// Returns `None` once the queue is destroyed.
    pub fn next(&self) -> Option<T> {
        self.timeline.pop(|_, _| {}).map(JitItem::into_payload)
    }

    /// Returns the earliest item if it is already due, without blocking.
    pub fn try_next(&self) -> Option<T> {
        self.timeline.try_pop(|_, _| {}).map(JitItem::into_payload)
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

    /// Alias for [`JitQueue::destroy`].
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
}

impl<T, C: Clock> Queue for JitQueue<T, C> {
    type Item = T;

    fn next(&self) -> Option<T> {
        JitQueue::next(self)
    }

    fn is_empty(&self) -> bool {
        JitQueue::is_empty(self)
    }

    fn len(&self) -> usize {
        JitQueue::len(self)
    }

    fn destroy(&self) {
        JitQueue::destroy(self);
    }

    fn is_destroyed(&self) -> bool {
        JitQueue::is_destroyed(self)
    }
}
