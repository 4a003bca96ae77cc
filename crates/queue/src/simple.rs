//! Unbounded FIFO queue with blocking semantics.
//!
//! **Complexity**
//! - `add`, `next`, and `try_next` complete in `O(1)`.
//! - `destroy` is `O(n)` where `n` is the number of buffered items.
//!
//! **Panic Safety**
//! - Internal mutex poisoning is recovered transparently so that operations can
//!   proceed after a panic in another thread.
//!
//! **Semantics of `destroy()`**
//! - Buffered items are discarded, blocked consumers are released with `None`
//!   and later `add` calls hand their item back.
//! - The operation is idempotent; repeated calls have no additional effect.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::metrics::{QueueMetrics, QueueMetricsSnapshot};
use crate::Queue;

struct Inner<T> {
    queue: VecDeque<T>,
    destroyed: bool,
}

struct State<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
    config: QueueConfig,
    metrics: QueueMetrics,
}

impl<T> State<T> {
    fn new(config: QueueConfig) -> Self {
        Self {
            inner: Mutex::new(Inner { queue: VecDeque::new(), destroyed: false }),
            not_empty: Condvar::new(),
            config,
            metrics: QueueMetrics::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn wait_not_empty<'a>(&self, guard: MutexGuard<'a, Inner<T>>) -> MutexGuard<'a, Inner<T>> {
        match self.not_empty.wait(guard) {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Thread-safe unbounded FIFO queue.
///
/// All methods take `&self`; clones share the same queue.
///
/// ```
/// use std::thread;
///
/// use airtime_queue::SimpleQueue;
///
/// let queue = SimpleQueue::new();
/// let worker = {
///     let queue = queue.clone();
///     thread::spawn(move || queue.next())
/// };
///
/// queue.add(1).unwrap();
/// assert_eq!(worker.join().unwrap(), Some(1));
///
/// queue.destroy();
/// assert_eq!(queue.next(), None);
/// ```
pub struct SimpleQueue<T> {
    state: Arc<State<T>>,
}

impl<T> Clone for SimpleQueue<T> {
    fn clone(&self) -> Self {
        Self { state: Arc::clone(&self.state) }
    }
}

impl<T> Default for SimpleQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SimpleQueue<T> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(QueueConfig::default())
    }

    /// Creates an empty queue with the given configuration.
    #[must_use]
    pub fn with_config(config: QueueConfig) -> Self {
        Self { state: Arc::new(State::new(config)) }
    }

    /// Appends `item` to the tail and wakes one waiting consumer.
    ///
    /// # Errors
    /// Returns [`QueueError::Destroyed`] with the item when the queue has been
    /// destroyed.
    pub fn add(&self, item: T) -> Result<(), QueueError<T>> {
        let mut guard = self.state.lock();
        if guard.destroyed {
            drop(guard);
            self.state.metrics.record_rejection();
            tracing::warn!(
                queue = %self.state.config.name,
                operation = "add",
                "rejected: queue has been destroyed"
            );
            return Err(QueueError::Destroyed(item));
        }
        guard.queue.push_back(item);
        let pending = guard.queue.len();
        drop(guard);
        self.state.not_empty.notify_one();

        self.state.metrics.record_add(pending);
        tracing::debug!(queue = %self.state.config.name, pending, "item queued");
        Ok(())
    }

    /// Removes the head, blocking until an item is available.
    ///
    /// Returns `None` once the queue is destroyed.
    pub fn next(&self) -> Option<T> {
        let mut guard = self.state.lock();
        loop {
            if guard.destroyed {
                return None;
            }
            if let Some(item) = guard.queue.pop_front() {
                let pending = guard.queue.len();
                drop(guard);
                self.delivered(pending);
                return Some(item);
            }
            guard = self.state.wait_not_empty(guard);
            tracing::trace!(queue = %self.state.config.name, "consumer woke up");
        }
    }

    /// Removes the head without blocking.
    #[must_use]
    pub fn try_next(&self) -> Option<T> {
        let mut guard = self.state.lock();
        if guard.destroyed {
            return None;
        }
        let item = guard.queue.pop_front()?;
        let pending = guard.queue.len();
        drop(guard);
        self.delivered(pending);
        Some(item)
    }

    fn delivered(&self, pending: usize) {
        self.state.metrics.record_delivery(pending);
        tracing::debug!(queue = %self.state.config.name, pending, "item delivered");
    }

    /// Returns the current item count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Returns `true` when the queue has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discards buffered items and wakes all waiters with `None`.
    pub fn destroy(&self) {
        let mut guard = self.state.lock();
        if guard.destroyed {
            return;
        }
        guard.destroyed = true;
        let discarded = guard.queue.len();
        guard.queue.clear();
        drop(guard);
        self.state.not_empty.notify_all();

        self.state.metrics.record_destroy();
        tracing::debug!(queue = %self.state.config.name, discarded, "queue destroyed");
    }

    /// Alias for [`SimpleQueue::destroy`].
    pub fn clean(&self) {
        self.destroy();
    }

    /// Returns `true` if [`destroy`](Self::destroy) has been called.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    /// Current counters.
    #[must_use]
    pub fn metrics(&self) -> QueueMetricsSnapshot {
        self.state.metrics.snapshot()
    }

    /// The configuration the queue was built with.
    #[must_use]
    pub fn config(&self) -> &QueueConfig {
        &self.state.config
    }
}

impl<T> Queue for SimpleQueue<T> {
    type Item = T;

    fn next(&self) -> Option<T> {
        SimpleQueue::next(self)
    }

    fn is_empty(&self) -> bool {
        SimpleQueue::is_empty(self)
    }

    fn len(&self) -> usize {
        SimpleQueue::len(self)
    }

    fn destroy(&self) {
        SimpleQueue::destroy(self);
    }

    fn is_destroyed(&self) -> bool {
        SimpleQueue::is_destroyed(self)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for simple.
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    use super::*;

    /// Validates `SimpleQueue::new` behavior for the state introspection
    /// helpers scenario.
    ///
    /// Assertions:
    /// - Confirms `queue.len()` equals `0`.
    /// - Ensures `queue.is_empty()` evaluates to true.
    /// - Ensures `queue.try_next().is_none()` evaluates to true.
    /// - Confirms `queue.len()` equals `2`.
    /// - Confirms items come back in FIFO order.
    #[test]
    fn test_state_introspection_helpers() {
        let queue = SimpleQueue::new();
        assert_eq!(queue.len(), 0);
        assert!(queue.is_empty());
        assert!(queue.try_next().is_none());

        queue.add(10).unwrap();
        queue.add(20).unwrap();
        assert_eq!(queue.len(), 2);
        assert!(!queue.is_empty());

        assert_eq!(queue.try_next(), Some(10));
        assert_eq!(queue.next(), Some(20));
        assert!(queue.is_empty());
        assert!(!queue.is_destroyed());
    }

    /// Validates `SimpleQueue::next` behavior for the blocked consumer
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms the consumer receives the item added after it blocked.
    #[test]
    fn test_next_blocks_until_add() {
        let queue = SimpleQueue::new();
        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.next())
        };

        thread::sleep(Duration::from_millis(20));
        queue.add("payload").unwrap();
        assert_eq!(consumer.join().unwrap(), Some("payload"));
    }

    /// Validates `SimpleQueue::destroy` behavior for the waiter release
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms every blocked consumer returns `None`.
    /// - Confirms buffered items are discarded.
    /// - Confirms `queue.add(3)` equals `Err(QueueError::Destroyed(3))`.
    #[test]
    fn test_destroy_releases_waiters() {
        let queue: SimpleQueue<u32> = SimpleQueue::new();
        let released = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let queue = queue.clone();
                let released = Arc::clone(&released);
                thread::spawn(move || {
                    assert_eq!(queue.next(), None);
                    released.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        queue.destroy();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(released.load(Ordering::SeqCst), 4);

        assert_eq!(queue.add(3), Err(QueueError::Destroyed(3)));
        assert!(queue.is_empty());
        queue.clean();
        assert!(queue.is_destroyed());
    }

    /// Validates `SimpleQueue::destroy` behavior for buffered items.
    ///
    /// Assertions:
    /// - Confirms `queue.next()` equals `None` even though items were queued.
    /// - Confirms the snapshot reports the destroy.
    #[test]
    fn test_destroy_discards_items() {
        let queue = SimpleQueue::with_config(QueueConfig::named("uplink"));
        queue.add('a').unwrap();
        queue.add('b').unwrap();
        queue.destroy();

        assert_eq!(queue.next(), None);
        assert_eq!(queue.try_next(), None);

        let snapshot = queue.metrics();
        assert!(snapshot.destroyed);
        assert_eq!(snapshot.total_added, 2);
        assert_eq!(snapshot.queue_depth_max, 2);
        assert_eq!(queue.config().name, "uplink");
    }

    /// Validates concurrent consumers receive distinct items.
    ///
    /// Assertions:
    /// - Confirms every produced item is consumed exactly once.
    #[test]
    fn test_concurrent_consumers_receive_distinct_items() {
        let queue = SimpleQueue::new();
        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let queue = queue.clone();
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    while let Some(item) = queue.next() {
                        seen.push(item);
                    }
                    seen
                })
            })
            .collect();

        for item in 0..200_u32 {
            queue.add(item).unwrap();
        }
        while !queue.is_empty() {
            thread::sleep(Duration::from_millis(1));
        }
        thread::sleep(Duration::from_millis(20));
        queue.destroy();

        let mut all = HashSet::new();
        let mut total = 0;
        for consumer in consumers {
            for item in consumer.join().unwrap() {
                all.insert(item);
                total += 1;
            }
        }
        assert_eq!(total, 200);
        assert_eq!(all.len(), 200);
    }
}
