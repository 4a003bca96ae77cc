//! Time-ordered blocking core shared by [`JitQueue`](crate::JitQueue) and
//! [`ScheduleQueue`](crate::ScheduleQueue).
//!
//! **Ordering**
//! - Entries live in a `BTreeMap` keyed by `(time, sequence)`. The sequence is
//!   a per-queue insertion counter, so equal times are delivered in insertion
//!   order and every entry has a distinct key.
//!
//! **Waking**
//! - Every mutation bumps `generation` and broadcasts on `changed`. A waiter
//!   sleeps on the condvar (empty queue) or with a timeout equal to the
//!   distance to the head item, then re-reads the head under the lock. A
//!   waiter only pops a head that is due at the moment it holds the lock.
//!
//! **Single flight**
//! - `pop` serializes blocking dequeuers so that only one of them waits on a
//!   given head at a time. Claiming the head itself happens under the state
//!   lock, which keeps the non-blocking `try_pop` safe alongside it.
//!
//! **Marker**
//! - `M` is a slot owned by the wrapping queue and updated through the
//!   `on_pop` hook while the state lock is held. `ScheduleQueue` keeps its
//!   last-finished window there.

use std::collections::BTreeMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

use crate::clock::Clock;
use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::item::{JitItem, ScheduleItem};
use crate::metrics::QueueMetrics;

/// An entry with a delivery time.
pub(crate) trait Timed {
    fn due_at(&self) -> SystemTime;
}

impl<T> Timed for JitItem<T> {
    fn due_at(&self) -> SystemTime {
        self.time()
    }
}

impl<T> Timed for ScheduleItem<T> {
    fn due_at(&self) -> SystemTime {
        self.time()
    }
}

/// Mutable state guarded by the state mutex.
pub(crate) struct State<E, M> {
    entries: BTreeMap<(SystemTime, u64), E>,
    sequence: u64,
    generation: u64,
    destroyed: bool,
    marker: M,
}

impl<E: Timed, M> State<E, M> {
    pub(crate) fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Pending entries in delivery order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &E> + '_ {
        self.entries.values()
    }

    pub(crate) fn marker(&self) -> &M {
        &self.marker
    }

    /// Inserts an entry and marks the state as changed.
    ///
    /// Callers check [`State::is_destroyed`] first.
    pub(crate) fn push(&mut self, entry: E) {
        let key = (entry.due_at(), self.sequence);
        self.sequence = self.sequence.wrapping_add(1);
        self.entries.insert(key, entry);
        self.generation = self.generation.wrapping_add(1);
    }

    fn head_time(&self) -> Option<SystemTime> {
        self.entries.keys().next().map(|(time, _)| *time)
    }

    fn pop_head(&mut self) -> Option<E> {
        self.entries.pop_first().map(|(_, entry)| entry)
    }
}

struct Shared<E, M, C> {
    state: Mutex<State<E, M>>,
    changed: Condvar,
    pop: Mutex<()>,
    clock: C,
    config: QueueConfig,
    metrics: QueueMetrics,
}

impl<E, M, C> Shared<E, M, C> {
    fn lock(&self) -> MutexGuard<'_, State<E, M>> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_pop(&self) -> MutexGuard<'_, ()> {
        match self.pop.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, State<E, M>>) -> MutexGuard<'a, State<E, M>> {
        match self.changed.wait(guard) {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn wait_timeout<'a>(
        &self,
        guard: MutexGuard<'a, State<E, M>>,
        duration: Duration,
    ) -> MutexGuard<'a, State<E, M>> {
        match self.changed.wait_timeout(guard, duration) {
            Ok((guard, _)) => guard,
            Err(poisoned) => poisoned.into_inner().0,
        }
    }
}

/// Cloneable handle over the shared ordered state.
pub(crate) struct Timeline<E, M, C> {
    shared: Arc<Shared<E, M, C>>,
}

impl<E, M, C> Clone for Timeline<E, M, C> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<E: Timed, M: Default, C: Clock> Timeline<E, M, C> {
    pub(crate) fn new(config: QueueConfig, clock: C) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    entries: BTreeMap::new(),
                    sequence: 0,
                    generation: 0,
                    destroyed: false,
                    marker: M::default(),
                }),
                changed: Condvar::new(),
                pop: Mutex::new(()),
                clock,
                config,
                metrics: QueueMetrics::new(),
            }),
        }
    }
}

impl<E: Timed, M, C: Clock> Timeline<E, M, C> {
    pub(crate) fn clock(&self) -> &C {
        &self.shared.clock
    }

    pub(crate) fn config(&self) -> &QueueConfig {
        &self.shared.config
    }

    pub(crate) fn metrics(&self) -> &QueueMetrics {
        &self.shared.metrics
    }

    fn name(&self) -> &str {
        &self.shared.config.name
    }

    /// Runs `f` under the state lock and wakes every waiter if `f` changed
    /// the state.
    pub(crate) fn update<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut State<E, M>) -> R,
    {
        let mut guard = self.shared.lock();
        let generation = guard.generation;
        let result = f(&mut guard);
        let changed = guard.generation != generation;
        drop(guard);
        if changed {
            self.shared.changed.notify_all();
        }
        result
    }

    /// Runs `f` under the state lock without mutating.
    pub(crate) fn read<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&State<E, M>) -> R,
    {
        f(&self.shared.lock())
    }

    /// Inserts `entry` in time order.
    ///
    /// Returns the entry back when the queue is destroyed.
    pub(crate) fn insert(&self, entry: E) -> Result<(), QueueError<E>> {
        let due_at = entry.due_at();
        let outcome = self.update(|state| {
            if state.is_destroyed() {
                return Err(entry);
            }
            state.push(entry);
            Ok(state.len())
        });

        match outcome {
            Ok(pending) => {
                self.record_insert(pending, due_at);
                Ok(())
            }
            Err(entry) => Err(self.reject(entry, "add")),
        }
    }

    pub(crate) fn record_insert(&self, pending: usize, due_at: SystemTime) {
        self.shared.metrics.record_add(pending);
        tracing::debug!(queue = %self.name(), pending, due_at = ?due_at, "item queued");
    }

    /// Records and logs a mutation attempted after destroy.
    pub(crate) fn reject<V>(&self, value: V, operation: &'static str) -> QueueError<V> {
        self.shared.metrics.record_rejection();
        tracing::warn!(queue = %self.name(), operation, "rejected: queue has been destroyed");
        QueueError::Destroyed(value)
    }

    /// Blocks until the head entry is due, then removes and returns it.
    ///
    /// `on_pop` runs under the state lock with the marker and the entry about
    /// to be returned. Returns `None` once the queue is destroyed.
    pub(crate) fn pop<F>(&self, mut on_pop: F) -> Option<E>
    where
        F: FnMut(&mut M, &E),
    {
        let _flight = self.shared.lock_pop();
        let mut state = self.shared.lock();

        loop {
            if state.destroyed {
                return None;
            }

            let generation = state.generation;
            let Some(due_at) = state.head_time() else {
                state = self.shared.wait(state);
                self.record_wakeup(generation, state.generation);
                continue;
            };

            match due_at.duration_since(self.shared.clock.system_time()) {
                Ok(remaining) if !remaining.is_zero() => {
                    tracing::trace!(
                        queue = %self.name(),
                        remaining_us = remaining.as_micros() as u64,
                        "waiting for head item"
                    );
                    state = self.shared.wait_timeout(state, remaining);
                    self.record_wakeup(generation, state.generation);
                }
                _ => return self.take_head(state, &mut on_pop),
            }
        }
    }

    /// Removes and returns the head entry only if it is already due.
    pub(crate) fn try_pop<F>(&self, mut on_pop: F) -> Option<E>
    where
        F: FnMut(&mut M, &E),
    {
        let state = self.shared.lock();
        if state.destroyed {
            return None;
        }
        let due_at = state.head_time()?;
        if due_at > self.shared.clock.system_time() {
            return None;
        }
        self.take_head(state, &mut on_pop)
    }

    fn take_head<F>(&self, mut state: MutexGuard<'_, State<E, M>>, on_pop: &mut F) -> Option<E>
    where
        F: FnMut(&mut M, &E),
    {
        let entry = state.pop_head()?;
        let State { marker, .. } = &mut *state;
        on_pop(marker, &entry);
        let pending = state.len();
        drop(state);

        self.shared.metrics.record_delivery(pending);
        tracing::debug!(queue = %self.name(), pending, due_at = ?entry.due_at(), "item delivered");
        Some(entry)
    }

    fn record_wakeup(&self, before: u64, after: u64) {
        let stale = before != after;
        self.shared.metrics.record_wakeup(stale);
        tracing::trace!(queue = %self.name(), stale, "waiter woke up");
    }

    pub(crate) fn peek_time(&self) -> Option<SystemTime> {
        let state = self.shared.lock();
        if state.destroyed {
            return None;
        }
        state.head_time()
    }

    pub(crate) fn len(&self) -> usize {
        self.shared.lock().len()
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.shared.lock().destroyed
    }

    /// Empties the queue, marks it destroyed and releases every waiter.
    pub(crate) fn destroy(&self) {
        let mut state = self.shared.lock();
        if state.destroyed {
            return;
        }
        state.destroyed = true;
        let discarded = state.entries.len();
        state.entries.clear();
        state.generation = state.generation.wrapping_add(1);
        drop(state);
        self.shared.changed.notify_all();

        self.shared.metrics.record_destroy();
        tracing::debug!(queue = %self.name(), discarded, "queue destroyed");
    }
}
