//! Blocking work queues for handing items from producers to a consumer.
//!
//! Three queues with increasing temporal sophistication:
//! - **[`SimpleQueue`]**: unbounded FIFO, blocks until an item is available
//! - **[`JitQueue`]**: releases each item only once its scheduled time has
//!   arrived
//! - **[`ScheduleQueue`]**: a JIT queue whose items occupy an exclusive
//!   `[start, start + duration)` window, with conflict detection and
//!   as-soon-as-possible slot finding
//!
//! All three share the [`Queue`] contract: [`Queue::next`] blocks and returns
//! `None` once the queue is destroyed, and [`Queue::destroy`] is a one-way
//! transition that releases every waiter.
//!
//! # Feature Flags
//!
//! - `observability` (default): subscriber installation helpers built on
//!   `tracing-subscriber`
//! - `test-utils`: timing assertions and a test subscriber
//!
//! ```
//! use std::time::Duration;
//!
//! use airtime_queue::ScheduleQueue;
//!
//! let queue = ScheduleQueue::new();
//! let start = queue.schedule_asap("uplink", Duration::from_millis(5)).unwrap();
//! let next = queue.schedule_asap("downlink", Duration::from_millis(5)).unwrap();
//! assert!(next >= start + Duration::from_millis(5));
//!
//! assert_eq!(queue.next(), Some("uplink"));
//! queue.destroy();
//! assert_eq!(queue.next(), None);
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod clock;
pub mod config;
pub mod error;
pub mod item;
pub mod jit;
pub mod metrics;
pub mod schedule;
pub mod simple;
mod timeline;
pub mod utils;

#[cfg(feature = "observability")]
pub mod observability;

#[cfg(any(feature = "test-utils", test))]
pub mod testing;

pub use clock::{Clock, MockClock, SystemClock};
pub use config::QueueConfig;
pub use error::{ConfigError, ConfigResult, QueueError};
pub use item::{Conflict, JitItem, ScheduleItem, Window};
pub use jit::JitQueue;
pub use metrics::{QueueMetrics, QueueMetricsSnapshot};
pub use schedule::ScheduleQueue;
pub use simple::SimpleQueue;

/// Contract shared by every queue in this crate.
///
/// A queue is either *active* or *destroyed*. The only transition is
/// active → destroyed, triggered by [`Queue::destroy`].
pub trait Queue {
    /// Payload type handed back by [`Queue::next`].
    type Item;

    /// Returns the next item, blocking until one is available.
    ///
    /// Returns `None` to every caller once the queue has been destroyed.
    fn next(&self) -> Option<Self::Item>;

    /// Returns `true` when no item is pending.
    fn is_empty(&self) -> bool;

    /// Returns the number of pending items.
    fn len(&self) -> usize;

    /// Empties the queue and releases all blocked and future callers of
    /// [`Queue::next`]. Idempotent.
    fn destroy(&self);

    /// Returns `true` once [`Queue::destroy`] has been called.
    fn is_destroyed(&self) -> bool;

    /// Alias for [`Queue::destroy`].
    fn clean(&self) {
        self.destroy();
    }
}
