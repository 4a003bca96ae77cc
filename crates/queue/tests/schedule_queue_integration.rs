//! Integration tests for `airtime_queue::ScheduleQueue`
//!
//! Covers conflict boundaries through the public API, ASAP placement against
//! both clocks, concurrent ASAP callers, the last-finished window and the
//! destroyed-queue contract.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, SystemTime};

use airtime_queue::testing::{assert_time_near, drain, init_test_tracing};
use airtime_queue::{
    Clock, MockClock, QueueConfig, QueueError, ScheduleItem, ScheduleQueue, Window,
};

const SEC: Duration = Duration::from_secs(1);
const MS: Duration = Duration::from_millis(1);

fn mock_queue<T>() -> (ScheduleQueue<T, MockClock>, MockClock) {
    let clock = MockClock::new();
    (ScheduleQueue::with_clock(QueueConfig::named("schedule-it"), clock.clone()), clock)
}

/// Validates the three boundary cases of the overlap rule against a booked
/// `[0s, 10s)` window.
#[test]
fn test_conflict_boundaries() {
    init_test_tracing();
    let (queue, clock) = mock_queue::<&str>();
    let zero = clock.system_time() + 60 * SEC;
    queue.schedule("booked", zero, 10 * SEC).unwrap();

    // [-10s, +10s) covers the whole window
    assert_eq!(queue.conflicts(zero - 10 * SEC, 20 * SEC).len(), 1);
    // [10s, 11s) is adjacent
    assert!(queue.conflicts(zero + 10 * SEC, SEC).is_empty());
    // [9s, 11s) overlaps the last second
    assert_eq!(queue.conflicts(zero + 9 * SEC, 2 * SEC).len(), 1);
    // [-10s, 0s) ends where the window starts
    assert!(queue.conflicts(zero - 10 * SEC, 10 * SEC).is_empty());
}

/// Ensures `schedule` keeps conflicting items and reports each overlapped
/// window, pending ones in time order.
#[test]
fn test_schedule_reports_every_overlap() {
    let (queue, clock) = mock_queue();
    let zero = clock.system_time() + SEC;
    queue.schedule(1, zero, 10 * MS).unwrap();
    queue.schedule(2, zero + 20 * MS, 10 * MS).unwrap();

    let conflicts = queue.schedule(3, zero + 5 * MS, 20 * MS).unwrap();
    let windows: Vec<Window> = conflicts.iter().map(|c| c.window).collect();
    assert_eq!(windows, vec![Window::new(zero, 10 * MS), Window::new(zero + 20 * MS, 10 * MS)]);
    assert_eq!(queue.len(), 3);

    let added = queue
        .add(ScheduleItem::new(4, zero + 40 * MS, 5 * MS).with_timestamp(7))
        .unwrap();
    assert!(added.is_empty());
    assert_eq!(queue.metrics().conflicts_reported, 2);
}

/// Validates ASAP placement against the system clock: an empty queue starts
/// now and an immediate second call starts after the first booking.
#[test]
fn test_asap_against_system_clock() {
    init_test_tracing();
    let queue = ScheduleQueue::new();
    let duration = 50 * MS;
    let tolerance = 20 * MS;

    let first = queue.schedule_asap("first", duration).unwrap();
    assert_time_near(first, SystemTime::now(), tolerance);

    let second = queue.schedule_asap("second", duration).unwrap();
    assert!(second >= first + duration);
    assert_time_near(second, SystemTime::now() + duration, tolerance);

    assert_eq!(drain(&queue, 2), vec!["first", "second"]);
}

/// Ensures ASAP returns the earliest gap that fits among non-contiguous
/// bookings instead of the end of the last booking.
#[test]
fn test_asap_finds_earliest_adequate_gap() {
    let (queue, clock) = mock_queue();
    let now = clock.system_time();
    // Bookings [0,10) [15,25) [40,50), gaps of 5ms and 15ms
    queue.schedule("a", now, 10 * MS).unwrap();
    queue.schedule("b", now + 15 * MS, 10 * MS).unwrap();
    queue.schedule("c", now + 40 * MS, 10 * MS).unwrap();

    let start = queue.schedule_asap("fits-second-gap", 12 * MS).unwrap();
    assert_eq!(start, now + 25 * MS);
    assert_eq!(queue.conflicts(start, 12 * MS).len(), 1, "only itself may overlap");

    let start = queue.schedule_asap("fits-first-gap", 5 * MS).unwrap();
    assert_eq!(start, now + 10 * MS);
}

/// Ensures ASAP never starts in the past or inside the window of an item that
/// was already delivered.
#[test]
fn test_asap_respects_last_finished() {
    let (queue, clock) = mock_queue();
    let now = clock.system_time();
    queue.schedule("on-air", now - 2 * MS, 10 * MS).unwrap();
    assert_eq!(queue.next(), Some("on-air"));
    assert_eq!(queue.last_finished(), Some(Window::new(now - 2 * MS, 10 * MS)));

    assert_eq!(queue.schedule_asap("next-slot", 3 * MS).unwrap(), now + 8 * MS);

    clock.advance(SEC);
    let later = queue.schedule_asap("idle", 3 * MS).unwrap();
    assert_eq!(later, now + SEC);
}

/// Validates that concurrent ASAP callers receive pairwise non-overlapping
/// windows.
#[test]
fn test_concurrent_asap_never_overlaps() {
    init_test_tracing();
    let (queue, _clock) = mock_queue();
    let duration = 4 * MS;
    let barrier = Arc::new(Barrier::new(8));

    let callers: Vec<_> = (0..8_u32)
        .map(|id| {
            let queue = queue.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..10).map(|_| queue.schedule_asap(id, duration).unwrap()).collect::<Vec<_>>()
            })
        })
        .collect();

    let mut starts: Vec<SystemTime> =
        callers.into_iter().flat_map(|caller| caller.join().unwrap()).collect();
    starts.sort();
    assert_eq!(starts.len(), 80);
    for pair in starts.windows(2) {
        let gap = pair[1].duration_since(pair[0]).unwrap_or_default();
        assert!(gap >= duration, "windows at {:?} and {:?} overlap", pair[0], pair[1]);
    }
    assert_eq!(queue.metrics().asap_scheduled, 80);
}

/// Ensures timestamped windows are compared by timestamp and that
/// timestamp probes ignore windows without one.
#[test]
fn test_timestamp_conflicts() {
    let (queue, clock) = mock_queue();
    let time = clock.system_time() + SEC;
    queue.schedule_with_timestamp("t1", time, 1_000, 10 * MS).unwrap();
    let conflicts = queue.schedule_with_timestamp("t2", time, 20_000_000, 10 * MS).unwrap();
    assert!(conflicts.is_empty());

    queue.schedule("plain", time, 10 * MS).unwrap();
    let probe = queue.conflicts_for_timestamp(25_000_000, MS);
    assert_eq!(probe.len(), 1);
    assert_eq!(probe[0].window.timestamp, Some(20_000_000));
}

/// Validates the destroyed-then-add and destroyed-then-next paths.
#[test]
fn test_destroyed_schedule_queue() -> anyhow::Result<()> {
    let (queue, clock) = mock_queue::<String>();
    let now = clock.system_time();
    queue.schedule("pending".to_string(), now + SEC, MS)?;

    let consumer = {
        let queue = queue.clone();
        thread::spawn(move || queue.next())
    };
    thread::sleep(20 * MS);
    queue.clean();
    assert_eq!(consumer.join().map_err(|_| anyhow::anyhow!("consumer panicked"))?, None);

    let err = queue.schedule_asap("late".to_string(), MS).unwrap_err();
    assert_eq!(err, QueueError::Destroyed("late".to_string()));
    assert!(queue.schedule("late".to_string(), now, MS).is_err());
    assert!(queue.conflicts(now, SEC).is_empty());
    assert!(queue.conflicts_for_timestamp(0, SEC).is_empty());
    assert_eq!(queue.next(), None);
    assert_eq!(queue.try_next(), None);
    assert!(queue.is_destroyed());
    Ok(())
}
