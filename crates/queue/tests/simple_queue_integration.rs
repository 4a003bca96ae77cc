//! Integration tests for `airtime_queue::SimpleQueue`
//!
//! Exercises producer/consumer hand-off across threads, teardown of blocked
//! consumers, and the destroyed-queue contract.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use airtime_queue::testing::{drain, init_test_tracing};
use airtime_queue::{Queue, QueueConfig, QueueError, SimpleQueue};

/// Validates that items from several producers reach a single consumer with
/// each producer's order preserved.
#[test]
fn test_multi_producer_fifo_per_producer() {
    init_test_tracing();
    let queue = SimpleQueue::with_config(QueueConfig::named("fan-in"));
    let barrier = Arc::new(Barrier::new(3));

    let producers: Vec<_> = (0..3_u32)
        .map(|producer| {
            let queue = queue.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for seq in 0..50_u32 {
                    queue.add((producer, seq)).unwrap();
                }
            })
        })
        .collect();

    let received = drain(&queue, 150);
    for producer in producers {
        producer.join().unwrap();
    }

    assert_eq!(received.len(), 150);
    for producer in 0..3 {
        let seqs: Vec<u32> =
            received.iter().filter(|(p, _)| *p == producer).map(|(_, seq)| *seq).collect();
        assert_eq!(seqs, (0..50).collect::<Vec<_>>());
    }

    let metrics = queue.metrics();
    assert_eq!(metrics.total_added, 150);
    assert_eq!(metrics.total_delivered, 150);
    assert_eq!(metrics.current_size, 0);
}

/// Ensures a consumer blocked on an empty queue is released promptly by
/// `destroy`, and that every later call observes the destroyed state.
#[test]
fn test_destroy_releases_blocked_consumers() {
    init_test_tracing();
    let queue: SimpleQueue<String> = SimpleQueue::new();

    let waiters: Vec<_> = (0..8)
        .map(|_| {
            let queue = queue.clone();
            thread::spawn(move || {
                let start = Instant::now();
                let result = queue.next();
                (result, start.elapsed())
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(30));
    queue.destroy();

    for waiter in waiters {
        let (result, waited) = waiter.join().unwrap();
        assert_eq!(result, None);
        assert!(waited < Duration::from_secs(2), "waiter held for {waited:?}");
    }

    assert_eq!(queue.next(), None);
    assert_eq!(queue.add("late".to_string()), Err(QueueError::Destroyed("late".to_string())));
    assert!(queue.is_destroyed());
}

/// Ensures the rejected item is handed back intact and can be re-queued
/// elsewhere.
#[test]
fn test_rejected_item_can_be_requeued() -> anyhow::Result<()> {
    let primary = SimpleQueue::new();
    let fallback = SimpleQueue::new();
    primary.clean();

    let payload = vec![0xde_u8, 0xad, 0xbe, 0xef];
    match primary.add(payload.clone()) {
        Err(err) => fallback.add(err.into_inner())?,
        Ok(()) => anyhow::bail!("destroyed queue accepted an item"),
    }

    assert_eq!(fallback.next(), Some(payload));
    assert_eq!(primary.metrics().rejected_after_destroy, 1);
    Ok(())
}

/// Validates a consumer loop written against the `Queue` trait.
#[test]
fn test_generic_consumer_loop() {
    fn consume_all<Q>(queue: Q) -> thread::JoinHandle<usize>
    where
        Q: Queue + Send + 'static,
    {
        thread::spawn(move || {
            let mut count = 0;
            while queue.next().is_some() {
                count += 1;
            }
            count
        })
    }

    let queue = SimpleQueue::new();
    let consumer = consume_all(queue.clone());
    for item in 0..25 {
        queue.add(item).unwrap();
    }
    while !queue.is_empty() {
        thread::sleep(Duration::from_millis(1));
    }
    thread::sleep(Duration::from_millis(20));
    queue.clean();

    assert_eq!(consumer.join().unwrap(), 25);
}
