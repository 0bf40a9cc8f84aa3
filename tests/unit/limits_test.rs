//! Tests for the rate window, concurrency gate and queue

use std::time::Duration;

use prometheus_admission::core::{ConcurrencyGate, SchedulerError, TaskQueue, WindowController};
use prometheus_admission::infra::queue::InMemoryQueue;
use prometheus_admission::util::Priority;

#[test]
fn test_window_counts_until_reset() {
    let mut window = WindowController::new(2, Duration::from_secs(1));
    window.record_admission().unwrap();
    window.record_admission().unwrap();
    assert!(!window.has_headroom());
    assert_eq!(window.record_admission(), Err(SchedulerError::WindowExhausted));
    assert_eq!(window.admitted(), 2);

    assert_eq!(window.reset(), 2);
    assert_eq!(window.generation(), 1);
    assert_eq!(window.remaining(), 2);
}

#[test]
fn test_gate_round_trip() {
    let mut gate = ConcurrencyGate::new(1);
    gate.acquire().unwrap();
    assert_eq!(gate.acquire(), Err(SchedulerError::ConcurrencyExhausted));
    gate.release().unwrap();
    assert_eq!(gate.release(), Err(SchedulerError::GateUnderflow));
    assert_eq!(gate.in_flight(), 0);
}

#[test]
fn test_queue_priority_then_arrival() {
    let mut queue = InMemoryQueue::new();
    queue.enqueue(Priority::new(1), "low-1");
    queue.enqueue(Priority::new(10), "high-1");
    queue.enqueue(Priority::new(1), "low-2");
    queue.enqueue(Priority::new(10), "high-2");

    let order: Vec<_> = std::iter::from_fn(|| queue.dequeue_highest()).collect();
    assert_eq!(order, vec!["high-1", "high-2", "low-1", "low-2"]);
    assert!(queue.is_empty());
}
