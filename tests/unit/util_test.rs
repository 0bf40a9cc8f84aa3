//! Tests for utility functions

use prometheus_admission::util::{Priority, TaskId};

#[test]
fn test_priority_ordering() {
    assert!(Priority::new(10) > Priority::new(1));
    assert!(Priority::new(0) > Priority::new(-5));
    assert_eq!(Priority::default(), Priority::DEFAULT);
}

#[test]
fn test_priority_serde_is_transparent() {
    let json = serde_json::to_string(&Priority::new(7)).unwrap();
    assert_eq!(json, "7");
    let back: Priority = serde_json::from_str("-3").unwrap();
    assert_eq!(back.value(), -3);
}

#[test]
fn test_task_id() {
    let id: TaskId = "embed-12345".to_string();
    assert_eq!(id, "embed-12345");
}
