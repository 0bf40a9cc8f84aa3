//! Tests for audit sinks

use prometheus_admission::core::{AuditAction, AuditEvent, AuditSink, InMemoryAuditSink};

#[tokio::test]
async fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);
    sink.record(AuditEvent::new("task-1", AuditAction::Submitted, 1, 0));
    sink.record(AuditEvent::new("task-1", AuditAction::Admitted, 1, 0));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].action, AuditAction::Admitted);
    assert_eq!(events[1].task_id, "task-1");
}

#[tokio::test]
async fn test_events_for_filters_by_action() {
    let mut sink = InMemoryAuditSink::new(10);
    for (id, action) in [
        ("a", AuditAction::Admitted),
        ("a", AuditAction::Retried),
        ("b", AuditAction::Admitted),
        ("a", AuditAction::Admitted),
    ] {
        sink.record(AuditEvent::new(id, action, 1, 0));
    }

    assert_eq!(sink.events_for(AuditAction::Retried).len(), 1);
    assert_eq!(sink.admission_order(), vec!["a", "b", "a"]);
}

#[test]
fn test_action_display() {
    assert_eq!(AuditAction::Dropped.to_string(), "dropped");
    assert_eq!(AuditAction::Completed.to_string(), "completed");
}
