//! Tests for scheduler builders

use std::collections::HashMap;
use std::time::Duration;

use prometheus_admission::builders::{build_schedulers, SchedulerBuilder};
use prometheus_admission::config::{SchedulerConfig, SchedulerSetConfig};
use prometheus_admission::core::{InMemoryAuditSink, QueuedTask, SchedulerError, Task};
use prometheus_admission::infra::queue::InMemoryQueue;
use prometheus_admission::runtime::TokioSpawner;

#[tokio::test]
async fn test_build_schedulers() {
    let mut schedulers = HashMap::new();
    schedulers.insert(
        "chat".to_string(),
        SchedulerConfig::new(10, Duration::from_secs(1)).with_concurrency(2),
    );
    schedulers.insert(
        "embed".to_string(),
        SchedulerConfig::new(100, Duration::from_secs(1)),
    );
    let cfg = SchedulerSetConfig { schedulers };

    let built = build_schedulers(
        &cfg,
        |_, _| Ok(InMemoryQueue::<QueuedTask>::new()),
        TokioSpawner::current().unwrap(),
    )
    .unwrap();

    assert_eq!(built.len(), 2);
    assert_eq!(built["chat"].config().concurrency, 2);
    assert_eq!(built["embed"].config().max_requests, 100);
}

#[tokio::test]
async fn test_build_schedulers_rejects_invalid_set() {
    let cfg = SchedulerSetConfig {
        schedulers: HashMap::new(),
    };
    let result = build_schedulers(
        &cfg,
        |_, _| Ok(InMemoryQueue::<QueuedTask>::new()),
        TokioSpawner::current().unwrap(),
    );
    assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));
}

#[tokio::test]
async fn test_queue_factory_error_propagates() {
    let mut schedulers = HashMap::new();
    schedulers.insert(
        "chat".to_string(),
        SchedulerConfig::new(10, Duration::from_secs(1)),
    );
    let cfg = SchedulerSetConfig { schedulers };

    let result = build_schedulers::<_, InMemoryQueue<QueuedTask>, _>(
        &cfg,
        |name, _| Err(SchedulerError::InvalidConfig(format!("no queue for {name}"))),
        TokioSpawner::current().unwrap(),
    );
    assert!(matches!(result, Err(SchedulerError::InvalidConfig(msg)) if msg.contains("chat")));
}

#[tokio::test(start_paused = true)]
async fn test_builder_with_audit_and_explicit_spawner() {
    let audit = InMemoryAuditSink::new(100);
    let scheduler = SchedulerBuilder::new(5, Duration::from_secs(1))
        .spawner(TokioSpawner::current().unwrap())
        .queue(InMemoryQueue::<QueuedTask>::with_capacity(16))
        .audit(Box::new(audit.clone()))
        .build()
        .unwrap();

    let handle = scheduler
        .submit(Task::new("audited", || async { Ok::<_, String>(1) }))
        .unwrap();
    assert_eq!(handle.await.unwrap(), 1);
    assert_eq!(audit.admission_order(), vec!["audited".to_string()]);
}

#[test]
fn test_builder_outside_runtime_needs_spawner() {
    let result = SchedulerBuilder::new(5, Duration::from_secs(1)).build();
    assert!(matches!(result, Err(SchedulerError::NoRuntime(_))));
}
