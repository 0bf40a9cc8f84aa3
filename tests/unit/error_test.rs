//! Tests for error types

use prometheus_admission::core::{SchedulerError, TaskError};

#[test]
fn test_invalid_config_error() {
    let err = SchedulerError::InvalidConfig("max_requests must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: max_requests must be greater than 0"
    );
}

#[test]
fn test_shutdown_error() {
    let err = SchedulerError::Shutdown;
    assert_eq!(format!("{}", err), "scheduler is shut down");
}

#[test]
fn test_task_failed_display() {
    let err: TaskError<String> = TaskError::Failed {
        attempts: 3,
        reason: "429 Too Many Requests".to_string(),
    };
    assert_eq!(
        format!("{}", err),
        "task failed after 3 attempt(s): 429 Too Many Requests"
    );
}

#[test]
fn test_task_panicked_has_no_reason() {
    let err: TaskError<String> = TaskError::Panicked {
        attempts: 1,
        message: "index out of bounds".to_string(),
    };
    assert_eq!(err.attempts(), Some(1));
    assert!(err.into_reason().is_none());
}

#[test]
fn test_task_error_into_anyhow() {
    let err: TaskError<std::io::Error> = TaskError::Failed {
        attempts: 2,
        reason: std::io::Error::other("connection reset"),
    };
    let app: anyhow::Error = err.into();
    assert!(app.to_string().contains("connection reset"));
}
