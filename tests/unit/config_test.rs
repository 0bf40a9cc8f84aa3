//! Tests for configuration validation

use std::collections::HashMap;
use std::time::Duration;

use prometheus_admission::config::{SchedulerConfig, SchedulerSetConfig};

#[test]
fn test_scheduler_config_validation() {
    let valid = SchedulerConfig::new(5, Duration::from_secs(1)).with_concurrency(2);
    assert!(valid.validate().is_ok());
}

#[test]
fn test_scheduler_config_invalid_max_requests() {
    let invalid = SchedulerConfig::new(0, Duration::from_secs(1));
    assert!(invalid.validate().is_err());
}

#[test]
fn test_scheduler_config_invalid_interval() {
    let invalid = SchedulerConfig::new(5, Duration::from_micros(500));
    assert_eq!(invalid.interval_ms, 0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_scheduler_config_invalid_concurrency() {
    let invalid = SchedulerConfig::new(5, Duration::from_secs(1)).with_concurrency(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_zero_retry_limit_is_valid() {
    let cfg = SchedulerConfig::new(5, Duration::from_secs(1)).with_retry_limit(0);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_scheduler_config_from_json() {
    let cfg = SchedulerConfig::from_json_str(
        r#"{"max_requests": 50, "interval_ms": 60000, "concurrency": 4, "retry_limit": 2}"#,
    )
    .unwrap();
    assert_eq!(cfg.max_requests, 50);
    assert_eq!(cfg.interval(), Duration::from_secs(60));
    assert_eq!(cfg.concurrency, 4);
    assert_eq!(cfg.retry_limit, 2);
}

#[test]
fn test_scheduler_config_from_json_rejects_zero() {
    let err = SchedulerConfig::from_json_str(r#"{"max_requests": 0, "interval_ms": 1000}"#)
        .unwrap_err();
    assert!(err.contains("max_requests"));
}

#[test]
fn test_scheduler_set_config_validation() {
    let mut schedulers = HashMap::new();
    schedulers.insert(
        "openai".to_string(),
        SchedulerConfig::new(60, Duration::from_secs(60)).with_concurrency(8),
    );
    schedulers.insert(
        "embeddings".to_string(),
        SchedulerConfig::new(300, Duration::from_secs(60)),
    );

    let config = SchedulerSetConfig { schedulers };
    assert!(config.validate().is_ok());
}

#[test]
fn test_scheduler_set_config_empty() {
    let config = SchedulerSetConfig {
        schedulers: HashMap::new(),
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_scheduler_set_config_names_bad_entry() {
    let err = SchedulerSetConfig::from_json_str(
        r#"{"schedulers": {"search": {"max_requests": 10, "interval_ms": 0}}}"#,
    )
    .unwrap_err();
    assert!(err.contains("search"));
}
