//! # Prometheus Admission
//!
//! A client-side admission controller for calls to rate-limited services.
//!
//! Upstream APIs (LLM providers, embedding endpoints, search backends) usually
//! enforce two limits at once: a number of requests per time window and a
//! number of requests in flight. This crate holds submitted tasks in a
//! priority queue and releases them only while both limits have headroom.
//!
//! ## Key Features
//!
//! - **Rate Window**: At most `max_requests` admissions per `interval`, reset
//!   by a periodic timer
//! - **Concurrency Gate**: At most `concurrency` tasks executing at once
//! - **Priority Queue**: Higher priority first, FIFO within a priority
//! - **Retries**: Failed or panicking attempts are re-queued up to
//!   `retry_limit` times; the caller sees only the final outcome
//! - **Audit Trail**: Optional sink receives every lifecycle transition
//!
//! ## Scheduler
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use prometheus_admission::builders::SchedulerBuilder;
//! use prometheus_admission::core::Task;
//!
//! // 50 requests per minute, 4 at a time, 2 retries
//! let scheduler = SchedulerBuilder::new(50, Duration::from_secs(60))
//!     .concurrency(4)
//!     .retry_limit(2)
//!     .build()?;
//!
//! let handle = scheduler.submit(
//!     Task::new("summarize-17", move || {
//!         let client = client.clone();
//!         async move { client.summarize(17).await }
//!     })
//!     .with_priority(10),
//! )?;
//!
//! let summary = handle.await?;
//! scheduler.shutdown();
//! ```
//!
//! Configuration can also come from JSON or `ADMISSION_*` environment
//! variables, see [`config::SchedulerConfig`].

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core admission abstractions: tasks, limits and the scheduler loop.
pub mod core;
/// Configuration models for schedulers.
pub mod config;
/// Builders to construct schedulers from configuration.
pub mod builders;
/// Infrastructure adapters for task queues.
pub mod infra;
/// Runtime adapters for executing admitted tasks.
pub mod runtime;
/// Shared utilities.
pub mod util;

pub use crate::builders::SchedulerBuilder;
pub use crate::config::SchedulerConfig;
pub use crate::core::{Scheduler, SchedulerError, Task, TaskError, TaskHandle};
