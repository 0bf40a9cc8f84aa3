//! Core admission abstractions: tasks, limits and the scheduler loop.

pub mod audit;
pub mod error;
pub mod executor;
pub mod gate;
pub mod scheduler;
pub mod task;
pub mod window;

pub use audit::{AuditAction, AuditEvent, AuditSink, InMemoryAuditSink};
pub use error::{AppResult, SchedulerError, TaskError};
pub use executor::TaskExecutor;
pub use gate::ConcurrencyGate;
pub use scheduler::{Scheduler, SchedulerStats, Spawn, TaskQueue};
pub use task::{QueuedTask, Task, TaskHandle};
pub use window::WindowController;
