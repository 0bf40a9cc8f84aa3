//! Error types for scheduler operations.

use thiserror::Error;

/// Errors produced by scheduler components.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// Configuration rejected at construction.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The current rate window has no admissions left.
    #[error("rate window exhausted")]
    WindowExhausted,
    /// Every concurrency slot is taken.
    #[error("concurrency limit reached")]
    ConcurrencyExhausted,
    /// A concurrency slot was released without a matching acquire.
    #[error("concurrency gate released more often than acquired")]
    GateUnderflow,
    /// The scheduler has been shut down and accepts no more work.
    #[error("scheduler is shut down")]
    Shutdown,
    /// No async runtime was available to drive the scheduler.
    #[error("no async runtime available: {0}")]
    NoRuntime(String),
}

/// Terminal failure of a submitted task, as observed through its handle.
///
/// Only the most recent failure is kept; reasons from earlier attempts are
/// discarded when the task is retried.
#[derive(Debug, Error)]
pub enum TaskError<E> {
    /// The task's operation returned an error on its final attempt.
    #[error("task failed after {attempts} attempt(s): {reason}")]
    Failed {
        /// Total number of executions, including the first.
        attempts: u32,
        /// Error returned by the final execution.
        reason: E,
    },
    /// The task's operation panicked on its final attempt.
    #[error("task panicked after {attempts} attempt(s): {message}")]
    Panicked {
        /// Total number of executions, including the first.
        attempts: u32,
        /// Panic payload rendered as text.
        message: String,
    },
    /// The scheduler shut down while the task was still queued.
    #[error("scheduler shut down before the task ran to completion")]
    Shutdown,
}

impl<E> TaskError<E> {
    /// Number of executions made before the task gave up, if it ran at all.
    pub const fn attempts(&self) -> Option<u32> {
        match self {
            Self::Failed { attempts, .. } | Self::Panicked { attempts, .. } => Some(*attempts),
            Self::Shutdown => None,
        }
    }

    /// Borrow the final error returned by the task's operation.
    pub const fn reason(&self) -> Option<&E> {
        match self {
            Self::Failed { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// Take the final error returned by the task's operation.
    pub fn into_reason(self) -> Option<E> {
        match self {
            Self::Failed { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
