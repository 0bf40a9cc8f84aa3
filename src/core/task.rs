//! Task records: the unit of work, its scheduling metadata and its completion slot.
//!
//! A record is owned by exactly one place at a time. It is boxed into the
//! queue on submit, moved out into the executing future on admission, and
//! either moved back into the queue for a retry or consumed when its
//! completion slot is resolved.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;

use crate::core::{TaskError, TaskExecutor};
use crate::util::serde::{Priority, TaskId};

/// A unit of work submitted to a [`Scheduler`](crate::core::Scheduler).
pub struct Task<T, E> {
    id: TaskId,
    priority: Priority,
    executor: Arc<dyn TaskExecutor<T, E>>,
}

impl<T, E> Task<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Create a task with default priority.
    pub fn new<X>(id: impl Into<TaskId>, executor: X) -> Self
    where
        X: TaskExecutor<T, E>,
    {
        Self {
            id: id.into(),
            priority: Priority::DEFAULT,
            executor: Arc::new(executor),
        }
    }

    /// Set the scheduling priority. Higher runs sooner.
    #[must_use]
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Priority::new(priority);
        self
    }

    /// Caller-supplied identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Scheduling priority.
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Split into the queue-side record and the caller-side handle.
    pub(crate) fn into_parts(self) -> (QueuedTask, TaskHandle<T, E>) {
        let (slot, rx) = oneshot::channel();
        let handle = TaskHandle {
            id: self.id.clone(),
            rx,
        };
        let record = TaskRecord {
            id: self.id,
            priority: self.priority,
            retries: 0,
            executor: self.executor,
            last_failure: None,
            slot,
        };
        (QueuedTask::new(Box::new(record)), handle)
    }
}

impl<T, E> fmt::Debug for Task<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Future resolving to a submitted task's outcome.
///
/// Resolves with the executor's value, or with [`TaskError`] once retries are
/// exhausted. Dropping the handle does not cancel the task.
pub struct TaskHandle<T, E> {
    id: TaskId,
    rx: oneshot::Receiver<Result<T, TaskError<E>>>,
}

impl<T, E> TaskHandle<T, E> {
    /// Identifier of the task this handle observes.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl<T, E> Future for TaskHandle<T, E> {
    type Output = Result<T, TaskError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(TaskError::Shutdown)))
    }
}

impl<T, E> fmt::Debug for TaskHandle<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// A task waiting in a [`TaskQueue`](crate::core::TaskQueue).
pub struct QueuedTask {
    job: Box<dyn Job>,
}

impl QueuedTask {
    pub(crate) fn new(job: Box<dyn Job>) -> Self {
        Self { job }
    }

    pub(crate) fn into_job(self) -> Box<dyn Job> {
        self.job
    }

    /// Caller-supplied identifier.
    pub fn id(&self) -> &str {
        self.job.id()
    }

    /// Scheduling priority.
    pub fn priority(&self) -> Priority {
        self.job.priority()
    }

    /// How many times this task has already failed and been re-queued.
    pub fn retries(&self) -> u32 {
        self.job.retries()
    }

    /// 1-based number of the attempt this task will make when admitted.
    pub fn attempt(&self) -> u32 {
        self.job.attempt()
    }
}

impl fmt::Debug for QueuedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedTask")
            .field("id", &self.id())
            .field("priority", &self.priority())
            .field("retries", &self.retries())
            .finish()
    }
}

/// Result of running one attempt.
pub(crate) enum Attempt {
    /// The value is ready; calling `resolve` hands it to the task's handle.
    Succeeded {
        /// Identifier of the finished task.
        id: TaskId,
        /// Executions it took, including the first.
        attempts: u32,
        /// Resolves the completion slot with the value.
        resolve: Box<dyn FnOnce() + Send>,
    },
    /// The attempt failed; the record keeps the failure until it is retried
    /// or resolved.
    Failed(Box<dyn Job>),
}

/// Type-erased task record, so one scheduler can carry tasks of any output type.
pub(crate) trait Job: Send + 'static {
    fn id(&self) -> &str;
    fn priority(&self) -> Priority;
    fn retries(&self) -> u32;
    /// 1-based number of the current or most recent attempt.
    fn attempt(&self) -> u32 {
        self.retries().saturating_add(1)
    }
    /// Rendered form of the most recent failure, for logs.
    fn failure_summary(&self) -> Option<&str>;
    /// Count a failure as retried. Discards the recorded failure.
    fn mark_retry(&mut self);
    /// Execute one attempt. Never unwinds: panics become failures.
    fn run(self: Box<Self>) -> BoxFuture<'static, Attempt>;
    /// Resolve the completion slot with the most recent failure.
    fn resolve_failed(self: Box<Self>);
}

enum Failure<E> {
    Error(E),
    Panic(String),
}

struct TaskRecord<T, E> {
    id: TaskId,
    priority: Priority,
    retries: u32,
    executor: Arc<dyn TaskExecutor<T, E>>,
    last_failure: Option<Failure<E>>,
    slot: oneshot::Sender<Result<T, TaskError<E>>>,
}

impl<T, E> TaskRecord<T, E> {
    fn resolve(self, outcome: Result<T, TaskError<E>>) {
        if self.slot.send(outcome).is_err() {
            tracing::debug!(task_id = %self.id, "task handle dropped before resolution");
        }
    }
}

impl<T, E> Job for TaskRecord<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> Priority {
        self.priority
    }

    fn retries(&self) -> u32 {
        self.retries
    }

    fn failure_summary(&self) -> Option<&str> {
        match &self.last_failure {
            Some(Failure::Error(_)) => Some("executor returned an error"),
            Some(Failure::Panic(message)) => Some(message),
            None => None,
        }
    }

    fn mark_retry(&mut self) {
        self.retries += 1;
        self.last_failure = None;
    }

    fn run(mut self: Box<Self>) -> BoxFuture<'static, Attempt> {
        let executor = Arc::clone(&self.executor);
        async move {
            let outcome = AssertUnwindSafe(async move { executor.execute().await })
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(value)) => {
                    let id = self.id.clone();
                    let attempts = self.attempt();
                    let record = *self;
                    Attempt::Succeeded {
                        id,
                        attempts,
                        resolve: Box::new(move || record.resolve(Ok(value))),
                    }
                }
                Ok(Err(reason)) => {
                    self.last_failure = Some(Failure::Error(reason));
                    Attempt::Failed(self)
                }
                Err(payload) => {
                    self.last_failure = Some(Failure::Panic(panic_message(payload.as_ref())));
                    Attempt::Failed(self)
                }
            }
        }
        .boxed()
    }

    fn resolve_failed(mut self: Box<Self>) {
        let attempts = self.attempt();
        match self.last_failure.take() {
            Some(Failure::Error(reason)) => self.resolve(Err(TaskError::Failed { attempts, reason })),
            Some(Failure::Panic(message)) => {
                self.resolve(Err(TaskError::Panicked { attempts, message }));
            }
            None => {
                tracing::error!(task_id = %self.id, "resolving failed task with no recorded failure");
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
