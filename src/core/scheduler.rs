//! Rate- and concurrency-bounded admission loop.
//!
//! [`Scheduler`] owns a priority queue, a [`WindowController`] and a
//! [`ConcurrencyGate`] behind a single `parking_lot::Mutex`. Every event that
//! can change their state (a submission, a window reset, a finished attempt)
//! runs the same admission pass: while the queue is non-empty and both limits
//! have headroom, dequeue the highest-priority task, take a gate slot, count a
//! window admission and spawn the task. Dequeue, acquire and count happen in
//! one critical section, so concurrent passes cannot double-dispatch.
//!
//! Attempts run on the configured [`Spawn`]er and report back through
//! `finish`, which releases the gate slot, re-queues or resolves the task and
//! runs another pass. No lock is held across an `.await` or a spawn.
//!
//! Audit events are recorded while the state lock is held, so each task's
//! trail follows its actual transitions. Lock order is state, then audit.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;
use crate::core::task::{Attempt, Job};
use crate::core::{
    AuditAction, AuditEvent, AuditSink, ConcurrencyGate, QueuedTask, SchedulerError, Task,
    TaskHandle, WindowController,
};
use crate::infra::queue::InMemoryQueue;
use crate::runtime::TokioSpawner;
use crate::util::serde::Priority;

/// Abstraction for spawning task execution on a runtime.
pub trait Spawn {
    /// Spawn an async task that returns a future.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Abstraction for the scheduler's holding area.
///
/// Implementations must dequeue in descending priority and, within one
/// priority, in enqueue order.
pub trait TaskQueue<J> {
    /// Insert an item.
    fn enqueue(&mut self, priority: Priority, item: J);
    /// Remove the highest-priority item, oldest first within a priority.
    fn dequeue_highest(&mut self) -> Option<J>;
    /// Current depth.
    fn len(&self) -> usize;
    /// Whether nothing is waiting.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Remove every item, in dequeue order.
    fn drain(&mut self) -> Vec<J>;
}

/// Point-in-time view of scheduler activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Tasks waiting in the queue, including ones waiting for a retry.
    pub queued: usize,
    /// Tasks currently executing.
    pub in_flight: u32,
    /// Admissions counted in the current window.
    pub window_admissions: u32,
    /// Number of window resets since construction.
    pub window_generation: u64,
    /// Tasks accepted by `submit`.
    pub submitted: u64,
    /// Attempts started, retries included.
    pub admitted: u64,
    /// Tasks resolved with a value.
    pub completed: u64,
    /// Tasks resolved with their final failure.
    pub failed: u64,
    /// Failed attempts that were queued again.
    pub retried: u64,
    /// Tasks discarded from the queue on shutdown.
    pub dropped: u64,
    /// Highest `in_flight` seen.
    pub peak_in_flight: u32,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: u64,
    admitted: u64,
    completed: u64,
    failed: u64,
    retried: u64,
    dropped: u64,
    peak_in_flight: u32,
}

/// Everything guarded by the scheduler's one lock.
struct SchedulerState<Q> {
    queue: Q,
    window: WindowController,
    gate: ConcurrencyGate,
    counters: Counters,
}

/// Outcome of asking the state for the next admission.
enum Pass {
    Admitted(QueuedTask),
    Idle,
    GateFull,
    WindowFull,
}

impl<Q> SchedulerState<Q>
where
    Q: TaskQueue<QueuedTask>,
{
    fn next_admission(&mut self) -> Result<Pass, SchedulerError> {
        if self.queue.is_empty() {
            return Ok(Pass::Idle);
        }
        if !self.gate.has_headroom() {
            return Ok(Pass::GateFull);
        }
        if !self.window.has_headroom() {
            return Ok(Pass::WindowFull);
        }

        self.gate.acquire()?;
        if let Err(err) = self.window.record_admission() {
            self.gate.release()?;
            return Err(err);
        }
        let Some(task) = self.queue.dequeue_highest() else {
            self.gate.release()?;
            return Ok(Pass::Idle);
        };

        self.counters.admitted += 1;
        self.counters.peak_in_flight = self.counters.peak_in_flight.max(self.gate.in_flight());
        Ok(Pass::Admitted(task))
    }

    fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            queued: self.queue.len(),
            in_flight: self.gate.in_flight(),
            window_admissions: self.window.admitted(),
            window_generation: self.window.generation(),
            submitted: self.counters.submitted,
            admitted: self.counters.admitted,
            completed: self.counters.completed,
            failed: self.counters.failed,
            retried: self.counters.retried,
            dropped: self.counters.dropped,
            peak_in_flight: self.counters.peak_in_flight,
        }
    }
}

/// What `finish` decided, carried out of the critical section.
enum Settled {
    Completed {
        id: String,
        attempts: u32,
        resolve: Box<dyn FnOnce() + Send>,
    },
    Retrying {
        id: String,
        attempt: u32,
        summary: Option<String>,
    },
    Exhausted(Box<dyn Job>),
}

struct Shared<S, Q> {
    config: SchedulerConfig,
    state: Mutex<SchedulerState<Q>>,
    spawner: S,
    audit: Option<Mutex<Box<dyn AuditSink>>>,
    shutdown: AtomicBool,
    stop_timer: watch::Sender<bool>,
}

impl<S, Q> Shared<S, Q>
where
    S: Spawn + Send + Sync + 'static,
    Q: TaskQueue<QueuedTask> + Send + 'static,
{
    fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Admit as many queued tasks as the limits allow.
    fn pump(self: &Arc<Self>) {
        loop {
            let (task, window) = {
                let mut state = self.state.lock();
                if self.is_shut_down() {
                    return;
                }
                match state.next_admission() {
                    Ok(Pass::Admitted(task)) => {
                        let window = state.window.generation();
                        self.record(task.id(), AuditAction::Admitted, task.attempt(), window);
                        (task, window)
                    }
                    Ok(Pass::Idle) => return,
                    Ok(Pass::GateFull) => {
                        debug!(
                            queued = state.queue.len(),
                            in_flight = state.gate.in_flight(),
                            max_concurrency = state.gate.max_concurrency(),
                            "admission blocked by concurrency gate"
                        );
                        return;
                    }
                    Ok(Pass::WindowFull) => {
                        debug!(
                            queued = state.queue.len(),
                            window = state.window.generation(),
                            max_admissions = state.window.max_admissions(),
                            "admission blocked until window reset"
                        );
                        return;
                    }
                    Err(err) => {
                        error!(%err, "admission pass violated a scheduler invariant");
                        return;
                    }
                }
            };

            info!(
                task_id = %task.id(),
                priority = task.priority().value(),
                attempt = task.attempt(),
                window,
                "task admitted"
            );
            self.launch(task);
        }
    }

    fn launch(self: &Arc<Self>, task: QueuedTask) {
        let shared = Arc::clone(self);
        self.spawner.spawn(async move {
            let attempt = task.into_job().run().await;
            shared.finish(attempt);
        });
    }

    /// Settle a finished attempt, then run another pass.
    fn finish(self: &Arc<Self>, attempt: Attempt) {
        let settled = {
            let mut state = self.state.lock();
            let window = state.window.generation();
            if let Err(err) = state.gate.release() {
                error!(%err, "finished attempt had no gate slot");
            }
            match attempt {
                Attempt::Succeeded {
                    id,
                    attempts,
                    resolve,
                } => {
                    state.counters.completed += 1;
                    self.record(&id, AuditAction::Completed, attempts, window);
                    Settled::Completed {
                        id,
                        attempts,
                        resolve,
                    }
                }
                Attempt::Failed(mut job)
                    if job.retries() < self.config.retry_limit && !self.is_shut_down() =>
                {
                    let summary = job.failure_summary().map(str::to_owned);
                    job.mark_retry();
                    let id = job.id().to_owned();
                    let attempt = job.attempt();
                    state.counters.retried += 1;
                    self.record(&id, AuditAction::Retried, attempt, window);
                    state.queue.enqueue(job.priority(), QueuedTask::new(job));
                    Settled::Retrying {
                        id,
                        attempt,
                        summary,
                    }
                }
                Attempt::Failed(job) => {
                    state.counters.failed += 1;
                    self.record(job.id(), AuditAction::Failed, job.attempt(), window);
                    Settled::Exhausted(job)
                }
            }
        };

        match settled {
            Settled::Completed {
                id,
                attempts,
                resolve,
            } => {
                info!(task_id = %id, attempts, "task completed");
                resolve();
            }
            Settled::Retrying {
                id,
                attempt,
                summary,
            } => {
                warn!(
                    task_id = %id,
                    next_attempt = attempt,
                    failure = summary.as_deref().unwrap_or("unknown"),
                    "task attempt failed, re-queued"
                );
            }
            Settled::Exhausted(job) => {
                warn!(
                    task_id = %job.id(),
                    attempts = job.attempt(),
                    failure = job.failure_summary().unwrap_or("unknown"),
                    "task failed permanently"
                );
                job.resolve_failed();
            }
        }

        self.pump();
    }

    fn reset_window(&self) {
        let mut state = self.state.lock();
        let closed = state.window.reset();
        debug!(
            admitted = closed,
            window = state.window.generation(),
            queued = state.queue.len(),
            "rate window reset"
        );
    }

    fn stop(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        self.stop_timer.send_replace(true);

        let dropped = {
            let mut state = self.state.lock();
            let dropped = state.queue.drain();
            state.counters.dropped += dropped.len() as u64;
            let window = state.window.generation();
            for task in &dropped {
                self.record(task.id(), AuditAction::Dropped, task.attempt(), window);
            }
            dropped
        };
        info!(dropped = dropped.len(), "scheduler shut down");
    }

    /// Callers hold the state lock.
    fn record(&self, task_id: &str, action: AuditAction, attempt: u32, window: u64) {
        if let Some(audit) = &self.audit {
            audit
                .lock()
                .record(AuditEvent::new(task_id, action, attempt, window));
        }
    }
}

/// Resets the rate window every `period` until stopped or the scheduler is gone.
async fn window_timer<S, Q>(
    shared: Weak<Shared<S, Q>>,
    period: Duration,
    mut stop: watch::Receiver<bool>,
) where
    S: Spawn + Send + Sync + 'static,
    Q: TaskQueue<QueuedTask> + Send + 'static,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = stop.changed() => break,
        }
        let Some(shared) = shared.upgrade() else {
            break;
        };
        if shared.is_shut_down() {
            break;
        }
        shared.reset_window();
        shared.pump();
    }
    debug!("window timer stopped");
}

/// Admission controller bounding both rate and concurrency.
///
/// Construct with [`Scheduler::new`] inside a tokio runtime, or through
/// [`SchedulerBuilder`](crate::builders::SchedulerBuilder) to plug in a
/// different spawner, queue or audit sink. Task attempts run on the spawner;
/// the window timer always runs on the tokio runtime the scheduler was built
/// in. It starts at construction and stops on [`shutdown`](Self::shutdown)
/// or drop.
///
/// ```rust,ignore
/// use std::time::Duration;
/// use prometheus_admission::config::SchedulerConfig;
/// use prometheus_admission::core::{Scheduler, Task};
///
/// let scheduler = Scheduler::new(
///     SchedulerConfig::new(5, Duration::from_secs(1)).with_concurrency(2),
/// )?;
/// let handle = scheduler.submit(
///     Task::new("embed-42", || async { Ok::<_, std::io::Error>(42) }).with_priority(10),
/// )?;
/// assert_eq!(handle.await?, 42);
/// ```
pub struct Scheduler<S = TokioSpawner, Q = InMemoryQueue<QueuedTask>>
where
    S: Spawn + Send + Sync + 'static,
    Q: TaskQueue<QueuedTask> + Send + 'static,
{
    shared: Arc<Shared<S, Q>>,
}

impl Scheduler {
    /// Scheduler on the current tokio runtime with an in-memory queue.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::InvalidConfig`] for zero limits,
    /// [`SchedulerError::NoRuntime`] outside a tokio runtime.
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        Self::from_parts(config, TokioSpawner::current()?, InMemoryQueue::new(), None)
    }
}

impl<S, Q> Scheduler<S, Q>
where
    S: Spawn + Send + Sync + 'static,
    Q: TaskQueue<QueuedTask> + Send + 'static,
{
    /// Assemble a scheduler from its parts and start the window timer on the
    /// current tokio runtime.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::InvalidConfig`] for zero limits,
    /// [`SchedulerError::NoRuntime`] outside a tokio runtime.
    pub fn from_parts(
        config: SchedulerConfig,
        spawner: S,
        queue: Q,
        audit: Option<Box<dyn AuditSink>>,
    ) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::InvalidConfig)?;
        let timer = TokioSpawner::current()?;

        let window = WindowController::new(config.max_requests, config.interval());
        let period = window.period();
        let (stop_timer, stop_rx) = watch::channel(false);
        let shared = Arc::new(Shared {
            state: Mutex::new(SchedulerState {
                queue,
                window,
                gate: ConcurrencyGate::new(config.concurrency),
                counters: Counters::default(),
            }),
            spawner,
            audit: audit.map(Mutex::new),
            shutdown: AtomicBool::new(false),
            stop_timer,
            config,
        });

        timer.spawn(window_timer(Arc::downgrade(&shared), period, stop_rx));

        info!(
            max_requests = shared.config.max_requests,
            interval_ms = shared.config.interval_ms,
            concurrency = shared.config.concurrency,
            retry_limit = shared.config.retry_limit,
            "scheduler started"
        );
        Ok(Self { shared })
    }

    /// Queue a task and return a handle to its eventual outcome.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Shutdown`] once [`shutdown`](Self::shutdown) has run.
    pub fn submit<T, E>(&self, task: Task<T, E>) -> Result<TaskHandle<T, E>, SchedulerError>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        let (queued, handle) = task.into_parts();
        let priority = queued.priority();
        {
            let mut state = self.shared.state.lock();
            if self.shared.is_shut_down() {
                warn!(task_id = %handle.id(), "submit rejected: scheduler is shut down");
                return Err(SchedulerError::Shutdown);
            }
            state.counters.submitted += 1;
            let window = state.window.generation();
            self.shared
                .record(handle.id(), AuditAction::Submitted, 1, window);
            state.queue.enqueue(priority, queued);
        }

        debug!(task_id = %handle.id(), priority = priority.value(), "task queued");
        self.shared.pump();
        Ok(handle)
    }

    /// Run an admission pass now. Safe to call at any time; it never admits
    /// beyond what the limits allow.
    pub fn schedule_pass(&self) {
        self.shared.pump();
    }

    /// Snapshot of queue depth, limits in use and lifetime counters.
    pub fn stats(&self) -> SchedulerStats {
        self.shared.state.lock().snapshot()
    }

    /// Configuration this scheduler runs with.
    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    /// Whether [`shutdown`](Self::shutdown) has run.
    pub fn is_shut_down(&self) -> bool {
        self.shared.is_shut_down()
    }

    /// Stop the window timer, reject new submissions and drop queued tasks.
    ///
    /// Handles of dropped tasks resolve with
    /// [`TaskError::Shutdown`](crate::core::TaskError::Shutdown). Tasks already
    /// executing run to completion and resolve normally, but a failed attempt
    /// is no longer retried. Calling this more than once is a no-op.
    pub fn shutdown(&self) {
        self.shared.stop();
    }
}

impl<S, Q> Drop for Scheduler<S, Q>
where
    S: Spawn + Send + Sync + 'static,
    Q: TaskQueue<QueuedTask> + Send + 'static,
{
    fn drop(&mut self) {
        self.shared.stop();
    }
}
