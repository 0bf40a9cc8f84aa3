//! Builders to construct schedulers from configuration.

use std::collections::HashMap;
use std::time::Duration;

use crate::config::{SchedulerConfig, SchedulerSetConfig};
use crate::core::{AuditSink, QueuedTask, Scheduler, SchedulerError, Spawn, TaskQueue};
use crate::infra::queue::InMemoryQueue;
use crate::runtime::TokioSpawner;

/// Step-by-step construction of a [`Scheduler`].
///
/// Defaults to the current tokio runtime and an [`InMemoryQueue`]; either can
/// be swapped, which changes the builder's type parameters.
///
/// ```rust,ignore
/// let scheduler = SchedulerBuilder::new(50, Duration::from_secs(60))
///     .concurrency(4)
///     .retry_limit(2)
///     .audit(Box::new(InMemoryAuditSink::new(10_000)))
///     .build()?;
/// ```
pub struct SchedulerBuilder<S = TokioSpawner, Q = InMemoryQueue<QueuedTask>> {
    config: SchedulerConfig,
    spawner: Option<S>,
    queue: Q,
    audit: Option<Box<dyn AuditSink>>,
}

impl SchedulerBuilder {
    /// Start from a rate limit of `max_requests` per `interval`.
    #[must_use]
    pub fn new(max_requests: u32, interval: Duration) -> Self {
        Self::from_config(SchedulerConfig::new(max_requests, interval))
    }

    /// Start from an existing configuration.
    #[must_use]
    pub fn from_config(config: SchedulerConfig) -> Self {
        Self {
            config,
            spawner: TokioSpawner::current().ok(),
            queue: InMemoryQueue::new(),
            audit: None,
        }
    }
}

impl<S, Q> SchedulerBuilder<S, Q>
where
    S: Spawn + Send + Sync + 'static,
    Q: TaskQueue<QueuedTask> + Send + 'static,
{
    /// Maximum simultaneously executing tasks.
    #[must_use]
    pub const fn concurrency(mut self, concurrency: u32) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// Retries allowed after the first failed attempt.
    #[must_use]
    pub const fn retry_limit(mut self, retry_limit: u32) -> Self {
        self.config.retry_limit = retry_limit;
        self
    }

    /// Run tasks and the window timer on a different spawner.
    #[must_use]
    pub fn spawner<S2>(self, spawner: S2) -> SchedulerBuilder<S2, Q>
    where
        S2: Spawn + Send + Sync + 'static,
    {
        SchedulerBuilder {
            config: self.config,
            spawner: Some(spawner),
            queue: self.queue,
            audit: self.audit,
        }
    }

    /// Hold waiting tasks in a different queue.
    #[must_use]
    pub fn queue<Q2>(self, queue: Q2) -> SchedulerBuilder<S, Q2>
    where
        Q2: TaskQueue<QueuedTask> + Send + 'static,
    {
        SchedulerBuilder {
            config: self.config,
            spawner: self.spawner,
            queue,
            audit: self.audit,
        }
    }

    /// Record task lifecycle events to `sink`.
    #[must_use]
    pub fn audit(mut self, sink: Box<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Configuration the scheduler will be built with.
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Build the scheduler and start its window timer.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::NoRuntime`] if no spawner was set and the builder was
    /// created outside a tokio runtime, [`SchedulerError::InvalidConfig`] for
    /// zero limits.
    pub fn build(self) -> Result<Scheduler<S, Q>, SchedulerError> {
        let spawner = self.spawner.ok_or_else(|| {
            SchedulerError::NoRuntime("no spawner set and no tokio runtime found".into())
        })?;
        Scheduler::from_parts(self.config, spawner, self.queue, self.audit)
    }
}

/// Build one scheduler per named profile using the provided queue factory.
///
/// # Errors
///
/// [`SchedulerError::InvalidConfig`] if the set fails validation, or whatever
/// the queue factory returns.
pub fn build_schedulers<S, Q, FQ>(
    cfg: &SchedulerSetConfig,
    mut queue_factory: FQ,
    spawner: S,
) -> Result<HashMap<String, Scheduler<S, Q>>, SchedulerError>
where
    S: Spawn + Clone + Send + Sync + 'static,
    Q: TaskQueue<QueuedTask> + Send + 'static,
    FQ: FnMut(&str, &SchedulerConfig) -> Result<Q, SchedulerError>,
{
    cfg.validate()
        .map_err(|e| SchedulerError::InvalidConfig(format!("config invalid: {e}")))?;

    let mut schedulers = HashMap::new();
    for (name, scheduler_cfg) in &cfg.schedulers {
        let queue = queue_factory(name, scheduler_cfg)?;
        let scheduler = Scheduler::from_parts(scheduler_cfg.clone(), spawner.clone(), queue, None)?;
        schedulers.insert(name.clone(), scheduler);
    }

    Ok(schedulers)
}
