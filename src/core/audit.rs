//! Audit sink implementations.
//!
//! The scheduler reports every lifecycle transition of a task to an optional
//! [`AuditSink`]. [`InMemoryAuditSink`] keeps a bounded ring of events and can
//! be cloned so the caller retains a reader after handing it to the scheduler.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::util::serde::TaskId;

/// Lifecycle transition being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditAction {
    /// Task accepted into the queue.
    Submitted,
    /// Task released from the queue and started.
    Admitted,
    /// Attempt failed and the task went back into the queue.
    Retried,
    /// Task resolved with a value.
    Completed,
    /// Task resolved with its final failure.
    Failed,
    /// Task discarded from the queue on shutdown.
    Dropped,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Submitted => "submitted",
            Self::Admitted => "admitted",
            Self::Retried => "retried",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Dropped => "dropped",
        };
        f.write_str(name)
    }
}

/// Audit event structure.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    /// Related task identifier.
    pub task_id: TaskId,
    /// Transition taken.
    pub action: AuditAction,
    /// 1-based attempt number the event belongs to.
    pub attempt: u32,
    /// Rate window generation current when the event was recorded.
    pub window: u64,
    /// When the event was recorded.
    pub at: Instant,
}

impl AuditEvent {
    /// Build an event stamped with the current time.
    pub fn new(task_id: impl Into<TaskId>, action: AuditAction, attempt: u32, window: u64) -> Self {
        Self {
            task_id: task_id.into(),
            action,
            attempt,
            window,
            at: Instant::now(),
        }
    }
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// In-memory audit sink for testing and dev.
///
/// Clones share the same buffer.
#[derive(Clone)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<VecDeque<AuditEvent>>>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(max_events.min(1024)))),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Events with the given action, oldest first.
    pub fn events_for(&self, action: AuditAction) -> Vec<AuditEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.action == action)
            .cloned()
            .collect()
    }

    /// Task ids in the order they were admitted.
    pub fn admission_order(&self) -> Vec<TaskId> {
        self.events_for(AuditAction::Admitted)
            .into_iter()
            .map(|event| event.task_id)
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

impl fmt::Debug for InMemoryAuditSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryAuditSink")
            .field("len", &self.events.lock().len())
            .field("max_events", &self.max_events)
            .finish()
    }
}
