//! Infrastructure adapters for task queues.

pub mod queue;
pub use queue::InMemoryQueue;
