//! Runtime adapters for executing admitted tasks.

pub mod tokio_spawner;

pub use tokio_spawner::TokioSpawner;
