//! Runtime adapters for driving child processes.

pub mod tokio_spawner;

pub use tokio_spawner::TokioSpawner;
