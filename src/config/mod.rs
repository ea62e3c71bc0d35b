//! Configuration model for shell pools.

pub mod pool;

pub use pool::{PoolConfig, DEFAULT_INLINE_COMMAND_LIMIT, DEFAULT_SHELL};
