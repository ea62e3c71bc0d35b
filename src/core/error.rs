//! Error types for pool operations and job failures.

use thiserror::Error;

/// Errors returned from pool calls.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Job needs more units than the pool owns. It is never queued.
    #[error("capacity exceeded: job needs {requested} units, pool has {total}")]
    CapacityExceeded {
        /// Units the job asked for.
        requested: u32,
        /// Units the pool owns.
        total: u32,
    },
    /// Configuration rejected at construction.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Pool was killed and no longer accepts work.
    #[error("pool has been killed")]
    PoolKilled,
    /// Most recent job failure, reported by a drain.
    #[error(transparent)]
    Job(#[from] JobError),
    /// Runtime or thread setup failure with context.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Terminal failure of a single job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("job `{prefix}` ({command}) {kind}")]
pub struct JobError {
    /// Prefix of the failed job.
    pub prefix: String,
    /// Command of the failed job, shortened for display.
    pub command: String,
    /// What went wrong.
    pub kind: JobErrorKind,
}

/// How a job failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobErrorKind {
    /// The process could not be started.
    #[error("failed to start: {0}")]
    Launch(String),
    /// The process exited unsuccessfully or was killed by a signal.
    #[error("exited unsuccessfully (code: {code:?}, signal: {signal:?})")]
    Exit {
        /// Exit code, if the process exited normally.
        code: Option<i32>,
        /// Terminating signal, if any.
        signal: Option<i32>,
    },
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
