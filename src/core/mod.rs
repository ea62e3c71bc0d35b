//! Core scheduling: job records, capacity accounting, admission, process
//! launch, output multiplexing and the pool facade.

pub mod error;
pub mod executor;
pub mod job;
pub(crate) mod launcher;
pub mod ledger;
pub mod multiplexer;
pub(crate) mod notifier;
pub mod planner;
pub mod shell_pool;
pub mod sink;

pub use error::{AppResult, JobError, JobErrorKind, SchedulerError};
pub use executor::{ExitReport, Invocation, ProcessStarter, ShellStarter};
pub use job::{summarize, JobId, JobRecord, JobSpec, JobState, SUMMARY_LEN};
pub use launcher::{CPUS_ENV, PREFIX_ENV};
pub use ledger::ResourceLedger;
pub use multiplexer::{LineSplitter, Multiplexer, MAX_PENDING_LINE};
pub use planner::plan;
pub use shell_pool::{PoolStats, ShellPool};
pub use sink::{
    CapturedLine, InMemorySink, LineSink, OutputLine, StreamKind, TracingSink, WriterSink,
};
