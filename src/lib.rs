//! # Shell Pool
//!
//! A capacity-aware scheduler for heterogeneous shell commands.
//!
//! Every job declares how many abstract CPU units it needs. The pool owns a
//! fixed number of units and starts as many queued jobs as fit, scanning the
//! queue in submission order. A job that does not fit is skipped, so a
//! smaller job queued behind it may start first. When a job exits its units
//! are released and the queue is scanned again.
//!
//! ## Key Features
//!
//! - **No oversubscription**: committed units never exceed the pool total,
//!   and a job larger than the whole pool is rejected at submit time
//! - **Prefixed output**: stdout and stderr of every job are split into lines
//!   and forwarded to a shared [`LineSink`](core::LineSink) with the job prefix
//! - **Deterministic drain**: [`ShellPool::wait`](core::ShellPool::wait) blocks
//!   until nothing is queued or running and returns the last job failure
//! - **Fail fast**: with `stop_on_error`, the first failure kills everything
//!   outstanding
//! - **Long commands**: commands over the inline limit are staged into a
//!   script file instead of being passed on the command line
//!
//! ## Example
//!
//! ```rust,ignore
//! use shell_pool::config::PoolConfig;
//! use shell_pool::core::{JobSpec, ShellPool};
//!
//! let pool = ShellPool::new(PoolConfig::new().with_total_units(4))?;
//! let sleeper = JobSpec::new("echo hello && sleep 3 && echo goodbye");
//! pool.submit(sleeper.with_cpus(4).with_prefix("sleep"))?;
//! pool.submit(JobSpec::new("ls -lh").with_prefix("ls"))?;
//! pool.submit(JobSpec::new("ls -lh xxx").with_prefix("ls xxx"))?;
//!
//! if let Err(e) = pool.wait() {
//!     eprintln!("at least one job failed: {e}");
//! }
//! ```
//!
//! Inside an async context, use `wait_async` instead of the blocking `wait`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions and capacity accounting.
pub mod core;
/// Configuration models for pools.
pub mod config;
/// Runtime adapters for driving child processes.
pub mod runtime;
/// Shared utilities.
pub mod util;
