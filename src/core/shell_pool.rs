//! The shell pool facade: capacity-aware admission of shell commands.
//!
//! All pool state sits behind one `parking_lot::Mutex`. Submits and the
//! notifier thread both plan under that lock, so admission always sees the
//! current ledger. Drain waits block on a `parking_lot::Condvar` that is
//! signalled after every completion and every kill.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::Sender;
use parking_lot::{Condvar, Mutex};
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use crate::config::PoolConfig;
use crate::core::launcher::{Launcher, NotifierMessage};
use crate::core::{
    notifier, planner, JobError, JobId, JobRecord, JobSpec, LineSink, ProcessStarter,
    ResourceLedger, SchedulerError, ShellStarter, WriterSink,
};
use crate::runtime::TokioSpawner;

/// Worker threads for the runtime a pool builds when none is running.
const OWNED_RUNTIME_THREADS: usize = 2;

/// Snapshot of pool utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Total units the pool owns.
    pub total_units: u32,
    /// Units committed to running jobs.
    pub used_units: u32,
    /// Jobs waiting for capacity.
    pub waiting_jobs: usize,
    /// Ids of running jobs, ascending.
    pub running_jobs: Vec<JobId>,
    /// Jobs accepted by submit.
    pub submitted: u64,
    /// Jobs that exited successfully.
    pub completed: u64,
    /// Jobs that failed to start or exited unsuccessfully.
    pub failed: u64,
    /// Jobs dropped or killed by a kill.
    pub cancelled: u64,
    /// Whether the pool has been killed.
    pub killed: bool,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
}

#[derive(Debug)]
pub(crate) struct PoolState {
    pub ledger: ResourceLedger,
    pub waiting: Vec<JobRecord>,
    pub running: BTreeMap<JobId, JobRecord>,
    pub last_error: Option<JobError>,
    pub killed: bool,
    /// Bumped by every kill. Completions carry the value from launch time.
    pub generation: u64,
    pub next_id: JobId,
    pub counters: Counters,
}

impl PoolState {
    fn new(total_units: u32) -> Self {
        Self {
            ledger: ResourceLedger::new(total_units),
            waiting: Vec::new(),
            running: BTreeMap::new(),
            last_error: None,
            killed: false,
            generation: 0,
            next_id: 0,
            counters: Counters::default(),
        }
    }

    pub fn is_drained(&self) -> bool {
        self.waiting.is_empty() && self.running.is_empty()
    }
}

/// State shared between the facade and the notifier thread.
pub(crate) struct Shared<S> {
    pub config: PoolConfig,
    pub state: Mutex<PoolState>,
    pub drained: Condvar,
    pub launcher: Launcher<S>,
}

impl<S: ProcessStarter> Shared<S> {
    /// Admit whatever fits and launch it. Caller holds the lock.
    pub fn admit_locked(&self, state: &mut PoolState) {
        let admitted = planner::plan(&mut state.waiting, &mut state.ledger);
        for mut record in admitted {
            record.admitted_at = Some(Instant::now());
            self.launcher.launch(&record, state.generation);
            debug!(
                job_id = record.id,
                units = record.units(),
                committed = state.ledger.committed(),
                "admitted job"
            );
            state.running.insert(record.id, record);
        }
    }

    /// Drop waiting jobs, signal running ones and reset the ledger. Caller
    /// holds the lock. Does not wait for killed processes to exit.
    pub fn kill_locked(&self, state: &mut PoolState, reason: &str) {
        let dropped = state.waiting.len();
        let killed = state.running.len();

        state.waiting.clear();
        for record in state.running.values() {
            record.cancel.cancel();
        }
        state.running.clear();
        state.ledger.reset();
        state.generation += 1;
        state.killed = true;
        state.counters.cancelled += (dropped + killed) as u64;

        warn!(dropped, killed, reason, "killed pool");
        self.drained.notify_all();
    }

    /// Block until nothing is waiting or running.
    pub fn wait_drained(&self) -> Result<(), SchedulerError> {
        let mut state = self.state.lock();
        while !state.is_drained() {
            self.drained.wait(&mut state);
        }
        state
            .last_error
            .clone()
            .map_or(Ok(()), |e| Err(SchedulerError::Job(e)))
    }
}

/// Pool running shell commands against a fixed number of CPU units.
///
/// # Example
///
/// ```rust,ignore
/// use shell_pool::config::PoolConfig;
/// use shell_pool::core::{JobSpec, ShellPool};
///
/// let pool = ShellPool::new(PoolConfig::new().with_total_units(4))?;
/// pool.submit(JobSpec::new("make -j4").with_cpus(4).with_prefix("build"))?;
/// pool.submit(JobSpec::new("ls -lh").with_prefix("ls"))?;
/// pool.wait()?;
/// ```
pub struct ShellPool<S: ProcessStarter = ShellStarter> {
    shared: Arc<Shared<S>>,
    events: Sender<NotifierMessage>,
    notifier: Option<JoinHandle<()>>,
    runtime: Option<Runtime>,
}

impl<S: ProcessStarter> std::fmt::Debug for ShellPool<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellPool")
            .field("config", &self.shared.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl ShellPool<ShellStarter> {
    /// Create a pool that writes job output to stderr.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidConfig` if the configuration is invalid.
    pub fn new(config: PoolConfig) -> Result<Self, SchedulerError> {
        let sink = Arc::new(WriterSink::stderr(&config.log_prefix));
        Self::with_sink(config, sink)
    }

    /// Create a pool that writes job output to `sink`.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidConfig` if the configuration is invalid.
    pub fn with_sink(config: PoolConfig, sink: Arc<dyn LineSink>) -> Result<Self, SchedulerError> {
        Self::with_starter(config, sink, ShellStarter)
    }
}

impl<S: ProcessStarter> ShellPool<S> {
    /// Create a pool with a custom process starter.
    ///
    /// Jobs run on the ambient tokio runtime when called from inside one,
    /// otherwise on a small runtime owned by the pool.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::InvalidConfig` if the configuration is invalid
    /// - `SchedulerError::Backend` if the runtime or notifier thread cannot start
    pub fn with_starter(
        config: PoolConfig,
        sink: Arc<dyn LineSink>,
        starter: S,
    ) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::InvalidConfig)?;

        let (spawner, runtime) = match TokioSpawner::current() {
            Some(spawner) => (spawner, None),
            None => {
                let (spawner, runtime) = TokioSpawner::with_worker_threads(OWNED_RUNTIME_THREADS)
                    .map_err(|e| SchedulerError::Backend(format!("failed to build runtime: {e}")))?;
                (spawner, Some(runtime))
            }
        };

        let (events, receiver) = crossbeam_channel::unbounded();
        let launcher = Launcher::new(&config, Arc::new(starter), sink, spawner, events.clone());
        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState::new(config.total_units)),
            drained: Condvar::new(),
            launcher,
            config,
        });
        let notifier = notifier::spawn(Arc::clone(&shared), receiver)
            .map_err(|e| SchedulerError::Backend(format!("failed to start notifier: {e}")))?;

        info!(
            total_units = shared.config.total_units,
            stop_on_error = shared.config.stop_on_error,
            owned_runtime = runtime.is_some(),
            "shell pool initialized"
        );

        Ok(Self {
            shared,
            events,
            notifier: Some(notifier),
            runtime,
        })
    }

    /// Queue a job and start whatever now fits. Never waits for execution.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::CapacityExceeded` if the job needs more units than
    ///   the pool owns; the queue is left unchanged
    /// - `SchedulerError::PoolKilled` if the pool has been killed
    pub fn submit(&self, spec: JobSpec) -> Result<JobId, SchedulerError> {
        let spec = spec.normalized();
        let total = self.shared.config.total_units;
        if spec.cpus > total {
            warn!(prefix = %spec.prefix, requested = spec.cpus, total, "rejected oversized job");
            return Err(SchedulerError::CapacityExceeded {
                requested: spec.cpus,
                total,
            });
        }

        let mut state = self.shared.state.lock();
        if state.killed {
            warn!(prefix = %spec.prefix, "rejected job submitted after kill");
            return Err(SchedulerError::PoolKilled);
        }

        state.next_id += 1;
        let id = state.next_id;
        state.counters.submitted += 1;
        debug!(job_id = id, prefix = %spec.prefix, units = spec.cpus, "queued job");
        state.waiting.push(JobRecord::new(id, spec));
        self.shared.admit_locked(&mut state);
        Ok(id)
    }

    /// Block until no job is waiting or running, then return the most recent
    /// job failure. Calling it again without new submits returns the same
    /// result immediately.
    ///
    /// Do not call this from a thread that drives the pool's runtime; use
    /// [`wait_async`](Self::wait_async) there.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Job` carrying the last recorded job failure.
    pub fn wait(&self) -> Result<(), SchedulerError> {
        self.shared.wait_drained()
    }

    /// Async version of [`wait`](Self::wait). The blocking wait runs on
    /// tokio's blocking pool.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::Job` carrying the last recorded job failure
    /// - `SchedulerError::Backend` if the blocking waiter could not run
    pub async fn wait_async(&self) -> Result<(), SchedulerError> {
        let shared = Arc::clone(&self.shared);
        tokio::task::spawn_blocking(move || shared.wait_drained())
            .await
            .map_err(|e| SchedulerError::Backend(format!("drain waiter failed: {e}")))?
    }

    /// Most recent job failure, without blocking.
    #[must_use]
    pub fn last_error(&self) -> Option<JobError> {
        self.shared.state.lock().last_error.clone()
    }

    /// Drop every waiting job, signal every running process to die and reset
    /// committed units. Returns without waiting for the processes to exit.
    /// Later submits fail with `SchedulerError::PoolKilled`.
    pub fn kill_all(&self) {
        let mut state = self.shared.state.lock();
        self.shared.kill_locked(&mut state, "kill requested");
    }

    /// Current utilization snapshot.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let state = self.shared.state.lock();
        PoolStats {
            total_units: state.ledger.total(),
            used_units: state.ledger.committed(),
            waiting_jobs: state.waiting.len(),
            running_jobs: state.running.keys().copied().collect(),
            submitted: state.counters.submitted,
            completed: state.counters.completed,
            failed: state.counters.failed,
            cancelled: state.counters.cancelled,
            killed: state.killed,
        }
    }

    /// Pool configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }
}

impl<S: ProcessStarter> Drop for ShellPool<S> {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            if !state.is_drained() {
                self.shared.kill_locked(&mut state, "pool dropped with outstanding jobs");
            }
        }

        if self.events.send(NotifierMessage::Shutdown).is_ok() {
            if let Some(notifier) = self.notifier.take() {
                if notifier.join().is_err() {
                    warn!("notifier thread panicked");
                }
            }
        }
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
        debug!("shell pool shut down");
    }
}
