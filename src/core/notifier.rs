//! The completion notifier: one thread that applies job completions in order.
//!
//! Every launched job reports exactly one [`CompletionEvent`] over an
//! unbounded channel. This thread is the only consumer, so "release units,
//! then re-plan" never interleaves with another completion.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;
use tracing::{debug, error, info};

use crate::core::launcher::{CompletionEvent, NotifierMessage};
use crate::core::shell_pool::Shared;
use crate::core::{ExitReport, JobError, JobErrorKind, ProcessStarter};

/// Start the notifier thread.
pub(crate) fn spawn<S: ProcessStarter>(
    shared: Arc<Shared<S>>,
    events: Receiver<NotifierMessage>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("shell-pool-notifier".into())
        .spawn(move || {
            debug!("notifier thread started");
            for message in &events {
                match message {
                    NotifierMessage::Completed(event) => handle_completion(&shared, event),
                    NotifierMessage::Shutdown => break,
                }
            }
            debug!("notifier thread exiting");
        })
}

/// Apply one completion to the pool state.
pub(crate) fn handle_completion<S: ProcessStarter>(shared: &Shared<S>, event: CompletionEvent) {
    let mut state = shared.state.lock();

    if event.generation != state.generation {
        debug!(job_id = event.id, "ignoring completion from a killed generation");
        return;
    }
    let Some(record) = state.running.remove(&event.id) else {
        debug!(job_id = event.id, "ignoring completion for untracked job");
        return;
    };

    state.ledger.release(record.units());

    if !shared.config.quiet {
        let elapsed = record.admitted_at.map(|at| at.elapsed()).unwrap_or_default();
        info!(
            log_prefix = %shared.config.log_prefix,
            job_id = record.id,
            prefix = %record.spec.prefix,
            command = %record.spec.summary(),
            elapsed = ?elapsed,
            "finished job"
        );
    }

    match failure(event.outcome) {
        Some(kind) => {
            let err = JobError {
                prefix: record.spec.prefix.clone(),
                command: record.spec.summary(),
                kind,
            };
            error!(job_id = record.id, error = %err, "job failed");
            state.counters.failed += 1;
            state.last_error = Some(err);
            if shared.config.stop_on_error {
                shared.kill_locked(&mut state, "job failed with stop_on_error set");
            }
        }
        None => state.counters.completed += 1,
    }

    if !state.killed {
        shared.admit_locked(&mut state);
    }
    shared.drained.notify_all();
}

fn failure(outcome: std::io::Result<ExitReport>) -> Option<JobErrorKind> {
    match outcome {
        Ok(report) if report.success() => None,
        Ok(report) => Some(JobErrorKind::Exit {
            code: report.code,
            signal: report.signal,
        }),
        Err(e) => Some(JobErrorKind::Launch(e.to_string())),
    }
}
