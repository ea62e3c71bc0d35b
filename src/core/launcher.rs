//! Turns admitted jobs into running processes.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use crossbeam_channel::Sender;
use tempfile::NamedTempFile;

use crate::config::PoolConfig;
use crate::core::{
    ExitReport, Invocation, JobId, JobRecord, JobSpec, LineSink, Multiplexer, ProcessStarter,
    StreamKind,
};
use crate::runtime::TokioSpawner;

/// Environment variable carrying the job's CPU units.
pub const CPUS_ENV: &str = "CPUs";
/// Environment variable carrying the job's prefix.
pub const PREFIX_ENV: &str = "Prefix";

/// Result of one launched job, sent to the notifier exactly once.
#[derive(Debug)]
pub(crate) struct CompletionEvent {
    pub id: JobId,
    pub generation: u64,
    pub outcome: std::io::Result<ExitReport>,
}

/// Messages consumed by the notifier thread.
#[derive(Debug)]
pub(crate) enum NotifierMessage {
    Completed(CompletionEvent),
    Shutdown,
}

/// Owns a job's completion. If the job task unwinds or is dropped before
/// reporting, the guard reports a failure instead.
struct CompletionGuard {
    id: JobId,
    generation: u64,
    events: Sender<NotifierMessage>,
    sent: bool,
}

impl CompletionGuard {
    fn new(id: JobId, generation: u64, events: Sender<NotifierMessage>) -> Self {
        Self {
            id,
            generation,
            events,
            sent: false,
        }
    }

    fn complete(mut self, outcome: std::io::Result<ExitReport>) {
        self.send(outcome);
    }

    fn send(&mut self, outcome: std::io::Result<ExitReport>) -> bool {
        self.sent = true;
        let event = CompletionEvent {
            id: self.id,
            generation: self.generation,
            outcome,
        };
        if self.events.send(NotifierMessage::Completed(event)).is_err() {
            tracing::debug!(job_id = self.id, "notifier gone, dropping completion");
            return false;
        }
        true
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if self.sent {
            return;
        }
        let outcome = Err(std::io::Error::other(
            "job task panicked or was aborted before reporting",
        ));
        if self.send(outcome) {
            tracing::error!(job_id = self.id, "job task ended without reporting");
        }
    }
}

pub(crate) struct Launcher<S> {
    starter: Arc<S>,
    sink: Arc<dyn LineSink>,
    spawner: TokioSpawner,
    events: Sender<NotifierMessage>,
    shell: String,
    inline_limit: usize,
    temp_dir: Option<PathBuf>,
}

impl<S: ProcessStarter> Launcher<S> {
    pub fn new(
        config: &PoolConfig,
        starter: Arc<S>,
        sink: Arc<dyn LineSink>,
        spawner: TokioSpawner,
        events: Sender<NotifierMessage>,
    ) -> Self {
        Self {
            starter,
            sink,
            spawner,
            events,
            shell: config.shell.clone(),
            inline_limit: config.inline_command_limit,
            temp_dir: config.temp_dir.clone(),
        }
    }

    /// Start `record` in the background. Never blocks on the child; the
    /// outcome, including a failure to start, arrives as a completion event.
    pub fn launch(&self, record: &JobRecord, generation: u64) {
        let id = record.id;
        let spec = record.spec.clone();
        let cancel = record.cancel.clone();
        let starter = Arc::clone(&self.starter);
        let prefix: Arc<str> = Arc::from(spec.prefix.as_str());
        let stdout =
            Multiplexer::new(Arc::clone(&prefix), StreamKind::Stdout, Arc::clone(&self.sink));
        let stderr = Multiplexer::new(prefix, StreamKind::Stderr, Arc::clone(&self.sink));
        let guard = CompletionGuard::new(id, generation, self.events.clone());
        let staged = self.prepare(&spec);

        tracing::debug!(job_id = id, prefix = %spec.prefix, units = spec.cpus, "launching job");

        self.spawner.spawn(async move {
            let outcome = match staged {
                Ok((invocation, script)) => {
                    let outcome = starter.run(invocation, stdout, stderr, cancel).await;
                    if let Some(script) = script {
                        if let Err(e) = script.close() {
                            tracing::debug!(
                                job_id = id,
                                error = %e,
                                "failed to remove staged script"
                            );
                        }
                    }
                    outcome
                }
                Err(e) => Err(e),
            };
            guard.complete(outcome);
        });
    }

    /// Build the invocation, staging long commands into a script file that
    /// lives until the child exits.
    fn prepare(&self, spec: &JobSpec) -> std::io::Result<(Invocation, Option<NamedTempFile>)> {
        let env = vec![
            (CPUS_ENV.to_string(), spec.cpus.to_string()),
            (PREFIX_ENV.to_string(), spec.prefix.clone()),
        ];

        if spec.command.len() < self.inline_limit {
            let invocation = Invocation {
                program: self.shell.clone(),
                args: vec!["-c".to_string(), spec.command.clone()],
                env,
            };
            return Ok((invocation, None));
        }

        let script = self.stage(spec)?;
        let invocation = Invocation {
            program: self.shell.clone(),
            args: vec![script.path().to_string_lossy().into_owned()],
            env,
        };
        tracing::debug!(
            path = %script.path().display(),
            bytes = spec.command.len(),
            "staged long command"
        );
        Ok((invocation, Some(script)))
    }

    fn stage(&self, spec: &JobSpec) -> std::io::Result<NamedTempFile> {
        let prefix = format!("shpool-{}-", file_safe(&spec.prefix));
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix).suffix(".sh");
        let mut script = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        script.write_all(spec.command.as_bytes())?;
        script.flush()?;
        Ok(script)
    }
}

/// Keep characters that are safe in a file name.
fn file_safe(prefix: &str) -> String {
    prefix
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .take(32)
        .collect()
}
