//! Job specifications and the records the pool tracks for them.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Identifier handed out by the pool for every accepted job.
pub type JobId = u64;

/// Commands longer than this are shortened in logs and error messages.
pub const SUMMARY_LEN: usize = 100;

/// A shell command together with the resources it declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Command text handed to the shell.
    pub command: String,
    /// CPU units the command will use. Zero is treated as one.
    /// Exposed to the child as the `CPUs` environment variable.
    #[serde(default)]
    pub cpus: u32,
    /// Label attached to every line of output from this job.
    /// Exposed to the child as the `Prefix` environment variable.
    #[serde(default)]
    pub prefix: String,
}

impl JobSpec {
    /// Create a one-unit job with no prefix.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            cpus: 1,
            prefix: String::new(),
        }
    }

    /// Set the number of CPU units.
    #[must_use]
    pub const fn with_cpus(mut self, cpus: u32) -> Self {
        self.cpus = cpus;
        self
    }

    /// Set the output prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Units charged against the pool for this job.
    #[must_use]
    pub const fn units(&self) -> u32 {
        if self.cpus == 0 {
            1
        } else {
            self.cpus
        }
    }

    /// Return the spec with `cpus` rewritten to the charged units.
    #[must_use]
    pub const fn normalized(mut self) -> Self {
        self.cpus = self.units();
        self
    }

    /// Command text shortened for log lines.
    #[must_use]
    pub fn summary(&self) -> String {
        summarize(&self.command)
    }
}

/// Truncate `command` to at most [`SUMMARY_LEN`] characters.
#[must_use]
pub fn summarize(command: &str) -> String {
    match command.char_indices().nth(SUMMARY_LEN) {
        Some((end, _)) => command[..end].to_string(),
        None => command.to_string(),
    }
}

/// Lifecycle position of a tracked job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    /// Queued until enough units are free.
    Waiting,
    /// Admitted and handed to the launcher. The record leaves the pool once
    /// its completion is processed.
    Running,
}

/// Pool-owned record for one job. Only mutated under the pool lock.
#[derive(Debug, Clone)]
pub struct JobRecord {
    /// Identifier returned from submit.
    pub id: JobId,
    /// Immutable spec, already normalized.
    pub spec: JobSpec,
    /// Current lifecycle position.
    pub state: JobState,
    /// Cancels the running process. Handed to the starter on admission and
    /// fired by a kill.
    pub cancel: CancellationToken,
    /// When the job was admitted.
    pub admitted_at: Option<Instant>,
}

impl JobRecord {
    /// Create a waiting record.
    #[must_use]
    pub fn new(id: JobId, spec: JobSpec) -> Self {
        Self {
            id,
            spec: spec.normalized(),
            state: JobState::Waiting,
            cancel: CancellationToken::new(),
            admitted_at: None,
        }
    }

    /// Units this record holds once running.
    #[must_use]
    pub const fn units(&self) -> u32 {
        self.spec.units()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_cpus_normalizes_to_one() {
        let spec = JobSpec::new("true").with_cpus(0);
        assert_eq!(spec.units(), 1);
        assert_eq!(spec.normalized().cpus, 1);

        let record = JobRecord::new(7, JobSpec::new("true").with_cpus(0));
        assert_eq!(record.spec.cpus, 1);
        assert_eq!(record.state, JobState::Waiting);
    }

    #[test]
    fn summary_truncates_long_commands() {
        let long = "x".repeat(250);
        assert_eq!(summarize(&long).len(), SUMMARY_LEN);
        assert_eq!(summarize("echo hi"), "echo hi");
    }

    #[test]
    fn summary_respects_char_boundaries() {
        let long = "é".repeat(150);
        assert_eq!(summarize(&long).chars().count(), SUMMARY_LEN);
    }

    #[test]
    fn spec_deserializes_with_defaults() {
        let spec: JobSpec = serde_json::from_str(r#"{"command": "ls"}"#).unwrap();
        assert_eq!(spec.cpus, 0);
        assert_eq!(spec.units(), 1);
        assert!(spec.prefix.is_empty());
    }
}
