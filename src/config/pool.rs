//! Pool configuration structures.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::AppResult;

/// Default interpreter for job commands.
pub const DEFAULT_SHELL: &str = "/bin/sh";
/// Commands at least this long are staged into a script file.
pub const DEFAULT_INLINE_COMMAND_LIMIT: usize = 8192;

/// Pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Total CPU units shared by running jobs.
    pub total_units: u32,
    /// Kill everything outstanding on the first job failure.
    #[serde(default)]
    pub stop_on_error: bool,
    /// Suppress per-job completion summaries.
    #[serde(default)]
    pub quiet: bool,
    /// Prefix for pool log output.
    #[serde(default)]
    pub log_prefix: String,
    /// Interpreter used to run commands.
    #[serde(default = "default_shell")]
    pub shell: String,
    /// Command length at which the command is staged into a script file.
    #[serde(default = "default_inline_command_limit")]
    pub inline_command_limit: usize,
    /// Directory for staged scripts. System temp dir when unset.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

fn default_shell() -> String {
    DEFAULT_SHELL.to_string()
}

const fn default_inline_command_limit() -> usize {
    DEFAULT_INLINE_COMMAND_LIMIT
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolConfig {
    /// Configuration sized to the machine's logical CPUs.
    #[must_use]
    pub fn new() -> Self {
        Self {
            total_units: u32::try_from(num_cpus::get()).unwrap_or(u32::MAX),
            stop_on_error: false,
            quiet: false,
            log_prefix: String::new(),
            shell: default_shell(),
            inline_command_limit: DEFAULT_INLINE_COMMAND_LIMIT,
            temp_dir: None,
        }
    }

    /// Set the total units.
    #[must_use]
    pub const fn with_total_units(mut self, total_units: u32) -> Self {
        self.total_units = total_units;
        self
    }

    /// Enable or disable stop-on-first-error.
    #[must_use]
    pub const fn with_stop_on_error(mut self, stop_on_error: bool) -> Self {
        self.stop_on_error = stop_on_error;
        self
    }

    /// Enable or disable quiet mode.
    #[must_use]
    pub const fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Set the log prefix.
    #[must_use]
    pub fn with_log_prefix(mut self, log_prefix: impl Into<String>) -> Self {
        self.log_prefix = log_prefix.into();
        self
    }

    /// Set the interpreter.
    #[must_use]
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Set the staging threshold.
    #[must_use]
    pub const fn with_inline_command_limit(mut self, limit: usize) -> Self {
        self.inline_command_limit = limit;
        self
    }

    /// Set the directory for staged scripts.
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.temp_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Validate pool configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.total_units == 0 {
            return Err("total_units must be greater than 0".into());
        }
        if self.shell.trim().is_empty() {
            return Err("shell must not be empty".into());
        }
        if self.inline_command_limit == 0 {
            return Err("inline_command_limit must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading pool config {}", path.display()))?;
        Self::from_json_str(&raw)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("loading pool config {}", path.display()))
    }
}
