//! Process start abstraction and the shell-backed implementation.

use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::core::Multiplexer;

/// Everything needed to start one child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Interpreter to execute.
    pub program: String,
    /// Arguments passed to the interpreter.
    pub args: Vec<String>,
    /// Extra environment on top of the inherited one.
    pub env: Vec<(String, String)>,
}

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitReport {
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Terminating signal, if any.
    pub signal: Option<i32>,
}

impl ExitReport {
    /// Report for a clean exit.
    pub const SUCCESS: Self = Self {
        code: Some(0),
        signal: None,
    };

    /// Whether the process exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

impl From<ExitStatus> for ExitReport {
    fn from(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;
        Self {
            code: status.code(),
            signal,
        }
    }
}

/// Starts a child process and drives it to completion.
///
/// `Err` means the process never started. Once started, the implementation
/// must feed all output through the two multiplexers, finish them when the
/// streams close, and kill the child when `cancel` fires.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use shell_pool::core::{ExitReport, Invocation, Multiplexer, ProcessStarter};
/// use tokio_util::sync::CancellationToken;
///
/// struct AlwaysOk;
///
/// #[async_trait]
/// impl ProcessStarter for AlwaysOk {
///     async fn run(
///         &self,
///         _invocation: Invocation,
///         stdout: Multiplexer,
///         stderr: Multiplexer,
///         _cancel: CancellationToken,
///     ) -> std::io::Result<ExitReport> {
///         stdout.finish();
///         stderr.finish();
///         Ok(ExitReport::SUCCESS)
///     }
/// }
/// ```
#[async_trait]
pub trait ProcessStarter: Send + Sync + 'static {
    /// Start `invocation` and wait for it to exit.
    async fn run(
        &self,
        invocation: Invocation,
        stdout: Multiplexer,
        stderr: Multiplexer,
        cancel: CancellationToken,
    ) -> std::io::Result<ExitReport>;
}

/// Runs invocations as real OS processes via tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellStarter;

#[async_trait]
impl ProcessStarter for ShellStarter {
    async fn run(
        &self,
        invocation: Invocation,
        stdout: Multiplexer,
        stderr: Multiplexer,
        cancel: CancellationToken,
    ) -> std::io::Result<ExitReport> {
        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let out = pump(child.stdout.take(), stdout);
        let err = pump(child.stderr.take(), stderr);
        let exit = async {
            tokio::select! {
                status = child.wait() => status,
                () = cancel.cancelled() => {
                    tracing::debug!(pid = ?child.id(), "killing cancelled child");
                    if let Err(e) = child.start_kill() {
                        tracing::debug!(error = %e, "kill failed, child already gone");
                    }
                    child.wait().await
                }
            }
        };

        let (status, (), ()) = tokio::join!(exit, out, err);
        Ok(ExitReport::from(status?))
    }
}

async fn pump<R>(reader: Option<R>, mut mux: Multiplexer)
where
    R: AsyncRead + Unpin,
{
    if let Some(mut reader) = reader {
        let mut buf = vec![0u8; 8192];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => mux.write(&buf[..n]),
                Err(e) => {
                    tracing::debug!(error = %e, "child output stream failed");
                    break;
                }
            }
        }
    }
    mux.finish();
}
