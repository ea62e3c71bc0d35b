//! Tokio runtime spawner implementation.

use std::future::Future;

use tokio::runtime::{Handle, Runtime};

/// Spawns job tasks on a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioSpawner {
    handle: Handle,
}

impl TokioSpawner {
    /// Create a `TokioSpawner` from a tokio runtime handle.
    #[must_use]
    pub const fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Spawner for the runtime the caller is running in, if any.
    #[must_use]
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    /// Build a dedicated multi-threaded runtime and a spawner for it.
    /// The caller owns the runtime and must keep it alive.
    pub fn with_worker_threads(worker_threads: usize) -> Result<(Self, Runtime), std::io::Error> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("shell-pool-io")
            .enable_all()
            .build()?;
        Ok((Self::new(runtime.handle().clone()), runtime))
    }

    /// Spawn a task; its output is discarded.
    pub fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        drop(self.handle.spawn(fut));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn no_current_runtime_outside_tokio() {
        assert!(TokioSpawner::current().is_none());
    }

    #[test]
    fn owned_runtime_runs_tasks() {
        let (spawner, runtime) = TokioSpawner::with_worker_threads(1).unwrap();
        let (tx, rx) = std::sync::mpsc::channel();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        spawner.spawn(async move {
            flag.store(true, Ordering::SeqCst);
            let _ = tx.send(());
        });
        rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap();
        assert!(ran.load(Ordering::SeqCst));
        drop(runtime);
    }

    #[tokio::test]
    async fn current_runtime_is_found() {
        assert!(TokioSpawner::current().is_some());
    }
}
