//! Cooperative cancellation with a bounded drain.
use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every task returned within the timeout.
    Drained,
    /// The timeout elapsed; stragglers were aborted.
    TimedOut,
}

/// Owns the cancellation token and the handles of every spawned task.
pub struct ShutdownCoordinator {
    token: CancellationToken,
    tasks: Mutex<Vec<(&'static str, JoinHandle<()>)>>,
    timeout: Duration,
}

impl ShutdownCoordinator {
    pub fn new(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
            timeout,
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Spawns `fut` as a tracked task. It must watch [`Self::token`].
    pub fn spawn<F>(&self, name: &'static str, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(fut);
        self.tasks.lock().push((name, handle));
    }

    /// Cancels every task and waits for them up to the timeout.
    pub async fn shutdown(&self) -> ShutdownOutcome {
        self.token.cancel();

        let mut tasks = std::mem::take(&mut *self.tasks.lock());
        let drained = tokio::time::timeout(self.timeout, async {
            for (name, handle) in tasks.iter_mut() {
                if let Err(e) = handle.await {
                    if e.is_panic() {
                        error!(task = *name, "task panicked");
                    }
                }
            }
        })
        .await;

        match drained {
            Ok(()) => {
                info!(tasks = tasks.len(), "all tasks stopped");
                ShutdownOutcome::Drained
            }
            Err(_) => {
                for (name, handle) in &tasks {
                    if !handle.is_finished() {
                        warn!(task = *name, timeout = ?self.timeout, "task did not stop in time; aborting");
                        handle.abort();
                    }
                }
                ShutdownOutcome::TimedOut
            }
        }
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn wait_for_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    let mut term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    #[cfg(unix)]
    let terminate = async move {
        term.recv().await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        res = tokio::signal::ctrl_c() => res,
        _ = terminate => Ok(()),
    }
}
