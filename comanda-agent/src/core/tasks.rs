//! Background task management
//!
//! Every long-running loop of the agent is registered here so shutdown can
//! cancel and await all of them in one place. Loops are expected to finish
//! their current cycle once the shared token is cancelled; a loop still
//! running after [`SHUTDOWN_GRACE`] is aborted.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(15);

struct NamedTask {
    name: &'static str,
    handle: JoinHandle<()>,
}

/// Spawned loops sharing one cancellation token
pub struct BackgroundTasks {
    tasks: Vec<NamedTask>,
    shutdown: CancellationToken,
    grace: Duration,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            shutdown: CancellationToken::new(),
            grace: SHUTDOWN_GRACE,
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawn a loop; a panic or an exit before shutdown is logged
    pub fn spawn<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.shutdown.clone();
        let handle = tokio::spawn(async move {
            match AssertUnwindSafe(task).catch_unwind().await {
                Ok(()) if token.is_cancelled() => {}
                Ok(()) => tracing::warn!(task = name, "Background task exited before shutdown"),
                Err(panic) => tracing::error!(
                    task = name,
                    panic = %panic_message(panic.as_ref()),
                    "Background task panicked"
                ),
            }
        });
        tracing::debug!(task = name, "Background task spawned");
        self.tasks.push(NamedTask { name, handle });
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn log_summary(&self) {
        let names: Vec<_> = self.tasks.iter().map(|t| t.name).collect();
        tracing::info!(count = names.len(), tasks = ?names, "Background tasks running");
    }

    /// Names of tasks that are no longer running
    pub fn exited(&self) -> Vec<&'static str> {
        self.tasks
            .iter()
            .filter(|t| t.handle.is_finished())
            .map(|t| t.name)
            .collect()
    }

    /// Cancel every task and wait for it, aborting stragglers after the grace period
    pub async fn shutdown(self) {
        tracing::info!(count = self.tasks.len(), "Stopping background tasks...");
        self.shutdown.cancel();

        for NamedTask { name, mut handle } in self.tasks {
            let joined = match tokio::time::timeout(self.grace, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    tracing::warn!(task = name, grace = ?self.grace, "Task did not stop in time, aborting");
                    handle.abort();
                    handle.await
                }
            };
            match joined {
                Ok(()) => tracing::debug!(task = name, "Task stopped"),
                Err(e) if e.is_cancelled() => tracing::debug!(task = name, "Task aborted"),
                Err(e) => tracing::error!(task = name, error = %e, "Task failed"),
            }
        }

        tracing::info!("All background tasks stopped");
    }
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
