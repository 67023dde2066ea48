//! Fixed-delay task scheduler
//!
//! Every periodic job of the monitor (one per collector, the dispatcher, one
//! per dashboard, the insight generator) runs as its own tokio task. The next
//! run starts `period` after the previous one finished, so runs of one task
//! never overlap. A single broadcast signal stops all of them.

use std::future::Future;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Owns the periodic tasks and their shutdown signal
pub struct Scheduler {
    shutdown: broadcast::Sender<()>,
    tasks: Vec<(String, JoinHandle<()>)>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            shutdown,
            tasks: Vec::new(),
        }
    }

    /// Run `task` after `initial_delay`, then `period` after each completion
    ///
    /// On shutdown a run in progress is dropped at its next suspension point.
    pub fn spawn_fixed_delay<F, Fut>(
        &mut self,
        name: impl Into<String>,
        initial_delay: Duration,
        period: Duration,
        mut task: F,
    ) where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let mut shutdown = self.shutdown.subscribe();
        let task_name = name.clone();

        let handle = tokio::spawn(async move {
            debug!(task = %task_name, period_ms = period.as_millis() as u64, "Scheduled task started");
            let mut delay = initial_delay;

            loop {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shutdown.recv() => break,
                }

                tokio::select! {
                    _ = task() => {}
                    _ = shutdown.recv() => {
                        debug!(task = %task_name, "Abandoning in-flight run");
                        break;
                    }
                }

                delay = period;
            }

            debug!(task = %task_name, "Scheduled task stopped");
        });

        self.tasks.push((name, handle));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Signal every task to stop and wait for all of them
    pub async fn shutdown(self) {
        // No receivers left means every task already exited
        let _ = self.shutdown.send(());

        let count = self.tasks.len();
        for (name, handle) in self.tasks {
            if let Err(e) = handle.await {
                warn!(task = %name, error = %e, "Scheduled task ended abnormally");
            }
        }

        info!(tasks = count, "Scheduler stopped");
    }
}
