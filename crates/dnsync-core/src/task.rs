//! Stoppable background task
//!
//! Shared by the cron schedule and the IP watcher. The task loop races its
//! work against a oneshot shutdown signal; [`BackgroundTask::stop`] sends the
//! signal and waits for the loop to exit. Dropping the handle without
//! stopping aborts the task so its timer is released either way.

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

/// Handle to a spawned loop
#[derive(Debug)]
pub(crate) struct BackgroundTask {
    name: &'static str,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl BackgroundTask {
    /// Spawn `run` with a fresh shutdown receiver
    pub(crate) fn spawn<F, Fut>(name: &'static str, run: F) -> Self
    where
        F: FnOnce(oneshot::Receiver<()>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let task = tokio::spawn(run(rx));
        debug!("Started {}", name);

        Self {
            name,
            shutdown: Some(tx),
            task,
        }
    }

    /// Signal shutdown and wait for the loop to exit
    ///
    /// An iteration that is already running finishes first.
    pub(crate) async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        // `self` implements Drop, so the handle is borrowed rather than moved
        let _ = (&mut self.task).await;
        debug!("Stopped {}", self.name);
    }

    /// Stop without waiting: the loop is aborted at its next await point
    pub(crate) fn abort(&self) {
        self.task.abort();
    }

    /// Whether the loop has exited
    pub(crate) fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for BackgroundTask {
    fn drop(&mut self) {
        self.task.abort();
    }
}
