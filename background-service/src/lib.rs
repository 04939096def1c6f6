pub mod dispatcher;
pub mod poll_loop;
pub mod seen;

pub use dispatcher::{DispatchReport, Dispatcher, FailedDestination};
pub use poll_loop::{CycleReport, PollLoop};
pub use seen::SeenTracker;

use feed_core::{CoreError, ErrorReporter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

struct RunningTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Drives a [`PollLoop`] on a fixed interval in a background task.
pub struct BackgroundService {
    poll_loop: Arc<PollLoop>,
    polling_interval: Duration,
    task: Mutex<Option<RunningTask>>,
}

impl BackgroundService {
    pub fn new(poll_loop: Arc<PollLoop>, polling_interval: Duration) -> Self {
        Self {
            poll_loop,
            polling_interval,
            task: Mutex::new(None),
        }
    }

    pub fn poll_loop(&self) -> &Arc<PollLoop> {
        &self.poll_loop
    }

    /// Spawns the polling task. Starting a running service is a no-op.
    pub async fn start(&self) -> Result<(), CoreError> {
        let mut task = self.task.lock().await;
        if let Some(running) = task.as_ref() {
            if !running.handle.is_finished() {
                debug!("Background service already running");
                return Ok(());
            }
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(poll_reddit(
            Arc::clone(&self.poll_loop),
            self.polling_interval,
            shutdown_rx,
        ));

        *task = Some(RunningTask { shutdown, handle });
        info!(
            "Background service started, polling every {:?}",
            self.polling_interval
        );
        Ok(())
    }

    /// Signals the polling task and waits for it. A cycle already in
    /// progress finishes first.
    pub async fn stop(&self) -> Result<(), CoreError> {
        let Some(running) = self.task.lock().await.take() else {
            debug!("Background service is not running");
            return Ok(());
        };

        // The receiver is gone only if the task already exited
        let _ = running.shutdown.send(true);
        running.handle.await.map_err(|e| CoreError::Internal {
            message: format!("polling task failed: {}", e),
        })?;

        info!("Background service stopped");
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        self.task
            .lock()
            .await
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }
}

async fn poll_reddit(
    poll_loop: Arc<PollLoop>,
    polling_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let reporter = ErrorReporter::new();
    let mut ticker = tokio::time::interval(polling_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match poll_loop.try_run_cycle().await {
                    Some(Ok(_)) | None => {}
                    Some(Err(e)) => reporter.report_error(&e),
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    debug!("Polling task exiting");
}
