use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::infrastructure::artifact_store::ArtifactStore;

/// Periodic retention cleanup running on the tokio runtime.
///
/// The first pass runs one interval after spawn. Dropping the handle
/// without calling [`RetentionSweeper::shutdown`] leaves the task running
/// until the runtime stops.
pub struct RetentionSweeper {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl RetentionSweeper {
    pub fn spawn(store: Arc<ArtifactStore>, interval: Duration) -> Self {
        let (stop, mut stopped) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => run_sweep(store.clone()).await,
                    changed = stopped.changed() => {
                        if changed.is_err() || *stopped.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Retention sweeper stopped");
        });

        info!(
            interval_secs = interval.as_secs(),
            "Retention sweeper started"
        );
        Self { stop, handle }
    }

    /// Signal the task and wait for it. A sweep in progress finishes first.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.handle.await {
            error!(error = %e, "Retention sweeper task failed");
        }
    }
}

pub async fn run_sweep(store: Arc<ArtifactStore>) {
    let joined = tokio::task::spawn_blocking(move || store.sweep_expired()).await;

    match joined {
        Ok(Ok(report)) if report.deleted.is_empty() => info!("Cleanup found no expired files"),
        Ok(Ok(_)) => {}
        Ok(Err(e)) => error!(error = %e, "Cleanup error"),
        Err(e) => error!(error = %e, "Cleanup task panicked"),
    }
}
