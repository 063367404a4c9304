//! Periodic eviction of completed jobs.
//!
//! Without this loop the registry keeps every job for the lifetime of the
//! process. When `JOB_RETENTION_SECS` is set, finished and failed jobs older
//! than the retention period are dropped along with their artifacts.

use std::sync::Arc;
use std::time::Duration;

use modellab_pipeline::JobRegistry;
use tokio_util::sync::CancellationToken;

/// Run the job retention loop until `cancel` is triggered.
pub async fn run(
    registry: Arc<JobRegistry>,
    retention: Duration,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        retention_secs = retention.as_secs(),
        interval_secs = interval.as_secs(),
        "Job retention started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Job retention stopping");
                break;
            }
            _ = ticker.tick() => {
                let evicted = registry.evict_expired(retention).await;
                if evicted > 0 {
                    tracing::info!(evicted, "Job retention: evicted expired jobs");
                } else {
                    tracing::debug!("Job retention: nothing to evict");
                }
            }
        }
    }
}
