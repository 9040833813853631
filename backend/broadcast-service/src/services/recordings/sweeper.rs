//! Stuck recording sweep
//!
//! Fails recordings the provider never finalized. Runs only when
//! `BROADCAST_STUCK_RECORDING_TIMEOUT_SECS` is set.

use super::RecordingCoordinator;
use crate::metrics;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

pub async fn start_stuck_recording_sweeper(
    coordinator: Arc<RecordingCoordinator>,
    interval: Duration,
    timeout_secs: i64,
) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        timeout_secs,
        "Starting stuck recording sweeper"
    );

    loop {
        sleep(interval).await;

        let cycle_start = Instant::now();
        match coordinator.sweep_stuck(Utc::now()).await {
            Ok(0) => tracing::debug!("No stuck recordings"),
            Ok(failed) => {
                metrics::record_stuck_recordings_failed(failed);
                tracing::warn!(
                    failed,
                    duration_ms = cycle_start.elapsed().as_millis(),
                    "Stuck recordings marked failed"
                );
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    duration_ms = cycle_start.elapsed().as_millis(),
                    "Stuck recording sweep failed"
                );
            }
        }
    }
}
