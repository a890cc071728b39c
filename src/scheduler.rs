//! Repeating ingestion in the background.
//!
//! The first cycle starts immediately, then one every `interval`. Each cycle
//! runs in its own task: an error or a panic is logged and the loop keeps
//! going.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::ingest::Pipeline;

/// Spawn the scheduler loop. Abort the handle to stop it.
pub fn spawn_scheduler(
    pipeline: Arc<Pipeline>,
    interval: Duration,
    max_pages_each: u32,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = interval.as_secs(), "Scheduler started");
        loop {
            ticker.tick().await;
            run_cycle(pipeline.clone(), max_pages_each).await;
        }
    })
}

async fn run_cycle(pipeline: Arc<Pipeline>, max_pages_each: u32) {
    let cycle = tokio::spawn(async move { pipeline.run(max_pages_each).await });
    match cycle.await {
        Ok(Ok(summary)) => info!(
            kept = summary.kept,
            skipped = summary.skipped,
            total_links = summary.total_links,
            "Scheduled run finished"
        ),
        Ok(Err(e)) => warn!(error = %e, "Scheduled run failed"),
        Err(e) => error!(error = %e, "Scheduled run panicked"),
    }
}
