//! Feed background updater.
//!
//! Runs the scheduled trigger on a fixed interval. A failed run is logged
//! and the loop carries on; the next tick is the retry.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::service::{StickyService, Trigger};

/// Periodic scheduled trigger.
pub struct FeedUpdater {
    service: Arc<StickyService>,
    check_interval: Duration,
}

impl FeedUpdater {
    /// Create an updater that checks every `interval_secs` seconds.
    pub fn new(service: Arc<StickyService>, interval_secs: u64) -> Self {
        Self {
            service,
            check_interval: Duration::from_secs(interval_secs),
        }
    }

    /// Run the updater loop. The first check happens immediately.
    pub async fn run(&self) {
        info!(
            "Feed updater started (check interval: {} seconds)",
            self.check_interval.as_secs()
        );

        let mut timer = interval(self.check_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            timer.tick().await;
            self.check_once().await;
        }
    }

    /// Run one scheduled check, logging the result.
    pub async fn check_once(&self) {
        match self.service.run_check(Trigger::Scheduled).await {
            Ok(result) => debug!("Scheduled check: {}", result.message),
            Err(e) => error!("Scheduled check failed: {}", e),
        }
    }
}

/// Start the updater as a background task.
pub fn start_feed_updater(service: Arc<StickyService>, interval_secs: u64) -> JoinHandle<()> {
    let updater = FeedUpdater::new(service, interval_secs);
    tokio::spawn(async move {
        updater.run().await;
    })
}
