//! Stale claim recovery
//!
//! A job left in `printing` (agent crashed or lost the store mid-dispatch)
//! goes back to `pending` once its claim is older than the threshold.

use crate::store::{JobStore, StoreResult};
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct Reconciler {
    store: Arc<dyn JobStore>,
    stale_after: Duration,
    interval: Duration,
}

impl Reconciler {
    pub fn new(store: Arc<dyn JobStore>, stale_after: Duration, interval: Duration) -> Self {
        Self {
            store,
            stale_after,
            interval,
        }
    }

    /// Reset stale claims once; returns how many jobs were reset
    pub async fn run_once(&self) -> StoreResult<usize> {
        let cutoff = claim_cutoff(Utc::now(), self.stale_after);
        let reset = self.store.reset_stale_claims(cutoff).await?;
        if reset > 0 {
            info!(reset, cutoff = %cutoff, "Reset stale printing claims");
        }
        Ok(reset)
    }

    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        info!(
            stale_after_secs = self.stale_after.as_secs(),
            "Reconciler started"
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Reconciler received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        warn!(error = %e, "Reconciliation pass failed");
                    }
                }
            }
        }
    }
}

fn claim_cutoff(now: DateTime<Utc>, stale_after: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(stale_after)
        .ok()
        .and_then(|age| now.checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
