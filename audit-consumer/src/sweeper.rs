use std::sync::Arc;
use std::time::Duration;

use common_events::Clock;
use common_observability::ConsumerMetrics;
use common_store::StoreResult;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::repo::AuditRepository;

/// Deletes audit rows whose expiry has passed.
pub async fn sweep_once(repo: &dyn AuditRepository, clock: &dyn Clock, metrics: &ConsumerMetrics) -> StoreResult<u64> {
    let removed = repo.purge_expired(clock.now()).await?;
    metrics.expired_rows.inc_by(removed);
    if removed > 0 {
        info!(removed, "expired audit records purged");
    } else {
        debug!("no expired audit records");
    }
    Ok(removed)
}

pub fn spawn_expiry_sweeper(
    repo: Arc<dyn AuditRepository>,
    clock: Arc<dyn Clock>,
    metrics: ConsumerMetrics,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = sweep_once(repo.as_ref(), clock.as_ref(), &metrics).await {
                error!(?err, "audit expiry sweep failed");
            }
        }
    })
}
