//! Background sweep of expired conversation entries.
//!
//! Reads already ignore expired entries; the sweep only reclaims memory for
//! conversations that are never read again.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::store::MemoryConversationStore;

/// Spawn a task that prunes `store` every `interval` until the runtime stops.
pub fn spawn_store_sweeper(store: MemoryConversationStore, interval: Duration) -> JoinHandle<()> {
    let limits = store.limits();
    info!(
        interval_secs = interval.as_secs(),
        ttl_secs = limits.ttl.as_secs(),
        capacity = limits.capacity,
        "conversation store sweeper configured"
    );
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; nothing can have expired yet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = store.prune_expired();
            if removed > 0 {
                info!(removed, remaining = store.len(), "store sweep: pruned expired conversations");
            } else {
                debug!(remaining = store.len(), "store sweep: nothing to prune");
            }
        }
    })
}
