//! Tick scheduling
//!
//! The poll timer and every external accelerant (realtime events, CRUD
//! handlers) funnel into one bounded trigger queue consumed by a single loop,
//! so ticks run strictly one at a time: a slow fetch delays the next tick
//! rather than overlapping it, and triggers arriving while one is already
//! queued coalesce into a single pass.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use super::hub::Feed;

/// Handle for requesting an out-of-band tick
#[derive(Clone)]
pub struct TickHandle {
    tx: mpsc::Sender<()>,
}

impl TickHandle {
    /// Ask the feed loop to run a tick soon. Never blocks; a request made
    /// while one is already pending is absorbed into it.
    pub fn request_tick(&self) {
        let _ = self.tx.try_send(());
    }
}

/// Spawn the feed loop: a tick on every poll period plus one for each
/// requested trigger. Returns the trigger handle and the task handle.
pub fn spawn_feed_task(feed: Arc<Feed>, period: Duration) -> (TickHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<()>(1);

    info!("feed poller started (interval: {:?})", period);

    let handle = tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first interval tick fires immediately, giving the initial
        // cache-establishing broadcast without waiting a full period.
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                trigger = rx.recv() => {
                    if trigger.is_none() {
                        info!("feed poller stopping (all trigger handles dropped)");
                        break;
                    }
                }
            }
            feed.tick().await;
        }
    });

    (TickHandle { tx }, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TaskStore;
    use crate::types::Result;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct StaticStore;

    #[async_trait]
    impl TaskStore for StaticStore {
        async fn fetch_all(&self, _table: &str) -> Result<Vec<Value>> {
            Ok(vec![json!({"id": 1, "title": "A", "status": "open"})])
        }
    }

    #[tokio::test]
    async fn test_requested_tick_runs_without_waiting_for_timer() {
        let feed = Arc::new(Feed::new(Arc::new(StaticStore), "task"));
        // Hour-long period: any observed tick must come from the trigger
        // (plus the immediate first interval tick).
        let (handle, task) = spawn_feed_task(Arc::clone(&feed), Duration::from_secs(3600));

        tokio::time::sleep(Duration::from_millis(50)).await;
        let after_start = feed.tick_count();
        assert!(after_start >= 1);

        handle.request_tick();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(feed.tick_count() > after_start);

        task.abort();
    }

    #[tokio::test]
    async fn test_loop_stops_when_handles_dropped() {
        let feed = Arc::new(Feed::new(Arc::new(StaticStore), "task"));
        let (handle, task) = spawn_feed_task(feed, Duration::from_secs(3600));

        drop(handle);
        // recv() yields None once the last sender is gone
        let _ = tokio::time::timeout(Duration::from_secs(1), task).await.unwrap();
    }
}
