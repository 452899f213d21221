//! Change-detection and fan-out hub
//!
//! One [`Feed`] owns, per view, a subscriber set and the last-broadcast
//! cache. Every tick fetches the collection once, projects it for both views
//! independently, and pushes each view's serialized projection to its
//! subscribers only when that projection actually changed.
//!
//! The two views are fully independent: an error or empty state in one never
//! affects delivery on the other. Each view's (set, cache) pair sits behind
//! its own mutex; channel writes are synchronous sends, so no lock is ever
//! held across an await point.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

use crate::store::TaskStore;

use super::channel::SseChannel;
use super::views::View;

/// Per-view subscriber set plus last-broadcast cache
#[derive(Default)]
struct ViewSlot {
    subscribers: Vec<SseChannel>,
    last_payload: Option<String>,
}

/// The broadcast hub: subscriber sets, caches, and the tick entry point
pub struct Feed {
    store: Arc<dyn TaskStore>,
    table: String,
    slots: [Mutex<ViewSlot>; 2],
    next_channel_id: AtomicU64,
    ticks: AtomicU64,
    last_fetch_ok: AtomicBool,
}

impl Feed {
    /// Create a feed over the given store and table
    pub fn new(store: Arc<dyn TaskStore>, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
            slots: [Mutex::new(ViewSlot::default()), Mutex::new(ViewSlot::default())],
            next_channel_id: AtomicU64::new(1),
            ticks: AtomicU64::new(0),
            last_fetch_ok: AtomicBool::new(false),
        }
    }

    fn slot(&self, view: View) -> std::sync::MutexGuard<'_, ViewSlot> {
        let idx = match view {
            View::Public => 0,
            View::Admin => 1,
        };
        self.slots[idx].lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate an identity for a new subscriber channel
    pub fn next_channel_id(&self) -> u64 {
        self.next_channel_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Number of ticks that completed a successful fetch
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Whether the most recent fetch attempt succeeded
    pub fn last_fetch_ok(&self) -> bool {
        self.last_fetch_ok.load(Ordering::Relaxed)
    }

    /// Current subscriber count for a view
    pub fn subscriber_count(&self, view: View) -> usize {
        self.slot(view).subscribers.len()
    }

    /// Add a subscriber channel to a view and send it a fresh initial payload.
    ///
    /// The initial payload comes from an independent fetch, never from the
    /// last-broadcast cache, so a late joiner sees current data immediately
    /// instead of waiting out the poll interval. Registration itself cannot
    /// fail: a fetch error here is logged and the subscriber simply receives
    /// its first payload on the next successful tick.
    pub async fn register(&self, view: View, channel: SseChannel) {
        self.slot(view).subscribers.push(channel.clone());
        info!(
            "subscriber {} joined {} feed ({} connected)",
            channel.id(),
            view.as_str(),
            self.subscriber_count(view)
        );

        match self.store.fetch_all(&self.table).await {
            Ok(rows) => {
                let projected = view.project(&rows);
                match serde_json::to_string(&projected) {
                    Ok(serialized) => {
                        if !channel.write(&serialized) {
                            debug!(
                                "subscriber {} vanished before initial {} payload",
                                channel.id(),
                                view.as_str()
                            );
                        }
                    }
                    Err(e) => warn!("initial {} payload serialization failed: {}", view.as_str(), e),
                }
            }
            Err(e) => warn!(
                "initial fetch for {} subscriber {} failed: {}",
                view.as_str(),
                channel.id(),
                e
            ),
        }
    }

    /// Drop every channel whose subscriber has gone away.
    ///
    /// Broadcasts already prune on write failure, but a view whose data never
    /// changes would otherwise keep dead channels forever; this runs on every
    /// tick so the set tracks disconnects even without traffic.
    fn prune_closed(&self, view: View) {
        let mut slot = self.slot(view);
        let before = slot.subscribers.len();
        slot.subscribers.retain(|c| c.is_open());
        let pruned = before - slot.subscribers.len();
        if pruned > 0 {
            debug!(
                "pruned {} closed {} subscriber(s), {} remaining",
                pruned,
                view.as_str(),
                slot.subscribers.len()
            );
        }
    }

    /// Remove a subscriber channel from a view. Idempotent.
    pub fn unregister(&self, view: View, channel_id: u64) {
        let mut slot = self.slot(view);
        let before = slot.subscribers.len();
        slot.subscribers.retain(|c| c.id() != channel_id);
        if slot.subscribers.len() < before {
            debug!("subscriber {} left {} feed", channel_id, view.as_str());
        }
    }

    /// Write `payload` to every channel in a view's set.
    ///
    /// Channels that are closed or whose write fails are collected during the
    /// iteration and removed afterwards; one channel's failure never blocks
    /// delivery to the rest. Fire-and-forget, at most once per channel.
    pub fn broadcast(&self, view: View, payload: &str) {
        let mut slot = self.slot(view);
        Self::fan_out(&mut slot, view, payload);
    }

    fn fan_out(slot: &mut ViewSlot, view: View, payload: &str) {
        let mut dead: Vec<u64> = Vec::new();
        for channel in &slot.subscribers {
            if !channel.is_open() || !channel.write(payload) {
                dead.push(channel.id());
            }
        }
        if !dead.is_empty() {
            slot.subscribers.retain(|c| !dead.contains(&c.id()));
            debug!(
                "pruned {} dead {} subscriber(s), {} remaining",
                dead.len(),
                view.as_str(),
                slot.subscribers.len()
            );
        }
    }

    /// Replace the cache and broadcast iff the serialized projection differs
    /// from the last one sent. Returns whether a broadcast happened.
    fn publish_if_changed(&self, view: View, serialized: String) -> bool {
        let mut slot = self.slot(view);
        if slot.last_payload.as_deref() == Some(serialized.as_str()) {
            return false;
        }
        Self::fan_out(&mut slot, view, &serialized);
        slot.last_payload = Some(serialized);
        true
    }

    /// One change-detection pass: fetch the collection once, then compare and
    /// broadcast each view independently.
    ///
    /// A fetch error makes the whole tick a no-op (logged, caches untouched);
    /// a serialization error skips only the affected view. Neither ever
    /// propagates out of the tick loop.
    pub async fn tick(&self) {
        let rows = match self.store.fetch_all(&self.table).await {
            Ok(rows) => {
                self.last_fetch_ok.store(true, Ordering::Relaxed);
                rows
            }
            Err(e) => {
                self.last_fetch_ok.store(false, Ordering::Relaxed);
                warn!("feed tick fetch failed: {}", e);
                return;
            }
        };
        self.ticks.fetch_add(1, Ordering::Relaxed);

        for view in View::ALL {
            self.prune_closed(view);
            let projected = view.project(&rows);
            let serialized = match serde_json::to_string(&projected) {
                Ok(s) => s,
                Err(e) => {
                    warn!("{} projection serialization failed: {}", view.as_str(), e);
                    continue;
                }
            };
            if self.publish_if_changed(view, serialized) {
                info!(
                    "{} feed changed, broadcast to {} subscriber(s)",
                    view.as_str(),
                    self.subscriber_count(view)
                );
            }
        }
    }
}
