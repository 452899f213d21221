//! Change-detection and multi-subscriber broadcast engine
//!
//! The heart of the gateway: a poller (and optional realtime accelerant)
//! detects changes in the monitored collection, and a per-view hub fans the
//! new state out to every open SSE subscriber with duplicate suppression.

pub mod channel;
pub mod hub;
pub mod poller;
pub mod realtime;
pub mod views;

pub use channel::SseChannel;
pub use hub::Feed;
pub use poller::{spawn_feed_task, TickHandle};
pub use realtime::{spawn_realtime_task, RealtimeConfig};
pub use views::{PublicTask, View};
