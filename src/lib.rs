//! Taskway - real-time task feed gateway
//!
//! Taskway bridges a managed Postgres store (PostgREST interface) to browser
//! clients: task CRUD over plain HTTP, and near-real-time task state pushed
//! to any number of long-lived SSE connections.
//!
//! ## Services
//!
//! - **Feed**: change detection over the monitored table with per-view
//!   duplicate suppression and multi-subscriber fan-out
//! - **Poller**: fixed-interval correctness backstop for change detection
//! - **Realtime**: optional websocket listener on the store's change feed,
//!   used purely to cut push latency below the poll interval
//! - **Store**: thin PostgREST client for fetches and CRUD

pub mod config;
pub mod feed;
pub mod routes;
pub mod server;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, TaskwayError};
