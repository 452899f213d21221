//! External store access
//!
//! The gateway never owns task data; the managed Postgres store is
//! authoritative and is reached through its PostgREST interface.

pub mod client;

use async_trait::async_trait;
use serde_json::Value;

use crate::types::Result;

pub use client::PostgrestClient;

/// Read seam between the feed core and the external store.
///
/// The feed only ever needs the full current collection; everything else
/// (inserts, updates, deletes) goes through [`PostgrestClient`] directly from
/// the request handlers. Keeping the seam this narrow lets tests drive the
/// feed with a fake store.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Fetch every row of `table`, in stable id order.
    async fn fetch_all(&self, table: &str) -> Result<Vec<Value>>;
}
