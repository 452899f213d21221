//! PostgREST client for the managed store
//!
//! Thin wrapper over reqwest: every operation is a single HTTP round trip to
//! the store's `/rest/v1/{table}` surface with the anon key in both the
//! `apikey` and `Authorization` headers.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::types::{Result, TaskwayError};

use super::TaskStore;

/// HTTP client for a PostgREST-compatible store
pub struct PostgrestClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl PostgrestClient {
    /// Create a client for the given project base URL and anon key
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    /// REST endpoint for a table, e.g. `{base}/rest/v1/task`
    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
    }

    /// Turn a non-success response into a typed error carrying the body
    async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(TaskwayError::StoreStatus {
            status: status.as_u16(),
            body,
        })
    }

    /// Insert a row, returning the created representation
    pub async fn insert(&self, table: &str, row: &Value) -> Result<Option<Value>> {
        let url = self.table_url(table);
        debug!("store insert: POST {}", url);

        let resp = self
            .authed(self.http.post(&url))
            .header("Prefer", "return=representation")
            .json(&serde_json::json!([row]))
            .send()
            .await?;
        let rows: Vec<Value> = Self::check(resp).await?.json().await?;
        Ok(rows.into_iter().next())
    }

    /// Patch the row with the given id, returning the updated representation
    pub async fn update(&self, table: &str, id: i64, patch: &Value) -> Result<Option<Value>> {
        let url = format!("{}?id=eq.{}", self.table_url(table), id);
        debug!("store update: PATCH {}", url);

        let resp = self
            .authed(self.http.patch(&url))
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await?;
        let rows: Vec<Value> = Self::check(resp).await?.json().await?;
        Ok(rows.into_iter().next())
    }

    /// Delete the row with the given id
    pub async fn delete(&self, table: &str, id: i64) -> Result<()> {
        let url = format!("{}?id=eq.{}", self.table_url(table), id);
        debug!("store delete: DELETE {}", url);

        let resp = self.authed(self.http.delete(&url)).send().await?;
        Self::check(resp).await?;
        Ok(())
    }
}

#[async_trait]
impl TaskStore for PostgrestClient {
    async fn fetch_all(&self, table: &str) -> Result<Vec<Value>> {
        // Stable ordering keeps the serialized form comparable across ticks
        let url = format!("{}?select=*&order=id.asc", self.table_url(table));
        let resp = self.authed(self.http.get(&url)).send().await?;
        let rows: Vec<Value> = Self::check(resp).await?.json().await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_url() {
        let client = PostgrestClient::new("https://xyz.supabase.co/", "key");
        assert_eq!(client.table_url("task"), "https://xyz.supabase.co/rest/v1/task");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = PostgrestClient::new("http://localhost:54321///", "key");
        assert_eq!(client.base_url, "http://localhost:54321");
    }
}
