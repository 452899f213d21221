//! Task snapshot and CRUD handlers
//!
//! Thin glue over the store client: validate, forward, wrap the result in a
//! `{success, ...}` envelope. Every successful mutation requests a feed tick
//! so subscribers see the change before the next poll fires.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use crate::feed::View;
use crate::server::http::{bad_request_response, json_response, unavailable_response};
use crate::server::AppState;
use crate::store::{PostgrestClient, TaskStore};

#[derive(Debug, Deserialize)]
struct CreateTaskRequest {
    title: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateTaskRequest {
    title: Option<String>,
    status: Option<String>,
}

fn store_of(state: &AppState) -> Option<Arc<PostgrestClient>> {
    state.store.as_ref().map(Arc::clone)
}

async fn read_json_body<T: for<'de> Deserialize<'de>>(
    req: Request<Incoming>,
) -> Result<T, Response<Full<Bytes>>> {
    let bytes = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("failed to read request body: {}", e);
            return Err(bad_request_response("failed to read request body"));
        }
    };
    serde_json::from_slice(&bytes).map_err(|_| bad_request_response("invalid JSON body"))
}

fn parse_task_id(raw: &str) -> Result<i64, Response<Full<Bytes>>> {
    raw.parse::<i64>()
        .map_err(|_| bad_request_response("invalid task id"))
}

/// GET /task-data - public projection snapshot from a fresh fetch
pub async fn handle_task_data(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let Some(store) = store_of(&state) else {
        return unavailable_response("store not configured");
    };

    match store.fetch_all(&state.args.task_table).await {
        Ok(rows) => {
            let projected = View::Public.project(&rows);
            json_response(StatusCode::OK, projected.to_string())
        }
        Err(e) => {
            warn!("task-data fetch failed: {}", e);
            json_response(
                StatusCode::BAD_GATEWAY,
                json!({"success": false, "error": "store fetch failed"}).to_string(),
            )
        }
    }
}

/// GET /admin-data - raw rows snapshot from a fresh fetch
pub async fn handle_admin_data(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let Some(store) = store_of(&state) else {
        return unavailable_response("store not configured");
    };

    match store.fetch_all(&state.args.task_table).await {
        Ok(rows) => json_response(StatusCode::OK, Value::Array(rows).to_string()),
        Err(e) => {
            warn!("admin-data fetch failed: {}", e);
            json_response(
                StatusCode::BAD_GATEWAY,
                json!({"success": false, "error": "store fetch failed"}).to_string(),
            )
        }
    }
}

/// POST /task - create a task (title required, status defaults to "open")
pub async fn handle_create_task(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    let Some(store) = store_of(&state) else {
        return unavailable_response("store not configured");
    };

    let body: CreateTaskRequest = match read_json_body(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    let title = body.title.as_deref().unwrap_or("").trim().to_string();
    if title.is_empty() {
        return bad_request_response("title is required");
    }
    let status = body.status.unwrap_or_else(|| "open".to_string());

    let row = json!({"title": title, "status": status});
    match store.insert(&state.args.task_table, &row).await {
        Ok(created) => {
            state.request_tick();
            json_response(
                StatusCode::CREATED,
                json!({"success": true, "data": created}).to_string(),
            )
        }
        Err(e) => {
            warn!("task insert failed: {}", e);
            bad_request_response("store rejected the new task")
        }
    }
}

/// PUT /task/{id} - update title and/or status
pub async fn handle_update_task(
    req: Request<Incoming>,
    state: Arc<AppState>,
    raw_id: &str,
) -> Response<Full<Bytes>> {
    let Some(store) = store_of(&state) else {
        return unavailable_response("store not configured");
    };

    let id = match parse_task_id(raw_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let body: UpdateTaskRequest = match read_json_body(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    let mut patch = serde_json::Map::new();
    if let Some(title) = body.title {
        let title = title.trim().to_string();
        if title.is_empty() {
            return bad_request_response("title cannot be empty");
        }
        patch.insert("title".to_string(), Value::String(title));
    }
    if let Some(status) = body.status {
        patch.insert("status".to_string(), Value::String(status));
    }
    if patch.is_empty() {
        return bad_request_response("no fields to update");
    }

    match store
        .update(&state.args.task_table, id, &Value::Object(patch))
        .await
    {
        Ok(updated) => {
            state.request_tick();
            json_response(
                StatusCode::OK,
                json!({"success": true, "data": updated}).to_string(),
            )
        }
        Err(e) => {
            warn!("task update failed: {}", e);
            bad_request_response("store rejected the update")
        }
    }
}

/// DELETE /task/{id}
pub async fn handle_delete_task(state: Arc<AppState>, raw_id: &str) -> Response<Full<Bytes>> {
    let Some(store) = store_of(&state) else {
        return unavailable_response("store not configured");
    };

    let id = match parse_task_id(raw_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match store.delete(&state.args.task_table, id).await {
        Ok(()) => {
            state.request_tick();
            json_response(
                StatusCode::OK,
                json!({"success": true, "message": "task deleted"}).to_string(),
            )
        }
        Err(e) => {
            warn!("task delete failed: {}", e);
            bad_request_response("store rejected the delete")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_task_id() {
        assert_eq!(parse_task_id("42").unwrap(), 42);
        assert!(parse_task_id("").is_err());
        assert!(parse_task_id("abc").is_err());
        assert!(parse_task_id("1.5").is_err());
    }

    #[test]
    fn test_create_request_deserialization() {
        let req: CreateTaskRequest = serde_json::from_str(r#"{"title":"A"}"#).unwrap();
        assert_eq!(req.title.as_deref(), Some("A"));
        assert!(req.status.is_none());

        let req: CreateTaskRequest =
            serde_json::from_str(r#"{"title":"B","status":"done"}"#).unwrap();
        assert_eq!(req.status.as_deref(), Some("done"));
    }

    #[test]
    fn test_update_request_allows_partial_bodies() {
        let req: UpdateTaskRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert!(req.title.is_none() && req.status.is_none());

        let req: UpdateTaskRequest = serde_json::from_str(r#"{"status":"open"}"#).unwrap();
        assert_eq!(req.status.as_deref(), Some("open"));
    }
}
