//! Realtime change-notification listener
//!
//! Optional websocket subscription to the store's realtime feed (Phoenix
//! protocol). A delivered `postgres_changes` event requests an immediate
//! tick, cutting the push latency below the poll interval. The listener is
//! purely an accelerant: it reconnects with a fixed delay on any failure and
//! is never relied on for correctness, since notifications may be silently
//! dropped upstream while the poller keeps ticking.

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::types::{Result, TaskwayError};

use super::poller::TickHandle;

/// Realtime listener settings
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Fully derived websocket URL including the apikey query parameter
    pub url: String,
    /// Monitored table (joined as `realtime:public:{table}`)
    pub table: String,
    /// Phoenix heartbeat period
    pub heartbeat: Duration,
    /// Delay before reconnecting after a closed or failed connection
    pub reconnect_delay: Duration,
}

impl RealtimeConfig {
    pub fn new(url: String, table: String) -> Self {
        Self {
            url,
            table,
            heartbeat: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

/// Spawn the listener loop: connect, subscribe, forward change events as
/// tick requests, reconnect on failure.
pub fn spawn_realtime_task(config: RealtimeConfig, ticks: TickHandle) -> JoinHandle<()> {
    info!(
        "realtime listener enabled for table '{}' (reconnect delay: {:?})",
        config.table, config.reconnect_delay
    );

    tokio::spawn(async move {
        loop {
            match run_connection(&config, &ticks).await {
                Ok(()) => info!("realtime connection closed, reconnecting"),
                Err(e) => warn!("{} (reconnecting in {:?})", e, config.reconnect_delay),
            }
            sleep(config.reconnect_delay).await;
        }
    })
}

/// One websocket session: join the table channel, then pump heartbeats and
/// inbound events until the connection drops.
async fn run_connection(config: &RealtimeConfig, ticks: &TickHandle) -> Result<()> {
    let (ws, _) = connect_async(&config.url)
        .await
        .map_err(|e| TaskwayError::Realtime(format!("realtime connect failed: {e}")))?;
    let (mut sink, mut stream) = ws.split();

    let mut msg_ref: u64 = 1;
    sink.send(Message::Text(join_message(&config.table, msg_ref).to_string()))
        .await
        .map_err(|e| TaskwayError::Realtime(format!("realtime join failed: {e}")))?;

    let mut heartbeat = interval(config.heartbeat);
    heartbeat.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                msg_ref += 1;
                sink.send(Message::Text(heartbeat_message(msg_ref).to_string()))
                    .await
                    .map_err(|e| TaskwayError::Realtime(format!("realtime heartbeat failed: {e}")))?;
            }

            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if handle_server_message(&text) {
                        debug!("realtime change event received, requesting tick");
                        ticks.request_tick();
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = sink.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | None => return Ok(()),
                Some(Err(e)) => {
                    return Err(TaskwayError::Realtime(format!("realtime stream error: {e}")));
                }
                _ => {}
            }
        }
    }
}

/// Phoenix join frame subscribing to all postgres changes on the table
fn join_message(table: &str, msg_ref: u64) -> Value {
    json!({
        "topic": format!("realtime:public:{table}"),
        "event": "phx_join",
        "payload": {
            "config": {
                "postgres_changes": [
                    {"event": "*", "schema": "public", "table": table}
                ]
            }
        },
        "ref": msg_ref.to_string(),
    })
}

/// Phoenix keep-alive frame
fn heartbeat_message(msg_ref: u64) -> Value {
    json!({
        "topic": "phoenix",
        "event": "heartbeat",
        "payload": {},
        "ref": msg_ref.to_string(),
    })
}

/// Inspect one server frame; returns whether it carries a data change.
/// Subscription status transitions are logged and otherwise ignored.
fn handle_server_message(text: &str) -> bool {
    let msg: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => {
            debug!("unparseable realtime frame ignored");
            return false;
        }
    };

    match msg.get("event").and_then(Value::as_str) {
        Some("postgres_changes") => true,
        Some("phx_reply") => {
            match msg.pointer("/payload/status").and_then(Value::as_str) {
                Some("ok") => info!("realtime channel subscribed"),
                Some(status) => warn!("realtime channel reply status: {}", status),
                None => {}
            }
            false
        }
        Some("phx_error") => {
            warn!("realtime channel errored");
            false
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_message_shape() {
        let msg = join_message("task", 1);
        assert_eq!(msg["topic"], "realtime:public:task");
        assert_eq!(msg["event"], "phx_join");
        assert_eq!(msg["payload"]["config"]["postgres_changes"][0]["table"], "task");
        assert_eq!(msg["payload"]["config"]["postgres_changes"][0]["event"], "*");
        assert_eq!(msg["ref"], "1");
    }

    #[test]
    fn test_heartbeat_message_shape() {
        let msg = heartbeat_message(42);
        assert_eq!(msg["topic"], "phoenix");
        assert_eq!(msg["event"], "heartbeat");
        assert_eq!(msg["ref"], "42");
    }

    #[test]
    fn test_change_event_requests_tick() {
        let frame = r#"{"topic":"realtime:public:task","event":"postgres_changes","payload":{}}"#;
        assert!(handle_server_message(frame));
    }

    #[test]
    fn test_replies_and_garbage_do_not_tick() {
        assert!(!handle_server_message(
            r#"{"topic":"realtime:public:task","event":"phx_reply","payload":{"status":"ok"}}"#
        ));
        assert!(!handle_server_message(
            r#"{"topic":"realtime:public:task","event":"phx_reply","payload":{"status":"error"}}"#
        ));
        assert!(!handle_server_message("not json at all"));
        assert!(!handle_server_message(r#"{"event":"presence_state"}"#));
    }
}
