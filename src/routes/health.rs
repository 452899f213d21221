//! Health check endpoints
//!
//! - /health, /healthz - liveness probe (is the gateway running?)
//! - /ready, /readyz - readiness probe (has a store fetch succeeded?)
//! - /version - build metadata for deployment verification

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::feed::View;
use crate::server::http::json_response;
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    /// 'online' when the store is reachable, 'degraded' otherwise
    pub status: &'static str,
    pub version: &'static str,
    /// Seconds since process start
    pub uptime: u64,
    pub timestamp: String,
    pub mode: String,
    pub node_id: String,
    pub store: StoreHealth,
    pub subscribers: SubscriberCounts,
}

#[derive(Serialize)]
pub struct StoreHealth {
    pub configured: bool,
    /// Whether the most recent fetch attempt succeeded
    pub last_fetch_ok: bool,
    /// Successful change-detection passes since start
    pub ticks: u64,
}

#[derive(Serialize)]
pub struct SubscriberCounts {
    pub tasks: usize,
    pub admin: usize,
}

fn build_health_response(state: &AppState) -> HealthResponse {
    let args = &state.args;

    let (last_fetch_ok, ticks) = state
        .feed
        .as_ref()
        .map(|f| (f.last_fetch_ok(), f.tick_count()))
        .unwrap_or((false, 0));

    let subscribers = state
        .feed
        .as_ref()
        .map(|f| SubscriberCounts {
            tasks: f.subscriber_count(View::Public),
            admin: f.subscriber_count(View::Admin),
        })
        .unwrap_or(SubscriberCounts { tasks: 0, admin: 0 });

    // Degraded until a fetch has gone through; ticks == 0 just means we
    // have not polled yet
    let status = if args.store_configured() && (last_fetch_ok || ticks == 0) {
        "online"
    } else {
        "degraded"
    };

    HealthResponse {
        healthy: true,
        status,
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        mode: if args.dev_mode {
            "development".to_string()
        } else {
            "production".to_string()
        },
        node_id: args.node_id.to_string(),
        store: StoreHealth {
            configured: args.store_configured(),
            last_fetch_ok,
            ticks,
        },
        subscribers,
    }
}

/// Handle liveness probe (/, /health, /healthz)
///
/// Always 200 while the process runs; store status is informational.
pub fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let response = build_health_response(&state);

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"healthy":true,"error":"serialization failed"}"#.to_string());

    json_response(StatusCode::OK, body)
}

/// Handle readiness probe (/ready, /readyz)
///
/// 200 once a store fetch has succeeded (or always, in dev mode without a
/// configured store); 503 otherwise. Intended for load balancer checks.
pub fn readiness_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let response = build_health_response(&state);

    let is_ready = response.store.last_fetch_ok || (state.args.dev_mode && state.feed.is_none());

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"healthy":false,"error":"serialization failed"}"#.to_string());

    let status = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    json_response(status, body)
}

/// Version information for deployment verification
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub commit: &'static str,
    pub commit_full: &'static str,
    pub build_time: &'static str,
    pub service: &'static str,
}

/// Handle version endpoint (/version)
pub fn version_info() -> Response<Full<Bytes>> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "taskway",
    };

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"version":"unknown"}"#.to_string());

    json_response(StatusCode::OK, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Args;
    use clap::Parser;

    fn dev_state() -> Arc<AppState> {
        let mut args = Args::parse_from(["taskway"]);
        args.dev_mode = true;
        Arc::new(AppState::new(args, None, None, None))
    }

    #[test]
    fn test_liveness_always_ok() {
        let resp = health_check(dev_state());
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn test_dev_mode_without_store_is_ready() {
        let resp = readiness_check(dev_state());
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn test_unconfigured_production_reports_degraded() {
        let args = Args::parse_from(["taskway"]);
        let state = Arc::new(AppState::new(args, None, None, None));
        let health = build_health_response(&state);
        assert_eq!(health.status, "degraded");
        assert!(!health.store.configured);
    }
}
