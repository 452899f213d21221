//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling; requests are routed
//! with a plain `match` over method and path.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::Args;
use crate::feed::{Feed, TickHandle, View};
use crate::routes;
use crate::store::PostgrestClient;
use crate::types::TaskwayError;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Store client; absent only in dev mode without store configuration
    pub store: Option<Arc<PostgrestClient>>,
    /// Broadcast hub; absent exactly when the store is
    pub feed: Option<Arc<Feed>>,
    /// Out-of-band tick trigger shared with the realtime listener
    pub ticks: Option<TickHandle>,
    /// Process start, for uptime reporting
    pub started: Instant,
}

impl AppState {
    pub fn new(
        args: Args,
        store: Option<Arc<PostgrestClient>>,
        feed: Option<Arc<Feed>>,
        ticks: Option<TickHandle>,
    ) -> Self {
        Self {
            args,
            store,
            feed,
            ticks,
            started: Instant::now(),
        }
    }

    /// Ask the feed loop for a prompt tick (used after successful mutations)
    pub fn request_tick(&self) {
        if let Some(ref ticks) = self.ticks {
            ticks.request_tick();
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), TaskwayError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Taskway listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled");
    }
    if state.store.is_none() {
        warn!("Store not configured - feed endpoints will return 503");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        debug!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("[{}] {} {}", addr, method, path);

    let response = match (method, path.as_str()) {
        // CORS preflight
        (Method::OPTIONS, _) => to_boxed(preflight_response()),

        // Liveness probe and service banner
        (Method::GET, "/") | (Method::GET, "/health") | (Method::GET, "/healthz") => {
            to_boxed(routes::health_check(Arc::clone(&state)))
        }

        // Readiness probe - 200 only once a fetch has succeeded
        (Method::GET, "/ready") | (Method::GET, "/readyz") => {
            to_boxed(routes::readiness_check(Arc::clone(&state)))
        }

        // Version info for deployment verification
        (Method::GET, "/version") => to_boxed(routes::version_info()),

        // SSE feeds, one per view
        (Method::GET, "/stream/tasks") => {
            routes::handle_stream(Arc::clone(&state), View::Public).await
        }
        (Method::GET, "/stream/admin") => {
            routes::handle_stream(Arc::clone(&state), View::Admin).await
        }

        // Snapshot endpoints
        (Method::GET, "/task-data") => {
            to_boxed(routes::handle_task_data(Arc::clone(&state)).await)
        }
        (Method::GET, "/admin-data") => {
            to_boxed(routes::handle_admin_data(Arc::clone(&state)).await)
        }

        // Task CRUD
        (Method::POST, "/task") => {
            return Ok(to_boxed(routes::handle_create_task(req, Arc::clone(&state)).await));
        }
        (Method::PUT, p) if p.starts_with("/task/") => {
            let id = p.strip_prefix("/task/").unwrap_or("").to_string();
            return Ok(to_boxed(
                routes::handle_update_task(req, Arc::clone(&state), &id).await,
            ));
        }
        (Method::DELETE, p) if p.starts_with("/task/") => {
            let id = p.strip_prefix("/task/").unwrap_or("");
            to_boxed(routes::handle_delete_task(Arc::clone(&state), id).await)
        }

        _ => to_boxed(not_found_response(&path)),
    };

    Ok(response)
}

/// Box a response built on a Full body
pub fn to_boxed(resp: Response<Full<Bytes>>) -> Response<BoxBody> {
    resp.map(|b| b.map_err(|never| match never {}).boxed())
}

/// JSON response with permissive CORS (the browser frontend runs on a
/// different origin)
pub fn json_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

pub fn bad_request_response(message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({"success": false, "error": message}).to_string();
    json_response(StatusCode::BAD_REQUEST, body)
}

pub fn unavailable_response(message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({"success": false, "error": message}).to_string();
    json_response(StatusCode::SERVICE_UNAVAILABLE, body)
}

pub fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body =
        serde_json::json!({"success": false, "error": format!("not found: {path}")}).to_string();
    json_response(StatusCode::NOT_FOUND, body)
}

fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}
