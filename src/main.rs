//! Taskway - real-time task feed gateway

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskway::{
    config::Args,
    feed::{spawn_feed_task, spawn_realtime_task, Feed, RealtimeConfig},
    server,
    store::PostgrestClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("taskway={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Taskway - real-time task feed");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!(
        "Mode: {}",
        if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" }
    );
    info!("Task table: {}", args.task_table);
    info!("Poll interval: {}ms", args.poll_interval_ms);
    info!(
        "Realtime listener: {}",
        if args.realtime_enabled { "enabled" } else { "disabled" }
    );
    info!("======================================");

    // Wire up the store, the feed hub, and the tick loop. Missing store
    // config is only tolerated in dev mode (validate() enforces that); the
    // server then runs with the feed endpoints answering 503.
    let (store, feed, ticks) = match (&args.store_url, &args.store_anon_key) {
        (Some(url), Some(key)) => {
            let store = Arc::new(PostgrestClient::new(url, key));
            let feed = Arc::new(Feed::new(
                Arc::clone(&store) as Arc<dyn taskway::store::TaskStore>,
                args.task_table.clone(),
            ));
            let (ticks, _poller) = spawn_feed_task(
                Arc::clone(&feed),
                Duration::from_millis(args.poll_interval_ms),
            );

            if args.realtime_enabled {
                match args.realtime_url() {
                    Some(realtime_url) => {
                        let config = RealtimeConfig::new(realtime_url, args.task_table.clone());
                        let _listener = spawn_realtime_task(config, ticks.clone());
                    }
                    None => warn!("Could not derive realtime URL from store URL"),
                }
            }

            (Some(store), Some(feed), Some(ticks))
        }
        _ => {
            warn!("Store not configured, feed disabled (dev mode)");
            (None, None, None)
        }
    };

    let state = Arc::new(server::AppState::new(args, store, feed, ticks));

    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
