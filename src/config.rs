//! Configuration for Taskway
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// Taskway - real-time task feed gateway
///
/// Bridges a managed Postgres store (PostgREST interface) to SSE subscribers
/// with polling change detection and an optional realtime accelerant.
#[derive(Parser, Debug, Clone)]
#[command(name = "taskway")]
#[command(about = "Real-time task feed gateway over a managed Postgres store")]
pub struct Args {
    /// Unique node identifier for this gateway instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Base URL of the managed store project (e.g. https://xyz.supabase.co)
    #[arg(long, env = "STORE_URL")]
    pub store_url: Option<String>,

    /// Anon/service key for the store's REST interface
    #[arg(long, env = "STORE_ANON_KEY")]
    pub store_anon_key: Option<String>,

    /// Table holding the monitored task collection
    #[arg(long, env = "TASK_TABLE", default_value = "task")]
    pub task_table: String,

    /// Poll interval for the change detector, in milliseconds
    #[arg(long, env = "POLL_INTERVAL_MS", default_value = "2000")]
    pub poll_interval_ms: u64,

    /// Enable the realtime websocket listener (latency accelerant; the
    /// poller alone is authoritative for correctness)
    #[arg(long, env = "REALTIME_ENABLED", default_value = "true")]
    pub realtime_enabled: bool,

    /// Enable development mode (store config optional, feed idles without it)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Whether the store connection is fully configured
    pub fn store_configured(&self) -> bool {
        self.store_url.is_some() && self.store_anon_key.is_some()
    }

    /// Derive the realtime websocket URL from the store base URL
    ///
    /// `https://xyz.supabase.co` becomes
    /// `wss://xyz.supabase.co/realtime/v1/websocket?apikey=...&vsn=1.0.0`
    pub fn realtime_url(&self) -> Option<String> {
        let base = self.store_url.as_deref()?;
        let key = self.store_anon_key.as_deref()?;
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            return None;
        };
        Some(format!(
            "{}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
            ws_base.trim_end_matches('/'),
            key
        ))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            if self.store_url.is_none() {
                return Err("STORE_URL is required in production mode".to_string());
            }
            if self.store_anon_key.is_none() {
                return Err("STORE_ANON_KEY is required in production mode".to_string());
            }
        }

        if self.poll_interval_ms == 0 {
            return Err("POLL_INTERVAL_MS must be greater than zero".to_string());
        }

        if self.task_table.trim().is_empty() {
            return Err("TASK_TABLE must not be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args::parse_from(["taskway"])
    }

    #[test]
    fn test_validate_requires_store_in_production() {
        let args = base_args();
        assert!(args.validate().is_err());

        let mut args = base_args();
        args.store_url = Some("https://xyz.supabase.co".to_string());
        args.store_anon_key = Some("anon-key".to_string());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validate_dev_mode_allows_missing_store() {
        let mut args = base_args();
        args.dev_mode = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut args = base_args();
        args.dev_mode = true;
        args.poll_interval_ms = 0;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_realtime_url_derivation() {
        let mut args = base_args();
        args.store_url = Some("https://xyz.supabase.co".to_string());
        args.store_anon_key = Some("anon-key".to_string());

        let url = args.realtime_url().unwrap();
        assert_eq!(
            url,
            "wss://xyz.supabase.co/realtime/v1/websocket?apikey=anon-key&vsn=1.0.0"
        );
    }

    #[test]
    fn test_realtime_url_http_becomes_ws() {
        let mut args = base_args();
        args.store_url = Some("http://localhost:54321".to_string());
        args.store_anon_key = Some("local".to_string());

        let url = args.realtime_url().unwrap();
        assert!(url.starts_with("ws://localhost:54321/realtime/v1/websocket"));
    }

    #[test]
    fn test_realtime_url_missing_config() {
        let args = base_args();
        assert!(args.realtime_url().is_none());
    }
}
