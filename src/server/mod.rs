//! HTTP server for Taskway

pub mod http;

pub use http::{run, AppState, BoxBody};
