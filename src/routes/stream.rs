//! SSE feed endpoints
//!
//! Opening /stream/tasks or /stream/admin registers an [`SseChannel`] with
//! the feed hub; the response body is the receiver half of that channel. The
//! hub writes the initial payload from a fresh fetch, then one frame per
//! detected change. Client disconnect drops the body stream, which flips the
//! channel to closed; the hub prunes it on the next broadcast attempt.

use futures::StreamExt;
use http_body_util::{BodyExt, StreamBody};
use hyper::{Response, StatusCode};
use std::sync::Arc;

use crate::feed::{Feed, SseChannel, View};
use crate::server::http::{to_boxed, unavailable_response};
use crate::server::{AppState, BoxBody};

/// Unregisters the channel when the response body is dropped, i.e. as soon
/// as the client disconnects rather than at the next broadcast.
struct FeedGuard {
    feed: Arc<Feed>,
    view: View,
    channel_id: u64,
}

impl Drop for FeedGuard {
    fn drop(&mut self) {
        self.feed.unregister(self.view, self.channel_id);
    }
}

/// Open a long-lived SSE connection on the given view
pub async fn handle_stream(state: Arc<AppState>, view: View) -> Response<BoxBody> {
    let Some(feed) = state.feed.as_ref() else {
        return to_boxed(unavailable_response("store not configured"));
    };

    let (channel, rx) = SseChannel::new(feed.next_channel_id());
    let guard = FeedGuard {
        feed: Arc::clone(feed),
        view,
        channel_id: channel.id(),
    };
    feed.register(view, channel).await;

    // The guard rides inside the body stream; dropping the response body
    // drops it and removes the channel from the hub.
    let body = StreamBody::new(rx.map(move |frame| {
        let _ = &guard;
        Ok::<_, hyper::Error>(frame)
    }));

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/event-stream")
        .header("Cache-Control", "no-cache")
        .header("Connection", "keep-alive")
        .header("Access-Control-Allow-Origin", "*")
        .body(BodyExt::boxed(body))
        .unwrap_or_else(|_| to_boxed(unavailable_response("stream setup failed")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TaskStore;
    use crate::types::Result;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct StaticStore;

    #[async_trait]
    impl TaskStore for StaticStore {
        async fn fetch_all(&self, _table: &str) -> Result<Vec<Value>> {
            Ok(vec![json!({"id": 1, "title": "A", "status": "open"})])
        }
    }

    #[tokio::test]
    async fn test_guard_drop_unregisters_channel() {
        let feed = Arc::new(Feed::new(Arc::new(StaticStore), "task"));
        let (channel, _rx) = SseChannel::new(feed.next_channel_id());
        let guard = FeedGuard {
            feed: Arc::clone(&feed),
            view: View::Public,
            channel_id: channel.id(),
        };
        feed.register(View::Public, channel).await;
        assert_eq!(feed.subscriber_count(View::Public), 1);

        drop(guard);
        assert_eq!(feed.subscriber_count(View::Public), 0);
    }
}
