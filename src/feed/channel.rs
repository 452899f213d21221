//! Per-subscriber SSE write channel
//!
//! A channel is the sender half of an unbounded in-memory queue whose
//! receiver half is the HTTP response body stream. Writes are synchronous and
//! never block; a write fails exactly when the subscriber has gone away and
//! the body stream was dropped.

use bytes::Bytes;
use futures::channel::mpsc;
use hyper::body::Frame;

/// Sender half of one subscriber connection
#[derive(Clone)]
pub struct SseChannel {
    id: u64,
    tx: mpsc::UnboundedSender<Frame<Bytes>>,
}

impl SseChannel {
    /// Create a channel pair: the sender is registered with the hub, the
    /// receiver backs the HTTP response body.
    pub fn new(id: u64) -> (Self, mpsc::UnboundedReceiver<Frame<Bytes>>) {
        let (tx, rx) = mpsc::unbounded();
        (Self { id, tx }, rx)
    }

    /// Identity for set membership and idempotent removal
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Write one SSE data frame. Returns false if the transport is gone.
    pub fn write(&self, payload: &str) -> bool {
        let frame = Frame::data(Bytes::from(format!("data: {}\n\n", payload)));
        self.tx.unbounded_send(frame).is_ok()
    }

    /// Whether the subscriber side of the connection is still attached
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_write_produces_sse_frame() {
        let (ch, mut rx) = SseChannel::new(1);
        assert!(ch.write(r#"[{"id":1}]"#));

        let frame = tokio_test::block_on(rx.next()).unwrap();
        let data = frame.into_data().unwrap();
        assert_eq!(&data[..], b"data: [{\"id\":1}]\n\n");
    }

    #[test]
    fn test_write_fails_after_receiver_dropped() {
        let (ch, rx) = SseChannel::new(2);
        assert!(ch.is_open());

        drop(rx);
        assert!(!ch.is_open());
        assert!(!ch.write("payload"));
    }
}
