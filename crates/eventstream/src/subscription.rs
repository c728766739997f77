//! Single-consumer event-stream subscription (spec §5 "shared resource
//! policy": the event-stream encoder is owned by exactly one writer task;
//! readers attach via a single-consumer subscription").

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::frame::{decode_message, DecodedMessage, EventStreamError};

/// Default backpressure depth for a subscription's bounded channel.
const DEFAULT_CAPACITY: usize = 32;

/// The write half of an event-stream connection. Exactly one task should
/// hold this; cloning is intentionally not supported, matching the "owned
/// by exactly one writer task" invariant.
pub struct EventPublisher {
    sender: mpsc::Sender<Bytes>,
}

/// The read half. A single consumer drains frames as they arrive;
/// `recv` returns `None` once the publisher is dropped or closes the
/// channel explicitly.
pub struct EventSubscription {
    receiver: mpsc::Receiver<Bytes>,
}

pub fn channel() -> (EventPublisher, EventSubscription) {
    channel_with_capacity(DEFAULT_CAPACITY)
}

pub fn channel_with_capacity(capacity: usize) -> (EventPublisher, EventSubscription) {
    let (sender, receiver) = mpsc::channel(capacity);
    (EventPublisher { sender }, EventSubscription { receiver })
}

impl EventPublisher {
    /// Sends one already-framed message. Backpressures the writer task
    /// when the subscriber is falling behind rather than buffering
    /// unboundedly.
    pub async fn publish(&self, framed: Bytes) -> Result<(), mpsc::error::SendError<Bytes>> {
        self.sender.send(framed).await
    }
}

impl EventSubscription {
    /// Receives and decodes the next frame, or `None` once the stream has
    /// ended.
    pub async fn recv(&mut self) -> Option<Result<DecodedMessage, EventStreamError>> {
        let bytes = self.receiver.recv().await?;
        let decoded = decode_message(&bytes);
        if let Err(ref err) = decoded {
            tracing::warn!(%err, "dropping malformed event-stream frame");
        }
        Some(decoded)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::frame::HeaderValue;

    #[tokio::test]
    async fn publisher_and_subscriber_round_trip_a_frame() {
        let (publisher, mut subscription) = channel();
        let headers = vec![(":event-type".to_string(), HeaderValue::String("Ping".to_string()))];
        let framed = crate::frame::encode_message(&headers, b"{}");

        publisher.publish(framed).await.unwrap();
        let decoded = subscription.recv().await.unwrap().unwrap();
        assert_eq!(decoded.headers, headers);
        assert_eq!(&decoded.payload[..], b"{}");
    }

    #[tokio::test]
    async fn recv_returns_none_after_publisher_drops() {
        let (publisher, mut subscription) = channel();
        drop(publisher);
        assert!(subscription.recv().await.is_none());
    }
}
