//! `DataStream` (spec §3): the body carried by an [`crate::message::HttpRequest`]
//! or [`crate::message::HttpResponse`]. Most bodies are small and replayable
//! (empty, in-memory bytes, or a file path reopened on each send, needed for
//! retries); a streamed body backed by a subscriber channel can only be
//! consumed once.

use std::path::PathBuf;
use std::pin::Pin;

use bytes::Bytes;
use futures_core::Stream;

pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// A request or response body.
///
/// `Empty`, `Bytes`, and `File` are replayable: the retry engine (spec §4.4)
/// can resend the same body on a retried attempt. `Subscriber` wraps a
/// single-shot async stream (e.g. an event-stream subscription, spec §3
/// "Event frame") and is consumed exactly once.
pub enum DataStream {
    Empty,
    Bytes(Bytes),
    File(PathBuf),
    Subscriber(ByteStream),
}

impl std::fmt::Debug for DataStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataStream::Empty => f.write_str("DataStream::Empty"),
            DataStream::Bytes(b) => write!(f, "DataStream::Bytes({} bytes)", b.len()),
            DataStream::File(p) => write!(f, "DataStream::File({p:?})"),
            DataStream::Subscriber(_) => f.write_str("DataStream::Subscriber(..)"),
        }
    }
}

impl DataStream {
    pub fn is_replayable(&self) -> bool {
        !matches!(self, DataStream::Subscriber(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, DataStream::Empty) || matches!(self, DataStream::Bytes(b) if b.is_empty())
    }

    /// Reads the whole body into memory. Callers on a retry path should only
    /// invoke this on a replayable stream; for a file body this reopens the
    /// file each time it's called.
    pub async fn collect(self) -> std::io::Result<Bytes> {
        match self {
            DataStream::Empty => Ok(Bytes::new()),
            DataStream::Bytes(b) => Ok(b),
            DataStream::File(path) => tokio::fs::read(path).await.map(Bytes::from),
            DataStream::Subscriber(mut stream) => {
                use tokio_stream::StreamExt;
                let mut out = Vec::new();
                while let Some(chunk) = stream.next().await {
                    out.extend_from_slice(&chunk?);
                }
                Ok(Bytes::from(out))
            }
        }
    }
}

impl From<Bytes> for DataStream {
    fn from(bytes: Bytes) -> Self {
        DataStream::Bytes(bytes)
    }
}

impl From<Vec<u8>> for DataStream {
    fn from(bytes: Vec<u8>) -> Self {
        DataStream::Bytes(Bytes::from(bytes))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn empty_and_bytes_collect() {
        assert_eq!(DataStream::Empty.collect().await.unwrap(), Bytes::new());
        let body = DataStream::Bytes(Bytes::from_static(b"hi"));
        assert_eq!(body.collect().await.unwrap(), Bytes::from_static(b"hi"));
    }

    #[test]
    fn only_subscriber_is_non_replayable() {
        assert!(DataStream::Empty.is_replayable());
        assert!(DataStream::Bytes(Bytes::new()).is_replayable());
        assert!(DataStream::File(PathBuf::from("/tmp/x")).is_replayable());
    }
}
