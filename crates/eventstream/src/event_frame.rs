//! The concrete [`transport::EventFrame`] implementation for AWS binary
//! event-stream framing.

use bytes::Bytes;
use transport::EventFrame;

use crate::frame::{DecodedMessage, HeaderValue};

/// One decoded AWS event-stream frame, carrying its headers alongside the
/// inner codec's payload.
pub struct AwsEventFrame {
    pub headers: Vec<(String, HeaderValue)>,
    pub payload: Bytes,
}

impl From<DecodedMessage> for AwsEventFrame {
    fn from(decoded: DecodedMessage) -> Self {
        Self { headers: decoded.headers, payload: decoded.payload }
    }
}

impl AwsEventFrame {
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn event_type(&self) -> Option<&str> {
        match self.header(":event-type") {
            Some(HeaderValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn message_type(&self) -> Option<&str> {
        match self.header(":message-type") {
            Some(HeaderValue::String(s)) => Some(s),
            _ => None,
        }
    }
}

impl EventFrame for AwsEventFrame {
    fn unwrap(self) -> Bytes {
        self.payload
    }
}
