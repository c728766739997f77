//! AWS event-stream binary framing and subscription plumbing (spec §3
//! "Event frame", §4.2 "Event streams", §6 "AWS event streams"). Sits
//! alongside `client`/`server` in the dependency graph: both depend on
//! `transport` for the [`transport::EventFrame`] contract, and this crate
//! supplies the one concrete implementation the spec requires.

mod crc32;
mod event_frame;
mod frame;
mod subscription;

pub use event_frame::AwsEventFrame;
pub use frame::{decode_message, encode_message, DecodedMessage, EventStreamError, HeaderValue};
pub use subscription::{channel, channel_with_capacity, EventPublisher, EventSubscription};
